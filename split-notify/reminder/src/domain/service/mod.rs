//! 领域服务

mod reminder_domain_service;

pub use reminder_domain_service::{ReminderDomainConfig, ReminderDomainService, TokenLookupMode};
