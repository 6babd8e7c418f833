//! 领域层（业务核心逻辑）

pub mod model;
pub mod repository;
pub mod service;

pub use model::{DispatchOutcome, Reminder, ReminderCreatedEvent, ReminderPath};
pub use repository::{DocumentStore, PushSender};
pub use service::{ReminderDomainConfig, ReminderDomainService, TokenLookupMode};
