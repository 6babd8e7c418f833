//! 提醒通知服务
//!
//! 新建提醒 → 查询发送者与账单 → 收集其他参与者的设备令牌 → 一次多播推送

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interface;
pub mod service;

pub use error::{ErrorKind, ReminderError, Result};
