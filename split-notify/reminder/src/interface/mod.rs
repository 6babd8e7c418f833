//! 接口层（触发入口）

pub mod consumer;

pub use consumer::{ReminderTriggerConsumer, parse_event};
