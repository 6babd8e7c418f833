//! 命令结构体定义（Command DTO）

use crate::domain::model::ReminderCreatedEvent;

/// 处理新建提醒命令
#[derive(Debug, Clone)]
pub struct HandleReminderCreatedCommand {
    /// 触发事件
    pub event: ReminderCreatedEvent,
}

impl From<ReminderCreatedEvent> for HandleReminderCreatedCommand {
    fn from(event: ReminderCreatedEvent) -> Self {
        Self { event }
    }
}
