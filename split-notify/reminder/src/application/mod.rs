//! 应用服务层（Command）

pub mod commands;
pub mod handlers;

pub use commands::HandleReminderCreatedCommand;
pub use handlers::ReminderCommandHandler;
