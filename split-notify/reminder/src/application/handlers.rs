//! 命令处理器（编排层）- 轻量级，只负责解析触发事件并调用领域服务

use std::sync::Arc;
use std::time::Instant;

use split_notify_core::metrics::ReminderNotifierMetrics;
use tracing::{instrument, warn};

use crate::application::commands::HandleReminderCreatedCommand;
use crate::domain::model::{DispatchOutcome, Reminder};
use crate::domain::service::ReminderDomainService;
use crate::error::Result;

/// 提醒命令处理器
pub struct ReminderCommandHandler {
    domain_service: Arc<ReminderDomainService>,
    metrics: Arc<ReminderNotifierMetrics>,
}

impl ReminderCommandHandler {
    pub fn new(
        domain_service: Arc<ReminderDomainService>,
        metrics: Arc<ReminderNotifierMetrics>,
    ) -> Self {
        Self {
            domain_service,
            metrics,
        }
    }

    /// 处理新建提醒命令，返回多播结果供触发方判断调用是否完成
    #[instrument(skip(self, command), fields(document = %command.event.document))]
    pub async fn handle_reminder_created(
        &self,
        command: HandleReminderCreatedCommand,
    ) -> Result<DispatchOutcome> {
        let start = Instant::now();
        let result = self.process(command).await;
        self.record(&result, start);
        result
    }

    async fn process(&self, command: HandleReminderCreatedCommand) -> Result<DispatchOutcome> {
        let path = command.event.path()?;
        let reminder = Reminder::from_document(&command.event.reminder, &path)?;

        if reminder.split_id != path.split_id {
            warn!(
                path_split_id = %path.split_id,
                record_split_id = %reminder.split_id,
                "Reminder splitId differs from its document path, using record value"
            );
        }

        self.domain_service.notify(&path, &reminder).await
    }

    /// 解析失败与领域失败统一计入指标
    fn record(&self, result: &Result<DispatchOutcome>, start: Instant) {
        self.metrics
            .handle_duration_seconds
            .observe(start.elapsed().as_secs_f64());

        match result {
            Ok(outcome) => {
                self.metrics
                    .reminders_handled_total
                    .with_label_values(&[outcome.label()])
                    .inc();
            }
            Err(err) => {
                self.metrics
                    .reminders_handled_total
                    .with_label_values(&["failed"])
                    .inc();
                self.metrics
                    .reminder_failures_total
                    .with_label_values(&[err.kind().as_str()])
                    .inc();
            }
        }
    }
}
