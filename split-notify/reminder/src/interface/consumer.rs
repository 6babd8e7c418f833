//! Kafka 触发消费者：每条提醒创建事件调用一次命令处理器

use std::future::Future;
use std::sync::Arc;

use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::BorrowedMessage;
use rdkafka::{ClientConfig, Message};
use tracing::{error, info, warn};

use crate::application::{HandleReminderCreatedCommand, ReminderCommandHandler};
use crate::config::ReminderNotifierConfig;
use crate::domain::model::{DispatchOutcome, ReminderCreatedEvent};
use crate::error::{ReminderError, Result};

pub struct ReminderTriggerConsumer {
    config: Arc<ReminderNotifierConfig>,
    consumer: StreamConsumer,
    command_handler: Arc<ReminderCommandHandler>,
}

impl ReminderTriggerConsumer {
    pub fn new(
        config: Arc<ReminderNotifierConfig>,
        command_handler: Arc<ReminderCommandHandler>,
    ) -> Result<Self> {
        info!(
            bootstrap = %config.kafka_bootstrap,
            group = %config.consumer_group,
            topic = %config.trigger_topic,
            "Creating Kafka consumer..."
        );

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka_bootstrap)
            .set("group.id", &config.consumer_group)
            .set("auto.offset.reset", "earliest")
            .set("enable.partition.eof", "false")
            .set("session.timeout.ms", "30000")
            .set("enable.auto.commit", "false") // 处理后手动提交
            .create()
            .map_err(|e| {
                error!(
                    error = %e,
                    bootstrap = %config.kafka_bootstrap,
                    "Failed to create Kafka consumer"
                );
                ReminderError::Consumer(format!("failed to create consumer: {e}"))
            })?;

        consumer
            .subscribe(&[config.trigger_topic.as_str()])
            .map_err(|e| {
                error!(error = %e, topic = %config.trigger_topic, "Failed to subscribe to Kafka topic");
                ReminderError::Consumer(format!("failed to subscribe: {e}"))
            })?;

        info!(topic = %config.trigger_topic, "Successfully subscribed to Kafka topic");

        Ok(Self {
            config,
            consumer,
            command_handler,
        })
    }

    pub fn config(&self) -> &ReminderNotifierConfig {
        &self.config
    }

    /// 消费直到 `shutdown` 完成
    pub async fn run_until<S>(&self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        info!("Starting reminder trigger consumer");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping consumer");
                    return Ok(());
                }
                received = self.consumer.recv() => {
                    match received {
                        Ok(message) => self.process(&message).await,
                        Err(e) => {
                            error!(error = %e, "Error receiving message");
                            return Err(ReminderError::Consumer(e.to_string()));
                        }
                    }
                }
            }
        }
    }

    /// 处理单条消息；失败只记录，不重投
    async fn process(&self, message: &BorrowedMessage<'_>) {
        match parse_event(message.payload()) {
            Ok(event) => {
                let event_id = event.event_id.clone().unwrap_or_default();
                let document = event.document.clone();
                match self
                    .command_handler
                    .handle_reminder_created(HandleReminderCreatedCommand::from(event))
                    .await
                {
                    Ok(DispatchOutcome::Dispatched(receipt)) => {
                        info!(
                            %event_id,
                            %document,
                            success_count = receipt.success_count,
                            failure_count = receipt.failure_count,
                            "Reminder invocation completed"
                        );
                    }
                    Ok(DispatchOutcome::NoRecipients) => {
                        info!(%event_id, %document, "Reminder invocation completed without dispatch");
                    }
                    Err(e) => {
                        error!(
                            %event_id,
                            %document,
                            kind = e.kind().as_str(),
                            error = %e,
                            "Reminder invocation failed"
                        );
                    }
                }
            }
            Err(e) => {
                warn!(
                    partition = message.partition(),
                    offset = message.offset(),
                    error = %e,
                    "Skipping malformed trigger event"
                );
            }
        }

        if let Err(e) = self.consumer.commit_message(message, CommitMode::Async) {
            warn!(error = %e, offset = message.offset(), "Failed to commit offset");
        }
    }
}

/// 解析触发事件负载
pub fn parse_event(payload: Option<&[u8]>) -> Result<ReminderCreatedEvent> {
    let payload =
        payload.ok_or_else(|| ReminderError::InvalidEvent("empty message payload".to_string()))?;
    serde_json::from_slice(payload)
        .map_err(|e| ReminderError::InvalidEvent(format!("invalid event format: {e}")))
}
