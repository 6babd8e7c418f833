//! Wire 风格的依赖注入模块
//!
//! 按依赖顺序构建所有组件

use std::sync::Arc;

use anyhow::{Context, Result};
use split_notify_core::config::SplitNotifyAppConfig;
use split_notify_core::metrics::ReminderNotifierMetrics;

use crate::application::ReminderCommandHandler;
use crate::config::ReminderNotifierConfig;
use crate::domain::repository::{DocumentStore, PushSender};
use crate::domain::service::ReminderDomainService;
use crate::infrastructure::{build_document_store, build_push_sender};
use crate::interface::ReminderTriggerConsumer;

/// 应用上下文 - 包含所有已初始化的服务
pub struct ApplicationContext {
    pub config: Arc<ReminderNotifierConfig>,
    pub command_handler: Arc<ReminderCommandHandler>,
    pub consumer: Arc<ReminderTriggerConsumer>,
}

/// 构建命令处理器（不含消费者），测试与嵌入场景使用
pub fn build_command_handler(
    config: &ReminderNotifierConfig,
    store: Arc<dyn DocumentStore>,
    push_sender: Arc<dyn PushSender>,
    metrics: Arc<ReminderNotifierMetrics>,
) -> Arc<ReminderCommandHandler> {
    let domain_service = Arc::new(ReminderDomainService::new(
        config.domain_config(),
        store,
        push_sender,
        metrics.clone(),
    ));
    Arc::new(ReminderCommandHandler::new(domain_service, metrics))
}

/// 构建应用上下文
pub async fn initialize(app_config: &SplitNotifyAppConfig) -> Result<ApplicationContext> {
    // 1. 加载服务配置
    let config = Arc::new(
        ReminderNotifierConfig::from_app_config(app_config)
            .context("Failed to resolve reminder notifier config")?,
    );

    // 2. 构建文档存储
    let store = build_document_store(&config.document_store)
        .context("Failed to build document store")?;

    // 3. 构建推送发送器
    let push_sender =
        build_push_sender(&config.push_provider).context("Failed to build push sender")?;

    // 4. 初始化指标收集
    let metrics = Arc::new(ReminderNotifierMetrics::new());

    // 5. 构建领域服务与命令处理器
    let command_handler = build_command_handler(&config, store, push_sender, metrics);

    // 6. 构建消费者
    let consumer = Arc::new(
        ReminderTriggerConsumer::new(config.clone(), command_handler.clone())
            .context("Failed to create reminder trigger consumer")?,
    );

    tracing::info!(
        service = %config.service_name,
        bootstrap = %config.kafka_bootstrap,
        group = %config.consumer_group,
        token_lookup = ?config.token_lookup,
        "Reminder notifier initialized"
    );

    Ok(ApplicationContext {
        config,
        command_handler,
        consumer,
    })
}
