//! Split Notify Core 公共库
//!
//! 提供统一的配置加载、日志初始化和指标收集功能

pub mod config;
pub mod metrics;
pub mod tracing;

pub use config::{
    ConfigManager, FcmProfileConfig, FirestoreProfileConfig, KafkaClusterConfig, LoggingConfig,
    ReminderNotifierServiceConfig, ServiceInfoConfig, ServicesConfig, SplitNotifyAppConfig,
    app_config, load_config,
};
pub use metrics::ReminderNotifierMetrics;
