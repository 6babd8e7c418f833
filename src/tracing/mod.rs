//! # 日志初始化模块
//!
//! 为各个服务提供统一的 tracing-subscriber 初始化。

use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

/// 从配置初始化日志系统
///
/// 优先使用环境变量 RUST_LOG，如果没有则使用配置文件的日志级别。
/// 重复初始化时静默忽略（测试中多个用例会各自调用）。
///
/// # 示例
/// ```rust,ignore
/// use split_notify_core::config::LoggingConfig;
/// use split_notify_core::tracing::init_tracing_from_config;
///
/// init_tracing_from_config(None);
///
/// let config = LoggingConfig {
///     level: "debug".to_string(),
///     json: true,
///     ..Default::default()
/// };
/// init_tracing_from_config(Some(&config));
/// ```
pub fn init_tracing_from_config(logging_config: Option<&LoggingConfig>) {
    let default_config = LoggingConfig::default();
    let config = logging_config.unwrap_or(&default_config);

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(config.level.as_str()),
    };

    let builder = fmt::Subscriber::builder()
        .with_target(config.with_target)
        .with_thread_ids(config.with_thread_ids)
        .with_file(config.with_file)
        .with_line_number(config.with_line_number)
        .with_env_filter(env_filter);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_ok() {
        info!(level = %config.level, json = config.json, "Logging initialized");
    }
}

/// 在配置加载完成前以默认日志设置执行 `f`
///
/// 全局订阅者要等配置加载后按 `logging` 段初始化；
/// 加载过程中的告警（例如回退到默认配置）由这里的临时订阅者输出。
pub fn with_bootstrap_logging<T>(f: impl FnOnce() -> T) -> T {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(LoggingConfig::default().level.as_str()));
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .finish();

    tracing::subscriber::with_default(subscriber, f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing_from_config(None);
        init_tracing_from_config(Some(&LoggingConfig {
            json: true,
            ..Default::default()
        }));
    }

    #[test]
    fn bootstrap_logging_returns_the_closure_value() {
        let value = with_bootstrap_logging(|| {
            tracing::warn!("emitted before the global subscriber exists");
            42
        });
        assert_eq!(value, 42);
    }
}
