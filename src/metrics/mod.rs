//! # Prometheus 指标收集模块
//!
//! 为各个服务模块提供统一的 Prometheus 指标收集能力。

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};

/// 全局指标注册表
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// 提醒通知服务指标
pub struct ReminderNotifierMetrics {
    /// 已处理提醒数（按结果：dispatched / no_recipients / failed）
    pub reminders_handled_total: IntCounterVec,
    /// 处理失败次数（按错误类别）
    pub reminder_failures_total: IntCounterVec,
    /// 每次多播的令牌数
    pub tokens_per_dispatch: Histogram,
    /// 单次提醒处理耗时（秒）
    pub handle_duration_seconds: Histogram,
}

impl ReminderNotifierMetrics {
    pub fn new() -> Self {
        let reminders_handled_total = IntCounterVec::new(
            Opts::new(
                "reminders_handled_total",
                "Total number of reminder events handled",
            ),
            &["outcome"],
        )
        .expect("Failed to create reminders_handled_total metric");

        let reminder_failures_total = IntCounterVec::new(
            Opts::new(
                "reminder_failures_total",
                "Total number of failed reminder invocations",
            ),
            &["kind"],
        )
        .expect("Failed to create reminder_failures_total metric");

        let tokens_per_dispatch = Histogram::with_opts(
            HistogramOpts::new(
                "reminder_tokens_per_dispatch",
                "Number of device tokens per multicast dispatch",
            )
            .buckets(vec![1.0, 2.0, 5.0, 10.0, 50.0, 100.0, 500.0]),
        )
        .expect("Failed to create tokens_per_dispatch metric");

        let handle_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "reminder_handle_duration_seconds",
                "Reminder handling duration in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )
        .expect("Failed to create handle_duration_seconds metric");

        // 注册指标，忽略重复注册错误（测试中会重复创建）
        let _ = REGISTRY.register(Box::new(reminders_handled_total.clone()));
        let _ = REGISTRY.register(Box::new(reminder_failures_total.clone()));
        let _ = REGISTRY.register(Box::new(tokens_per_dispatch.clone()));
        let _ = REGISTRY.register(Box::new(handle_duration_seconds.clone()));

        Self {
            reminders_handled_total,
            reminder_failures_total,
            tokens_per_dispatch,
            handle_duration_seconds,
        }
    }
}

impl Default for ReminderNotifierMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// 以 Prometheus 文本格式导出全局注册表
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder.encode(&REGISTRY.gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
