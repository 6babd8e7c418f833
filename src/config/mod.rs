//! Split Notify 配置模块
//!
//! 该模块提供了应用程序配置管理功能，包括：
//! - 配置文件（单文件或目录）加载和合并
//! - 环境特定配置覆盖
//! - 文档存储、推送通道、消息队列等基础设施配置

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use toml::{Table, Value};
use tracing::warn;

mod manager;
pub use manager::ConfigManager;

/// 全局应用配置实例，使用 OnceLock 确保只初始化一次
static APP_CONFIG: OnceLock<SplitNotifyAppConfig> = OnceLock::new();

/// 服务标识
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInfoConfig {
    /// 服务名称
    #[serde(default = "default_service_name")]
    pub name: String,
    /// 服务版本
    #[serde(default = "default_service_version")]
    pub version: String,
}

impl Default for ServiceInfoConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            version: default_service_version(),
        }
    }
}

fn default_service_name() -> String {
    "split-notify".to_string()
}

fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（RUST_LOG 优先）
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub with_target: bool,
    #[serde(default)]
    pub with_thread_ids: bool,
    #[serde(default)]
    pub with_file: bool,
    #[serde(default)]
    pub with_line_number: bool,
    /// 是否输出 JSON 格式日志
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: true,
            with_thread_ids: false,
            with_file: false,
            with_line_number: false,
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Kafka 集群配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct KafkaClusterConfig {
    /// Kafka 服务器地址列表
    pub bootstrap_servers: String,
    /// 客户端标识
    #[serde(default)]
    pub client_id: Option<String>,
    /// 安全协议
    #[serde(default)]
    pub security_protocol: Option<String>,
    /// 超时时间（毫秒）
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// 其他选项
    #[serde(default)]
    pub options: HashMap<String, String>,
}

/// Firestore 文档存储配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FirestoreProfileConfig {
    /// GCP 项目 ID
    pub project_id: String,
    /// REST 基础地址，默认 https://firestore.googleapis.com
    #[serde(default)]
    pub base_url: Option<String>,
    /// 模拟器地址（host:port），设置后忽略 base_url
    #[serde(default)]
    pub emulator_host: Option<String>,
    /// 服务账号密钥文件路径，令牌按需换取并刷新
    #[serde(default)]
    pub service_account_key: Option<String>,
    /// 固定 OAuth2 访问令牌（不刷新，仅用于短期调试）
    #[serde(default)]
    pub access_token: Option<String>,
    /// 请求超时（毫秒）
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// FCM 推送通道配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FcmProfileConfig {
    /// GCP 项目 ID
    pub project_id: String,
    /// HTTP v1 基础地址，默认 https://fcm.googleapis.com
    #[serde(default)]
    pub endpoint: Option<String>,
    /// 服务账号密钥文件路径，令牌按需换取并刷新
    #[serde(default)]
    pub service_account_key: Option<String>,
    /// 固定 OAuth2 访问令牌（不刷新，仅用于短期调试）
    #[serde(default)]
    pub access_token: Option<String>,
    /// 请求超时（毫秒）
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// 提醒通知服务配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ReminderNotifierServiceConfig {
    /// 服务名称
    #[serde(default)]
    pub service_name: Option<String>,
    /// Kafka 配置名
    #[serde(default)]
    pub kafka: Option<String>,
    /// 消费者组
    #[serde(default)]
    pub consumer_group: Option<String>,
    /// 提醒创建事件主题
    #[serde(default)]
    pub trigger_topic: Option<String>,
    /// 用户集合名
    #[serde(default)]
    pub users_collection: Option<String>,
    /// 账单集合名
    #[serde(default)]
    pub splits_collection: Option<String>,
    /// 参与者令牌查询方式（sequential | concurrent）
    #[serde(default)]
    pub token_lookup: Option<String>,
    /// 文档存储（firestore | memory）
    #[serde(default)]
    pub document_store: Option<String>,
    /// Firestore 配置名
    #[serde(default)]
    pub firestore: Option<String>,
    /// 内存存储种子文件
    #[serde(default)]
    pub memory_seed_path: Option<String>,
    /// 推送通道（fcm | noop）
    #[serde(default)]
    pub push_provider: Option<String>,
    /// FCM 配置名
    #[serde(default)]
    pub fcm: Option<String>,
}

/// 服务配置集合
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServicesConfig {
    /// 提醒通知服务配置
    #[serde(default)]
    pub reminder_notifier: Option<ReminderNotifierServiceConfig>,
}

/// Split Notify 应用配置主结构体
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SplitNotifyAppConfig {
    #[serde(default)]
    pub service: ServiceInfoConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Kafka 配置映射
    #[serde(default)]
    pub kafka: HashMap<String, KafkaClusterConfig>,
    /// Firestore 配置映射
    #[serde(default)]
    pub firestore: HashMap<String, FirestoreProfileConfig>,
    /// FCM 配置映射
    #[serde(default)]
    pub fcm: HashMap<String, FcmProfileConfig>,
    /// 服务配置
    #[serde(default)]
    pub services: ServicesConfig,
}

impl SplitNotifyAppConfig {
    /// 获取 Kafka 配置
    pub fn kafka_profile(&self, name: &str) -> Option<&KafkaClusterConfig> {
        self.kafka.get(name)
    }

    /// 获取 Firestore 配置
    pub fn firestore_profile(&self, name: &str) -> Option<&FirestoreProfileConfig> {
        self.firestore.get(name)
    }

    /// 获取 FCM 配置
    pub fn fcm_profile(&self, name: &str) -> Option<&FcmProfileConfig> {
        self.fcm.get(name)
    }

    /// 获取提醒通知服务配置
    pub fn reminder_notifier_service(&self) -> ReminderNotifierServiceConfig {
        self.services
            .reminder_notifier
            .clone()
            .unwrap_or_default()
    }
}

/// 加载配置
///
/// `path` 可以是单个 TOML 文件，也可以是包含 `base.toml` 的目录；
/// 为 None 时依次尝试 `config` 与 `config.toml`。
pub fn load_config(path: Option<&str>) -> &'static SplitNotifyAppConfig {
    let candidates: Vec<PathBuf> = match path {
        Some(p) => vec![PathBuf::from(p)],
        None => vec![PathBuf::from("config"), PathBuf::from("config.toml")],
    };

    APP_CONFIG.get_or_init(|| load_with_fallback(&candidates, &ConfigManager::get_environment()))
}

/// 获取已加载的应用配置
pub fn app_config() -> Option<&'static SplitNotifyAppConfig> {
    APP_CONFIG.get()
}

/// 使用备选方案加载配置
fn load_with_fallback(candidates: &[PathBuf], environment: &str) -> SplitNotifyAppConfig {
    for path in candidates {
        match load_config_from_source(path, environment) {
            Ok(cfg) => return cfg,
            Err(err) => {
                warn!("failed to load config from {}: {err:#}", path.display());
            }
        }
    }

    warn!("no configuration source succeeded, falling back to defaults");
    SplitNotifyAppConfig::default()
}

/// 配置来源：单个 TOML 文件，或以 `base.toml` 为基础的片段目录
#[derive(Debug)]
enum ConfigSource {
    File(PathBuf),
    Directory(PathBuf),
}

/// 目录来源中依次叠加的片段子目录
const FRAGMENT_GROUPS: [&str; 3] = ["shared", "services", "overrides"];

impl ConfigSource {
    fn detect(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path)
            .with_context(|| format!("configuration path {} is not readable", path.display()))?;
        Ok(if metadata.is_dir() {
            ConfigSource::Directory(path.to_path_buf())
        } else {
            ConfigSource::File(path.to_path_buf())
        })
    }

    /// `environments/` 所在目录
    fn root(&self) -> &Path {
        match self {
            ConfigSource::Directory(dir) => dir.as_path(),
            ConfigSource::File(file) => file
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or(Path::new(".")),
        }
    }

    /// 按合并顺序列出片段文件
    fn fragments(&self) -> Result<Vec<PathBuf>> {
        match self {
            ConfigSource::File(file) => Ok(vec![file.clone()]),
            ConfigSource::Directory(dir) => {
                let base = dir.join("base.toml");
                if !base.is_file() {
                    bail!("missing base configuration: {}", base.display());
                }

                let mut fragments = vec![base];
                for group in FRAGMENT_GROUPS {
                    fragments.extend(toml_files_in(&dir.join(group))?);
                }
                Ok(fragments)
            }
        }
    }
}

/// 从源加载配置，并叠加环境配置
fn load_config_from_source(path: &Path, environment: &str) -> Result<SplitNotifyAppConfig> {
    let source = ConfigSource::detect(path)?;

    let mut merged = Table::new();
    for fragment in source.fragments()? {
        merge_table(&mut merged, read_fragment(&fragment)?);
    }
    ConfigManager::load_environment_config(&mut merged, source.root(), environment)?;

    Value::Table(merged)
        .try_into()
        .with_context(|| format!("invalid configuration after merging {}", path.display()))
}

/// 目录下的 `.toml` 文件（按路径排序）；目录不存在时为空
fn toml_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("unable to read config directory {}", dir.display()))?
    {
        let path = entry
            .with_context(|| format!("unable to list config directory {}", dir.display()))?
            .path();
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_fragment(path: &Path) -> Result<Table> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config fragment {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("invalid TOML content in fragment {}", path.display()))
}

/// 按键递归合并：两侧都是表时逐键合并，否则以 overlay 覆盖
fn merge_table(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match base.get_mut(&key) {
            Some(existing) => merge_entry(existing, value),
            None => {
                base.insert(key, value);
            }
        }
    }
}

fn merge_entry(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (Value::Table(existing), Value::Table(incoming)) => merge_table(existing, incoming),
        (existing, incoming) => *existing = incoming,
    }
}
