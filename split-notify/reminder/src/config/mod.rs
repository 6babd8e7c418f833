//! 提醒通知服务配置
//!
//! 每个配置项的取值顺序：环境变量 → 服务配置段/配置档 → 默认值

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use split_notify_core::config::{
    FcmProfileConfig, FirestoreProfileConfig, SplitNotifyAppConfig,
};

use crate::domain::service::{ReminderDomainConfig, TokenLookupMode};
use crate::error::{ReminderError, Result};

const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com";
const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Google API 凭证
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoogleCredentials {
    /// 不带 Authorization 头（模拟器）
    Anonymous,
    /// 固定访问令牌，过期后不会刷新
    AccessToken(String),
    /// 服务账号密钥文件，按需换取并刷新访问令牌
    ServiceAccountKey(PathBuf),
}

impl GoogleCredentials {
    /// 取值顺序：GOOGLE_APPLICATION_CREDENTIALS → 配置档密钥 → GOOGLE_OAUTH_ACCESS_TOKEN → 配置档令牌
    fn resolve<F>(key_path: Option<&str>, access_token: Option<&str>, var: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = var("GOOGLE_APPLICATION_CREDENTIALS")
            .or_else(|| key_path.map(str::to_string))
            .filter(|p| !p.is_empty())
        {
            return GoogleCredentials::ServiceAccountKey(PathBuf::from(path));
        }
        match var("GOOGLE_OAUTH_ACCESS_TOKEN")
            .or_else(|| access_token.map(str::to_string))
            .filter(|t| !t.is_empty())
        {
            Some(token) => GoogleCredentials::AccessToken(token),
            None => GoogleCredentials::Anonymous,
        }
    }
}

/// Firestore REST 设置
#[derive(Debug, Clone)]
pub struct FirestoreSettings {
    pub project_id: String,
    pub base_url: String,
    pub credentials: GoogleCredentials,
    pub timeout: Duration,
}

/// FCM HTTP v1 设置
#[derive(Debug, Clone)]
pub struct FcmSettings {
    pub project_id: String,
    pub endpoint: String,
    pub credentials: GoogleCredentials,
    pub timeout: Duration,
}

/// 文档存储选择
#[derive(Debug, Clone)]
pub enum DocumentStoreProvider {
    Firestore(FirestoreSettings),
    Memory { seed_path: Option<String> },
}

/// 推送通道选择
#[derive(Debug, Clone)]
pub enum PushProvider {
    Fcm(FcmSettings),
    Noop,
}

#[derive(Debug, Clone)]
pub struct ReminderNotifierConfig {
    pub service_name: String,
    pub kafka_bootstrap: String,
    pub consumer_group: String,
    pub trigger_topic: String,
    pub users_collection: String,
    pub splits_collection: String,
    pub token_lookup: TokenLookupMode,
    pub document_store: DocumentStoreProvider,
    pub push_provider: PushProvider,
}

impl ReminderNotifierConfig {
    pub fn from_app_config(app: &SplitNotifyAppConfig) -> Result<Self> {
        Self::from_sources(app, |key| env::var(key).ok())
    }

    /// 使用给定的变量查找函数解析配置
    pub fn from_sources<F>(app: &SplitNotifyAppConfig, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let service = app.reminder_notifier_service();

        let service_name = var("REMINDER_NOTIFIER_SERVICE_NAME")
            .or_else(|| service.service_name.clone())
            .unwrap_or_else(|| "reminder-notifier".to_string());

        let kafka_name = service.kafka.as_deref().unwrap_or("reminders");
        let kafka_bootstrap = var("REMINDER_NOTIFIER_KAFKA_BOOTSTRAP")
            .or_else(|| {
                app.kafka_profile(kafka_name)
                    .map(|cfg| cfg.bootstrap_servers.clone())
            })
            .unwrap_or_else(|| "localhost:9092".to_string());

        let consumer_group = var("REMINDER_NOTIFIER_CONSUMER_GROUP")
            .or_else(|| service.consumer_group.clone())
            .unwrap_or_else(|| "reminder-notifier".to_string());

        let trigger_topic = var("REMINDER_NOTIFIER_TRIGGER_TOPIC")
            .or_else(|| service.trigger_topic.clone())
            .unwrap_or_else(|| "split.reminders.created".to_string());

        let users_collection = var("REMINDER_NOTIFIER_USERS_COLLECTION")
            .or_else(|| service.users_collection.clone())
            .unwrap_or_else(|| "users".to_string());

        let splits_collection = var("REMINDER_NOTIFIER_SPLITS_COLLECTION")
            .or_else(|| service.splits_collection.clone())
            .unwrap_or_else(|| "splits".to_string());

        let token_lookup = match var("REMINDER_NOTIFIER_TOKEN_LOOKUP")
            .or_else(|| service.token_lookup.clone())
        {
            Some(value) => TokenLookupMode::parse(&value).ok_or_else(|| {
                ReminderError::Config(format!("unknown token lookup mode `{value}`"))
            })?,
            None => TokenLookupMode::default(),
        };

        let store_kind = var("REMINDER_NOTIFIER_DOCUMENT_STORE")
            .or_else(|| service.document_store.clone())
            .unwrap_or_else(|| "firestore".to_string());
        let document_store = match store_kind.as_str() {
            "firestore" => {
                let profile = service
                    .firestore
                    .as_deref()
                    .and_then(|name| app.firestore_profile(name));
                DocumentStoreProvider::Firestore(firestore_settings(profile, &var)?)
            }
            "memory" => DocumentStoreProvider::Memory {
                seed_path: var("REMINDER_NOTIFIER_MEMORY_SEED")
                    .or_else(|| service.memory_seed_path.clone()),
            },
            other => {
                return Err(ReminderError::Config(format!(
                    "unknown document store `{other}`"
                )));
            }
        };

        let push_kind = var("REMINDER_NOTIFIER_PUSH_PROVIDER")
            .or_else(|| service.push_provider.clone())
            .unwrap_or_else(|| "fcm".to_string());
        let push_provider = match push_kind.as_str() {
            "fcm" => {
                let profile = service
                    .fcm
                    .as_deref()
                    .and_then(|name| app.fcm_profile(name));
                PushProvider::Fcm(fcm_settings(profile, &var)?)
            }
            "noop" => PushProvider::Noop,
            other => {
                return Err(ReminderError::Config(format!(
                    "unknown push provider `{other}`"
                )));
            }
        };

        Ok(Self {
            service_name,
            kafka_bootstrap,
            consumer_group,
            trigger_topic,
            users_collection,
            splits_collection,
            token_lookup,
            document_store,
            push_provider,
        })
    }

    pub fn domain_config(&self) -> ReminderDomainConfig {
        ReminderDomainConfig {
            users_collection: self.users_collection.clone(),
            splits_collection: self.splits_collection.clone(),
            token_lookup: self.token_lookup,
        }
    }
}

fn firestore_settings<F>(profile: Option<&FirestoreProfileConfig>, var: &F) -> Result<FirestoreSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let project_id = var("REMINDER_NOTIFIER_FIRESTORE_PROJECT")
        .or_else(|| profile.map(|p| p.project_id.clone()))
        .or_else(|| var("GOOGLE_CLOUD_PROJECT"))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ReminderError::Config("firestore project id is not set".to_string()))?;

    // 模拟器优先
    let base_url = match var("FIRESTORE_EMULATOR_HOST")
        .or_else(|| profile.and_then(|p| p.emulator_host.clone()))
    {
        Some(host) => format!("http://{host}"),
        None => profile
            .and_then(|p| p.base_url.clone())
            .unwrap_or_else(|| DEFAULT_FIRESTORE_BASE_URL.to_string()),
    };

    let credentials = GoogleCredentials::resolve(
        profile.and_then(|p| p.service_account_key.as_deref()),
        profile.and_then(|p| p.access_token.as_deref()),
        var,
    );

    let timeout_ms = profile
        .and_then(|p| p.timeout_ms)
        .unwrap_or(DEFAULT_TIMEOUT_MS);

    Ok(FirestoreSettings {
        project_id,
        base_url: base_url.trim_end_matches('/').to_string(),
        credentials,
        timeout: Duration::from_millis(timeout_ms),
    })
}

fn fcm_settings<F>(profile: Option<&FcmProfileConfig>, var: &F) -> Result<FcmSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let project_id = var("REMINDER_NOTIFIER_FCM_PROJECT")
        .or_else(|| profile.map(|p| p.project_id.clone()))
        .or_else(|| var("GOOGLE_CLOUD_PROJECT"))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ReminderError::Config("fcm project id is not set".to_string()))?;

    let endpoint = var("REMINDER_NOTIFIER_FCM_ENDPOINT")
        .or_else(|| profile.and_then(|p| p.endpoint.clone()))
        .unwrap_or_else(|| DEFAULT_FCM_ENDPOINT.to_string());

    let credentials = GoogleCredentials::resolve(
        profile.and_then(|p| p.service_account_key.as_deref()),
        profile.and_then(|p| p.access_token.as_deref()),
        var,
    );
    if credentials == GoogleCredentials::Anonymous {
        return Err(ReminderError::Config(
            "fcm requires GOOGLE_APPLICATION_CREDENTIALS, a service_account_key or an access token"
                .to_string(),
        ));
    }

    let timeout_ms = profile
        .and_then(|p| p.timeout_ms)
        .unwrap_or(DEFAULT_TIMEOUT_MS);

    Ok(FcmSettings {
        project_id,
        endpoint: endpoint.trim_end_matches('/').to_string(),
        credentials,
        timeout: Duration::from_millis(timeout_ms),
    })
}
