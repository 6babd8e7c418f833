//! Google OAuth2 访问令牌
//!
//! 服务账号密钥签出 RS256 JWT 断言，向 `token_uri` 换取访问令牌，
//! 缓存至过期前 5 分钟；凭证被拒绝时可主动作废缓存。

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::GoogleCredentials;
use crate::error::{ReminderError, Result};

pub const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 300;

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// 服务账号密钥文件（只取签名所需字段）
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ReminderError::Config(format!(
                "unable to read service account key {}: {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ReminderError::Config(format!(
                "invalid service account key {}: {e}",
                path.display()
            ))
        })
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

/// 服务账号令牌提供者
pub struct ServiceAccountTokenProvider {
    client: Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenProvider {
    pub fn new(client: Client, key: ServiceAccountKey, scope: &str) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            ReminderError::Config(format!(
                "invalid private key for {}: {e}",
                key.client_email
            ))
        })?;

        Ok(Self {
            client,
            key,
            encoding_key,
            scope: scope.to_string(),
            cached: Mutex::new(None),
        })
    }

    /// 返回有效的访问令牌，必要时换取新令牌
    pub async fn access_token(&self) -> Result<String> {
        // 持锁换取，并发请求只触发一次刷新
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.value.clone());
        }

        let token = self.exchange().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| ReminderError::Credentials(format!("failed to sign assertion: {e}")))
    }

    async fn exchange(&self) -> Result<CachedToken> {
        let now = Utc::now();
        let assertion = self.assertion(now)?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| ReminderError::Credentials(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReminderError::Credentials(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ReminderError::Credentials(format!("invalid token response: {e}")))?;

        info!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "Obtained Google access token"
        );

        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

/// 请求所用的 Bearer 令牌来源
pub enum AccessTokenSource {
    Anonymous,
    /// 固定令牌，不刷新
    Static(String),
    ServiceAccount(ServiceAccountTokenProvider),
}

impl AccessTokenSource {
    pub fn from_credentials(
        credentials: &GoogleCredentials,
        scope: &str,
        client: Client,
    ) -> Result<Self> {
        match credentials {
            GoogleCredentials::Anonymous => Ok(AccessTokenSource::Anonymous),
            GoogleCredentials::AccessToken(token) => Ok(AccessTokenSource::Static(token.clone())),
            GoogleCredentials::ServiceAccountKey(path) => {
                let key = ServiceAccountKey::from_file(path)?;
                debug!(client_email = %key.client_email, scope, "Using service account credentials");
                Ok(AccessTokenSource::ServiceAccount(
                    ServiceAccountTokenProvider::new(client, key, scope)?,
                ))
            }
        }
    }

    pub async fn bearer(&self) -> Result<Option<String>> {
        match self {
            AccessTokenSource::Anonymous => Ok(None),
            AccessTokenSource::Static(token) => Ok(Some(token.clone())),
            AccessTokenSource::ServiceAccount(provider) => provider.access_token().await.map(Some),
        }
    }

    /// 凭证被拒绝后调用，下一次请求重新换取
    pub async fn invalidate(&self) {
        if let AccessTokenSource::ServiceAccount(provider) = self {
            provider.invalidate().await;
        }
    }
}
