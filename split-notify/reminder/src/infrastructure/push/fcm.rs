//! FCM HTTP v1 推送发送器
//!
//! HTTP v1 没有多播接口：一次多播内每个令牌发一个 `messages:send` 请求（并发），
//! 结果汇总为一个回执。单个令牌被拒绝只记录在回执里；
//! 传输失败或凭证被拒绝则整个多播失败，凭证被拒绝时作废缓存的访问令牌。

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{instrument, warn};

use crate::config::FcmSettings;
use crate::infrastructure::auth::{AccessTokenSource, FCM_SCOPE};
use crate::domain::model::{
    MAX_MULTICAST_TOKENS, MulticastMessage, MulticastReceipt, NotificationContent, SendResponse,
};
use crate::domain::repository::PushSender;
use crate::error::{ReminderError, Result};

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    message: FcmMessage<'a>,
}

#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: &'a NotificationContent,
    data: &'a BTreeMap<String, String>,
}

/// 单个令牌的投递结果
enum Delivery {
    Completed(SendResponse),
    Unauthorized(String),
    Failed(String),
}

pub struct FcmPushSender {
    client: Client,
    send_url: String,
    tokens: AccessTokenSource,
}

impl FcmPushSender {
    pub fn new(settings: &FcmSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ReminderError::Config(format!("failed to build http client: {e}")))?;

        let tokens =
            AccessTokenSource::from_credentials(&settings.credentials, FCM_SCOPE, client.clone())?;

        Ok(Self {
            client,
            send_url: format!(
                "{}/v1/projects/{}/messages:send",
                settings.endpoint, settings.project_id
            ),
            tokens,
        })
    }

    async fn send_one(
        &self,
        token: &str,
        message: &MulticastMessage,
        bearer: Option<&str>,
    ) -> Delivery {
        let body = build_send_request(token, message);

        let mut request = self.client.post(&self.send_url).json(&body);
        if let Some(bearer) = bearer {
            request = request.bearer_auth(bearer);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Delivery::Failed(format!("fcm request failed: {e}")),
        };

        let status = response.status();
        let payload: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_success() {
            let message_id = payload
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            return Delivery::Completed(SendResponse::accepted(token, message_id));
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Delivery::Unauthorized(format!(
                "fcm rejected credentials ({status}): {}",
                error_code(&payload).unwrap_or_default()
            ));
        }

        let code = error_code(&payload).unwrap_or_else(|| status.to_string());
        warn!(token = %token, error = %code, "FCM rejected token");
        Delivery::Completed(SendResponse::rejected(token, code))
    }
}

#[async_trait]
impl PushSender for FcmPushSender {
    #[instrument(skip(self, message), fields(token_count = message.tokens.len()))]
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<MulticastReceipt> {
        validate_multicast(message)?;

        let bearer = self
            .tokens
            .bearer()
            .await
            .map_err(|e| ReminderError::Dispatch(format!("fcm credentials unavailable: {e}")))?;

        let deliveries = join_all(
            message
                .tokens
                .iter()
                .map(|token| self.send_one(token, message, bearer.as_deref())),
        )
        .await;

        let mut responses = Vec::with_capacity(deliveries.len());
        for delivery in deliveries {
            match delivery {
                Delivery::Completed(response) => responses.push(response),
                Delivery::Unauthorized(reason) => {
                    self.tokens.invalidate().await;
                    return Err(ReminderError::Dispatch(reason));
                }
                Delivery::Failed(reason) => return Err(ReminderError::Dispatch(reason)),
            }
        }

        Ok(MulticastReceipt::from_responses(responses))
    }
}

/// 多播请求校验：令牌数 1..=500 且非空字符串
pub fn validate_multicast(message: &MulticastMessage) -> Result<()> {
    if message.tokens.is_empty() {
        return Err(ReminderError::Dispatch(
            "multicast requires at least one token".to_string(),
        ));
    }
    if message.tokens.len() > MAX_MULTICAST_TOKENS {
        return Err(ReminderError::Dispatch(format!(
            "multicast accepts at most {MAX_MULTICAST_TOKENS} tokens, got {}",
            message.tokens.len()
        )));
    }
    if message.tokens.iter().any(|token| token.is_empty()) {
        return Err(ReminderError::Dispatch(
            "multicast tokens must be non-empty strings".to_string(),
        ));
    }
    Ok(())
}

fn build_send_request<'a>(token: &'a str, message: &'a MulticastMessage) -> SendRequest<'a> {
    SendRequest {
        message: FcmMessage {
            token,
            notification: &message.notification,
            data: &message.data,
        },
    }
}

/// 提取错误码：优先 FcmError.errorCode，其次 error.status
fn error_code(payload: &Value) -> Option<String> {
    let error = payload.get("error")?;
    error
        .get("details")
        .and_then(Value::as_array)
        .and_then(|details| {
            details
                .iter()
                .find_map(|detail| detail.get("errorCode").and_then(Value::as_str))
        })
        .or_else(|| error.get("status").and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GoogleCredentials;
    use crate::domain::model::{NotificationPayload, TokenSet};
    use crate::infrastructure::http_stub::{HttpStub, unreachable_base_url};
    use serde_json::json;
    use std::time::Duration;

    fn sender(endpoint: &str) -> FcmPushSender {
        FcmPushSender::new(&FcmSettings {
            project_id: "split-app".into(),
            endpoint: endpoint.into(),
            credentials: GoogleCredentials::AccessToken("test-token".into()),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn target_token(request: &crate::infrastructure::http_stub::RecordedRequest) -> String {
        request.json()["message"]["token"]
            .as_str()
            .unwrap_or_default()
            .to_string()
    }

    fn message(tokens: Vec<&str>) -> MulticastMessage {
        let tokens: TokenSet = tokens.into_iter().map(str::to_string).collect();
        MulticastMessage::new(tokens, NotificationPayload::compose("Alice", "Lunch", "S1"))
    }

    #[test]
    fn send_request_matches_v1_shape() {
        let message = message(vec!["tok2"]);
        let body = serde_json::to_value(build_send_request("tok2", &message)).unwrap();
        assert_eq!(
            body,
            json!({
                "message": {
                    "token": "tok2",
                    "notification": {"title": "Alice sent a reminder", "body": "Split details of \"Lunch\""},
                    "data": {"splitId": "S1"}
                }
            })
        );
    }

    #[test]
    fn validation_bounds_token_count() {
        assert!(validate_multicast(&message(vec!["a"])).is_ok());
        assert!(validate_multicast(&message(vec![])).is_err());
        assert!(validate_multicast(&message(vec!["a", ""])).is_err());

        let many: Vec<String> = (0..=MAX_MULTICAST_TOKENS).map(|i| format!("t{i}")).collect();
        let oversized = MulticastMessage::new(
            many.into_iter().collect(),
            NotificationPayload::compose("A", "B", "S1"),
        );
        assert!(matches!(
            validate_multicast(&oversized),
            Err(ReminderError::Dispatch(_))
        ));
    }

    #[test]
    fn error_code_prefers_fcm_detail() {
        let payload = json!({
            "error": {
                "code": 404,
                "status": "NOT_FOUND",
                "details": [
                    {"@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError", "errorCode": "UNREGISTERED"}
                ]
            }
        });
        assert_eq!(error_code(&payload).as_deref(), Some("UNREGISTERED"));

        let payload = json!({"error": {"code": 400, "status": "INVALID_ARGUMENT"}});
        assert_eq!(error_code(&payload).as_deref(), Some("INVALID_ARGUMENT"));
        assert_eq!(error_code(&Value::Null), None);
    }

    #[test]
    fn send_url_targets_project() {
        assert_eq!(
            sender("https://fcm.googleapis.com").send_url,
            "https://fcm.googleapis.com/v1/projects/split-app/messages:send"
        );
    }

    #[tokio::test]
    async fn rejected_token_is_recorded_and_call_succeeds() {
        let stub = HttpStub::start(|request| {
            if target_token(request) == "stale" {
                (
                    404,
                    json!({"error": {"code": 404, "status": "NOT_FOUND", "details": [
                        {"@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError", "errorCode": "UNREGISTERED"}
                    ]}})
                    .to_string(),
                )
            } else {
                (200, json!({"name": "projects/split-app/messages/0:1"}).to_string())
            }
        })
        .await;

        let receipt = sender(&stub.base_url)
            .send_multicast(&message(vec!["tok2", "stale"]))
            .await
            .unwrap();

        assert_eq!(receipt.success_count, 1);
        assert_eq!(receipt.failure_count, 1);
        assert_eq!(receipt.responses[0].token, "tok2");
        assert!(receipt.responses[0].success);
        assert_eq!(
            receipt.responses[0].message_id.as_deref(),
            Some("projects/split-app/messages/0:1")
        );
        assert_eq!(receipt.responses[1].error.as_deref(), Some("UNREGISTERED"));

        let requests = stub.requests();
        assert_eq!(requests.len(), 2);
        for request in &requests {
            assert_eq!(request.method, "POST");
            assert_eq!(request.path, "/v1/projects/split-app/messages:send");
            assert_eq!(request.header("authorization"), Some("Bearer test-token"));
        }
    }

    #[tokio::test]
    async fn rejected_credentials_fail_the_whole_call() {
        for status in [401u16, 403] {
            let stub = HttpStub::start(move |_| {
                (
                    status,
                    json!({"error": {"code": status, "status": "UNAUTHENTICATED"}}).to_string(),
                )
            })
            .await;

            let err = sender(&stub.base_url)
                .send_multicast(&message(vec!["tok2", "tok4"]))
                .await
                .unwrap_err();
            assert!(
                matches!(err, ReminderError::Dispatch(ref m) if m.contains("rejected credentials")),
                "status {status}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn transport_failure_fails_the_whole_call() {
        let err = sender(&unreachable_base_url().await)
            .send_multicast(&message(vec!["tok2"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ReminderError::Dispatch(ref m) if m.contains("request failed")));
    }
}
