//! 推送内容、令牌集合与多播请求/回执

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reminder::FIELD_SPLIT_ID;

/// 用户文档中的设备令牌字段
pub const FIELD_FCM_TOKEN: &str = "fcmToken";

/// 单次多播的最大令牌数
pub const MAX_MULTICAST_TOKENS: usize = 500;

/// 通知标题与正文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
}

/// 通知载荷（不持久化）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub notification: NotificationContent,
    pub data: BTreeMap<String, String>,
}

impl NotificationPayload {
    /// 组装提醒通知
    pub fn compose(sender_name: &str, description: &str, split_id: &str) -> Self {
        let mut data = BTreeMap::new();
        data.insert(FIELD_SPLIT_ID.to_string(), split_id.to_string());

        Self {
            notification: NotificationContent {
                title: format!("{sender_name} sent a reminder"),
                body: format!("Split details of \"{description}\""),
            },
            data,
        }
    }
}

/// 有序设备令牌列表，保留重复项
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet(Vec<String>);

impl TokenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: String) {
        self.0.push(token);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl FromIterator<String> for TokenSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// 多播请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MulticastMessage {
    pub tokens: Vec<String>,
    pub notification: NotificationContent,
    pub data: BTreeMap<String, String>,
}

impl MulticastMessage {
    pub fn new(tokens: TokenSet, payload: NotificationPayload) -> Self {
        Self {
            tokens: tokens.into_vec(),
            notification: payload.notification,
            data: payload.data,
        }
    }
}

/// 单个令牌的投递结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    pub token: String,
    pub success: bool,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SendResponse {
    pub fn accepted(token: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    pub fn rejected(token: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// 多播回执，原样交还给调用方，不做逐令牌处理
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MulticastReceipt {
    pub success_count: usize,
    pub failure_count: usize,
    pub responses: Vec<SendResponse>,
    pub dispatched_at: DateTime<Utc>,
}

impl MulticastReceipt {
    pub fn from_responses(responses: Vec<SendResponse>) -> Self {
        let success_count = responses.iter().filter(|r| r.success).count();
        Self {
            success_count,
            failure_count: responses.len() - success_count,
            responses,
            dispatched_at: Utc::now(),
        }
    }
}

/// 一次提醒处理的结果
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// 已发出多播
    Dispatched(MulticastReceipt),
    /// 没有可用令牌，未发送
    NoRecipients,
}

impl DispatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Dispatched(_) => "dispatched",
            DispatchOutcome::NoRecipients => "no_recipients",
        }
    }

    pub fn receipt(&self) -> Option<&MulticastReceipt> {
        match self {
            DispatchOutcome::Dispatched(receipt) => Some(receipt),
            DispatchOutcome::NoRecipients => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_builds_title_body_and_data() {
        let payload = NotificationPayload::compose("Alice", "Lunch", "S1");
        assert_eq!(payload.notification.title, "Alice sent a reminder");
        assert_eq!(payload.notification.body, "Split details of \"Lunch\"");
        assert_eq!(payload.data.get("splitId").map(String::as_str), Some("S1"));
        assert_eq!(payload.data.len(), 1);
    }

    #[test]
    fn receipt_counts_outcomes() {
        let receipt = MulticastReceipt::from_responses(vec![
            SendResponse::accepted("a", "m1"),
            SendResponse::rejected("b", "UNREGISTERED"),
            SendResponse::accepted("c", "m2"),
        ]);
        assert_eq!(receipt.success_count, 2);
        assert_eq!(receipt.failure_count, 1);
    }

    #[test]
    fn multicast_serializes_with_expected_shape() {
        let tokens: TokenSet = vec!["tok2".to_string()].into_iter().collect();
        let message = MulticastMessage::new(tokens, NotificationPayload::compose("A", "B", "S1"));
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["tokens"][0], "tok2");
        assert_eq!(value["notification"]["title"], "A sent a reminder");
        assert_eq!(value["data"]["splitId"], "S1");
    }
}
