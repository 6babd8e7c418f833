//! 文档存储读取结果与字段默认值

use serde_json::{Map, Value};

use crate::error::{ReminderError, Result};

/// 文档字段映射
pub type Document = Map<String, Value>;

/// 点查结果：找到（带数据）或不存在。传输错误走 `Err(ReminderError::Lookup)`。
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    Found(Document),
    NotFound,
}

impl FetchResult {
    pub fn is_found(&self) -> bool {
        matches!(self, FetchResult::Found(_))
    }

    /// 需要读取文档数据时调用；文档不存在即失败
    pub fn require(self, collection: &str, id: &str) -> Result<Document> {
        match self {
            FetchResult::Found(document) => Ok(document),
            FetchResult::NotFound => Err(ReminderError::not_found(collection, id)),
        }
    }
}

/// 字段默认值
///
/// 空字符串、`0`、`false`、`null` 与缺失字段一样使用 fallback；
/// 数字与 `true` 按文本展示；数组和对象没有可读文本，同样使用 fallback。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDefault {
    pub field: &'static str,
    pub fallback: &'static str,
}

impl FieldDefault {
    pub const fn new(field: &'static str, fallback: &'static str) -> Self {
        Self { field, fallback }
    }

    pub fn resolve(&self, document: &Document) -> String {
        document
            .get(self.field)
            .and_then(display_text)
            .unwrap_or_else(|| self.fallback.to_string())
    }
}

/// 发送者显示名
pub const SENDER_NAME: FieldDefault = FieldDefault::new("name", "Unknown");

/// 账单描述
pub const SPLIT_DESCRIPTION: FieldDefault = FieldDefault::new("description", "No description");

fn display_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) if number.as_f64() != Some(0.0) => Some(number.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// 读取非空字符串字段
pub fn non_empty_str<'a>(document: &'a Document, field: &str) -> Option<&'a str> {
    document
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn default_applies_to_absent_and_falsy_values() {
        assert_eq!(SENDER_NAME.resolve(&doc(json!({}))), "Unknown");
        assert_eq!(SENDER_NAME.resolve(&doc(json!({"name": ""}))), "Unknown");
        assert_eq!(SENDER_NAME.resolve(&doc(json!({"name": null}))), "Unknown");
        assert_eq!(SENDER_NAME.resolve(&doc(json!({"name": 0}))), "Unknown");
        assert_eq!(SENDER_NAME.resolve(&doc(json!({"name": false}))), "Unknown");
        assert_eq!(
            SPLIT_DESCRIPTION.resolve(&doc(json!({"description": {"en": "Lunch"}}))),
            "No description"
        );
    }

    #[test]
    fn scalar_values_are_shown_as_text() {
        assert_eq!(SENDER_NAME.resolve(&doc(json!({"name": 42}))), "42");
        assert_eq!(SENDER_NAME.resolve(&doc(json!({"name": true}))), "true");
        assert_eq!(
            SPLIT_DESCRIPTION.resolve(&doc(json!({"description": 12.5}))),
            "12.5"
        );
    }

    #[test]
    fn present_value_wins() {
        assert_eq!(SENDER_NAME.resolve(&doc(json!({"name": "Alice"}))), "Alice");
        assert_eq!(
            SPLIT_DESCRIPTION.resolve(&doc(json!({"description": "Lunch"}))),
            "Lunch"
        );
    }

    #[test]
    fn require_on_missing_document_fails() {
        let err = FetchResult::NotFound.require("splits", "S9").unwrap_err();
        assert!(matches!(err, ReminderError::DocumentNotFound { .. }));

        let found = FetchResult::Found(doc(json!({"description": "Taxi"})));
        assert!(found.is_found());
        assert_eq!(
            found.require("splits", "S1").unwrap()["description"],
            json!("Taxi")
        );
    }
}
