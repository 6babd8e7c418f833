//! 提醒记录、触发路径与触发事件

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::document::Document;
use crate::error::{ReminderError, Result};

pub const FIELD_SENT_BY: &str = "sentBy";
pub const FIELD_PARTICIPANTS: &str = "participants";
pub const FIELD_SPLIT_ID: &str = "splitId";

/// 提醒文档路径 `splits/{splitId}/reminders/{reminderId}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPath {
    pub split_id: String,
    pub reminder_id: String,
}

impl ReminderPath {
    pub fn new(split_id: impl Into<String>, reminder_id: impl Into<String>) -> Self {
        Self {
            split_id: split_id.into(),
            reminder_id: reminder_id.into(),
        }
    }

    /// 解析文档路径，允许带 `projects/{p}/databases/{d}/documents/` 前缀
    pub fn parse(path: &str) -> Result<Self> {
        let relative = match path.split_once("/documents/") {
            Some((prefix, rest)) if prefix.starts_with("projects/") => rest,
            _ => path,
        };

        let segments: Vec<&str> = relative.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            ["splits", split_id, "reminders", reminder_id]
                if !split_id.is_empty() && !reminder_id.is_empty() =>
            {
                Ok(Self::new(*split_id, *reminder_id))
            }
            _ => Err(ReminderError::InvalidEvent(format!(
                "document path `{path}` does not match splits/{{splitId}}/reminders/{{reminderId}}"
            ))),
        }
    }
}

impl fmt::Display for ReminderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "splits/{}/reminders/{}", self.split_id, self.reminder_id)
    }
}

/// 提醒记录（只读）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub sent_by: String,
    pub participants: Vec<String>,
    pub split_id: String,
}

impl Reminder {
    /// 从文档字段读取提醒；缺失字段即失败，不做其他校验
    pub fn from_document(document: &Document, path: &ReminderPath) -> Result<Self> {
        let context = format!("reminder {path}");

        let sent_by = required_str(document, FIELD_SENT_BY, &context)?;
        let split_id = required_str(document, FIELD_SPLIT_ID, &context)?;

        let participants = match document.get(FIELD_PARTICIPANTS) {
            None | Some(Value::Null) => {
                return Err(ReminderError::missing_field(FIELD_PARTICIPANTS, context));
            }
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        ReminderError::invalid_field(
                            FIELD_PARTICIPANTS,
                            context.clone(),
                            format!("expected user id string, got {item}"),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(ReminderError::invalid_field(
                    FIELD_PARTICIPANTS,
                    context,
                    format!("expected array, got {other}"),
                ));
            }
        };

        Ok(Self {
            sent_by,
            participants,
            split_id,
        })
    }

    /// 除发送者以外的参与者，保持原顺序与重复项
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.participants
            .iter()
            .map(String::as_str)
            .filter(move |uid| *uid != self.sent_by)
    }
}

fn required_str(document: &Document, field: &str, context: &str) -> Result<String> {
    match document.get(field) {
        None | Some(Value::Null) => Err(ReminderError::missing_field(field, context)),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(ReminderError::invalid_field(
            field,
            context,
            format!("expected string, got {other}"),
        )),
    }
}

/// 提醒创建事件
///
/// `document` 为提醒文档路径，`reminder` 为创建时的字段快照。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderCreatedEvent {
    #[serde(default)]
    pub event_id: Option<String>,
    pub document: String,
    #[serde(default)]
    pub reminder: Document,
}

impl ReminderCreatedEvent {
    pub fn path(&self) -> Result<ReminderPath> {
        ReminderPath::parse(&self.document)
    }
}
