//! 统一异常处理模块

use thiserror::Error;

/// 错误类别，供调用方（消费者、指标）区分失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 存储不可达、无权限等查询失败
    LookupFailure,
    /// 字段缺失（含文档不存在时访问其数据）
    MissingField,
    /// 推送调用被拒绝
    DispatchFailure,
    /// 触发事件本身不合法
    Trigger,
    /// 启动阶段（配置、消费者）错误
    Startup,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::LookupFailure => "lookup_failure",
            ErrorKind::MissingField => "missing_field",
            ErrorKind::DispatchFailure => "dispatch_failure",
            ErrorKind::Trigger => "trigger",
            ErrorKind::Startup => "startup",
        }
    }
}

/// 提醒通知错误类型
#[derive(Debug, Error)]
pub enum ReminderError {
    /// 文档存储查询失败
    #[error("Lookup of {collection}/{id} failed: {message}")]
    Lookup {
        collection: String,
        id: String,
        message: String,
    },

    /// 文档不存在，但需要读取其数据
    #[error("Document {collection}/{id} does not exist")]
    DocumentNotFound { collection: String, id: String },

    /// 必需字段缺失
    #[error("Missing field `{field}` on {context}")]
    MissingField { field: String, context: String },

    /// 字段存在但类型不符
    #[error("Field `{field}` on {context} has unexpected type: {message}")]
    InvalidField {
        field: String,
        context: String,
        message: String,
    },

    /// 推送调用失败
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// 触发事件不合法
    #[error("Invalid trigger event: {0}")]
    InvalidEvent(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// 消费者错误
    #[error("Consumer error: {0}")]
    Consumer(String),

    /// 访问令牌不可用（签名或换取失败）
    #[error("Credentials error: {0}")]
    Credentials(String),
}

impl ReminderError {
    pub fn lookup(collection: &str, id: &str, message: impl Into<String>) -> Self {
        ReminderError::Lookup {
            collection: collection.to_string(),
            id: id.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(collection: &str, id: &str) -> Self {
        ReminderError::DocumentNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn missing_field(field: &str, context: impl Into<String>) -> Self {
        ReminderError::MissingField {
            field: field.to_string(),
            context: context.into(),
        }
    }

    pub fn invalid_field(field: &str, context: impl Into<String>, message: impl Into<String>) -> Self {
        ReminderError::InvalidField {
            field: field.to_string(),
            context: context.into(),
            message: message.into(),
        }
    }

    /// 错误类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReminderError::Lookup { .. } => ErrorKind::LookupFailure,
            ReminderError::DocumentNotFound { .. }
            | ReminderError::MissingField { .. }
            | ReminderError::InvalidField { .. } => ErrorKind::MissingField,
            ReminderError::Dispatch(_) => ErrorKind::DispatchFailure,
            ReminderError::InvalidEvent(_) => ErrorKind::Trigger,
            ReminderError::Config(_)
            | ReminderError::Consumer(_)
            | ReminderError::Credentials(_) => ErrorKind::Startup,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReminderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_document_is_classified_as_missing_field() {
        let err = ReminderError::not_found("users", "U1");
        assert_eq!(err.kind(), ErrorKind::MissingField);
        assert_eq!(err.to_string(), "Document users/U1 does not exist");
    }

    #[test]
    fn kinds_cover_taxonomy() {
        assert_eq!(
            ReminderError::lookup("splits", "S1", "permission denied").kind(),
            ErrorKind::LookupFailure
        );
        assert_eq!(
            ReminderError::Dispatch("invalid token".into()).kind(),
            ErrorKind::DispatchFailure
        );
        assert_eq!(
            ReminderError::missing_field("sentBy", "reminder R1").kind().as_str(),
            "missing_field"
        );
    }
}
