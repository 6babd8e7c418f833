//! 领域模型

pub mod document;
pub mod notification;
pub mod reminder;

pub use document::{
    Document, FetchResult, FieldDefault, SENDER_NAME, SPLIT_DESCRIPTION, non_empty_str,
};
pub use notification::{
    DispatchOutcome, FIELD_FCM_TOKEN, MAX_MULTICAST_TOKENS, MulticastMessage, MulticastReceipt,
    NotificationContent, NotificationPayload, SendResponse, TokenSet,
};
pub use reminder::{
    FIELD_PARTICIPANTS, FIELD_SENT_BY, FIELD_SPLIT_ID, Reminder, ReminderCreatedEvent,
    ReminderPath,
};
