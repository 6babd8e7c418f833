//! 基础设施层（Repository impl）

pub mod auth;
pub mod document_store;
pub mod push;

#[cfg(test)]
pub(crate) mod http_stub;

pub use auth::{AccessTokenSource, ServiceAccountKey, ServiceAccountTokenProvider};
pub use document_store::{
    DocumentStoreRef, FirestoreDocumentStore, InMemoryDocumentStore, build_document_store,
};
pub use push::{FcmPushSender, NoopPushSender, PushSenderRef, build_push_sender};
