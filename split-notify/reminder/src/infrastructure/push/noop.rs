use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::domain::model::{MulticastMessage, MulticastReceipt, SendResponse};
use crate::domain::repository::PushSender;
use crate::error::Result;

pub struct NoopPushSender;

#[async_trait]
impl PushSender for NoopPushSender {
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<MulticastReceipt> {
        info!(
            token_count = message.tokens.len(),
            title = %message.notification.title,
            "noop push sender invoked"
        );
        Ok(MulticastReceipt::from_responses(
            message
                .tokens
                .iter()
                .enumerate()
                .map(|(idx, token)| SendResponse::accepted(token.clone(), format!("noop-{idx}")))
                .collect(),
        ))
    }
}

impl NoopPushSender {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self)
    }
}
