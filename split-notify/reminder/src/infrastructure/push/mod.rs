pub mod fcm;
pub mod noop;

use std::sync::Arc;

use crate::config::PushProvider;
use crate::domain::repository::PushSender;
use crate::error::Result;

pub use fcm::FcmPushSender;
pub use noop::NoopPushSender;

pub type PushSenderRef = Arc<dyn PushSender>;

pub fn build_push_sender(provider: &PushProvider) -> Result<PushSenderRef> {
    match provider {
        PushProvider::Fcm(settings) => Ok(Arc::new(FcmPushSender::new(settings)?)),
        PushProvider::Noop => Ok(NoopPushSender::shared() as PushSenderRef),
    }
}
