//! 仓储接口（Port）

use async_trait::async_trait;

use crate::domain::model::{FetchResult, MulticastMessage, MulticastReceipt};
use crate::error::Result;

/// 文档存储（只读点查）
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 按集合名 + 文档 ID 读取；不存在返回 `FetchResult::NotFound`
    async fn get(&self, collection: &str, id: &str) -> Result<FetchResult>;
}

/// 多播推送发送器
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<MulticastReceipt>;
}
