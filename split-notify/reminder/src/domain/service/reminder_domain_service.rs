//! 提醒通知领域服务 - 查询、组装、筛选令牌、多播

use std::sync::Arc;

use futures::future::try_join_all;
use split_notify_core::metrics::ReminderNotifierMetrics;
use tracing::{debug, info, instrument, warn};

use crate::domain::model::{
    DispatchOutcome, FIELD_FCM_TOKEN, MulticastMessage, NotificationPayload, Reminder,
    ReminderPath, SENDER_NAME, SPLIT_DESCRIPTION, TokenSet, non_empty_str,
};
use crate::domain::repository::{DocumentStore, PushSender};
use crate::error::Result;

/// 参与者令牌查询方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenLookupMode {
    /// 逐个查询
    #[default]
    Sequential,
    /// 并发查询，结果按参与者顺序汇总
    Concurrent,
}

impl TokenLookupMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sequential" => Some(TokenLookupMode::Sequential),
            "concurrent" => Some(TokenLookupMode::Concurrent),
            _ => None,
        }
    }
}

/// 领域服务配置
#[derive(Debug, Clone)]
pub struct ReminderDomainConfig {
    pub users_collection: String,
    pub splits_collection: String,
    pub token_lookup: TokenLookupMode,
}

impl Default for ReminderDomainConfig {
    fn default() -> Self {
        Self {
            users_collection: "users".to_string(),
            splits_collection: "splits".to_string(),
            token_lookup: TokenLookupMode::Sequential,
        }
    }
}

/// 提醒通知领域服务
pub struct ReminderDomainService {
    config: ReminderDomainConfig,
    store: Arc<dyn DocumentStore>,
    push_sender: Arc<dyn PushSender>,
    metrics: Arc<ReminderNotifierMetrics>,
}

impl ReminderDomainService {
    pub fn new(
        config: ReminderDomainConfig,
        store: Arc<dyn DocumentStore>,
        push_sender: Arc<dyn PushSender>,
        metrics: Arc<ReminderNotifierMetrics>,
    ) -> Self {
        Self {
            config,
            store,
            push_sender,
            metrics,
        }
    }

    /// 处理一条新建的提醒
    #[instrument(skip(self, path, reminder), fields(split_id = %path.split_id, reminder_id = %path.reminder_id))]
    pub async fn notify(&self, path: &ReminderPath, reminder: &Reminder) -> Result<DispatchOutcome> {
        self.compose_and_dispatch(reminder).await
    }

    async fn compose_and_dispatch(&self, reminder: &Reminder) -> Result<DispatchOutcome> {
        let users = self.config.users_collection.as_str();
        let splits = self.config.splits_collection.as_str();

        let sender = self
            .store
            .get(users, &reminder.sent_by)
            .await?
            .require(users, &reminder.sent_by)?;
        let sender_name = SENDER_NAME.resolve(&sender);

        let split = self
            .store
            .get(splits, &reminder.split_id)
            .await?
            .require(splits, &reminder.split_id)?;
        let description = SPLIT_DESCRIPTION.resolve(&split);

        let payload = NotificationPayload::compose(&sender_name, &description, &reminder.split_id);

        let tokens = match self.config.token_lookup {
            TokenLookupMode::Sequential => self.collect_tokens_sequential(reminder).await?,
            TokenLookupMode::Concurrent => self.collect_tokens_concurrent(reminder).await?,
        };

        if tokens.is_empty() {
            info!(sent_by = %reminder.sent_by, "No recipient tokens, skip dispatch");
            return Ok(DispatchOutcome::NoRecipients);
        }

        let token_count = tokens.len();
        self.metrics.tokens_per_dispatch.observe(token_count as f64);

        let message = MulticastMessage::new(tokens, payload);
        let receipt = self.push_sender.send_multicast(&message).await?;

        info!(
            token_count,
            success_count = receipt.success_count,
            failure_count = receipt.failure_count,
            "Reminder notification dispatched"
        );

        Ok(DispatchOutcome::Dispatched(receipt))
    }

    async fn collect_tokens_sequential(&self, reminder: &Reminder) -> Result<TokenSet> {
        let mut tokens = TokenSet::new();
        for uid in reminder.recipients() {
            if let Some(token) = self.fetch_token(uid).await? {
                tokens.push(token);
            }
        }
        Ok(tokens)
    }

    async fn collect_tokens_concurrent(&self, reminder: &Reminder) -> Result<TokenSet> {
        let lookups = reminder.recipients().map(|uid| self.fetch_token(uid));
        let tokens = try_join_all(lookups).await?;
        Ok(tokens.into_iter().flatten().collect())
    }

    async fn fetch_token(&self, uid: &str) -> Result<Option<String>> {
        let users = self.config.users_collection.as_str();
        let user = self.store.get(users, uid).await?.require(users, uid)?;

        let token = non_empty_str(&user, FIELD_FCM_TOKEN).map(str::to_string);
        if token.is_none() {
            if user.contains_key(FIELD_FCM_TOKEN) {
                warn!(uid = %uid, "Participant has a non-string or empty fcmToken");
            } else {
                debug!(uid = %uid, "Participant has no registered token");
            }
        }
        Ok(token)
    }
}
