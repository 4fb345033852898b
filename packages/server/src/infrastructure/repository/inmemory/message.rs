//! InMemory Message Repository 実装
//!
//! 会話 ID ごとにメッセージを保存順で保持します。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConversationId, Message, MessageRepository, RepositoryError};

/// インメモリ Message Repository 実装
#[derive(Default)]
pub struct InMemoryMessageRepository {
    /// ConversationId -> 保存順のメッセージ
    messages: Mutex<HashMap<ConversationId, Vec<Message>>>,
    /// 1 会話あたりの保存上限（`None` は無制限）
    capacity_per_conversation: Option<usize>,
}

impl InMemoryMessageRepository {
    /// 新しい InMemoryMessageRepository を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 1 会話あたりの保存件数を制限した InMemoryMessageRepository を作成
    pub fn with_capacity(capacity_per_conversation: usize) -> Self {
        Self {
            messages: Mutex::new(HashMap::new()),
            capacity_per_conversation: Some(capacity_per_conversation),
        }
    }

    /// 保存されているメッセージの総数
    pub async fn count(&self) -> usize {
        self.messages.lock().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn save_message(&self, message: &Message) -> Result<(), RepositoryError> {
        let mut messages = self.messages.lock().await;
        let history = messages.entry(message.conversation_id).or_default();

        if let Some(capacity) = self.capacity_per_conversation
            && history.len() >= capacity
        {
            return Err(RepositoryError::WriteRejected(format!(
                "conversation '{}' reached its capacity of {} messages",
                message.conversation_id, capacity
            )));
        }

        history.push(message.clone());
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.messages.lock().await;
        Ok(messages.get(conversation_id).cloned().unwrap_or_default())
    }
}
