//! UseCase: メッセージ履歴の取得

use std::{sync::Arc, time::Duration};

use crate::domain::{ConversationId, Message, MessageRepository};

use super::{error::GetMessageHistoryError, persistence::bounded};

/// メッセージ履歴取得のユースケース
pub struct GetMessageHistoryUseCase {
    repository: Arc<dyn MessageRepository>,
    persistence_timeout: Duration,
}

impl GetMessageHistoryUseCase {
    pub fn new(repository: Arc<dyn MessageRepository>, persistence_timeout: Duration) -> Self {
        Self {
            repository,
            persistence_timeout,
        }
    }

    /// 会話のメッセージを古い順に返す（未知の会話は空）
    pub async fn execute(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, GetMessageHistoryError> {
        let mut messages = bounded(
            self.persistence_timeout,
            self.repository.list_messages(conversation_id),
        )
        .await
        .map_err(|e| GetMessageHistoryError::Unavailable(e.to_string()))?;

        // 同時刻のメッセージは保存順のまま
        messages.sort_by_key(|message| message.sent_at);
        Ok(messages)
    }
}
