//! UseCase: 会話一覧の取得
//!
//! ユーザーが参加している会話を、相手のユーザー ID とマッチした時刻
//! （会話の作成時刻）付きで返します。新しくマッチした順に並べます。

use std::{sync::Arc, time::Duration};

use crate::domain::{ConversationRepository, ConversationSummary, UserId};

use super::{error::ListConversationsError, persistence::bounded};

/// 会話一覧取得のユースケース
pub struct ListConversationsUseCase {
    repository: Arc<dyn ConversationRepository>,
    persistence_timeout: Duration,
}

impl ListConversationsUseCase {
    pub fn new(repository: Arc<dyn ConversationRepository>, persistence_timeout: Duration) -> Self {
        Self {
            repository,
            persistence_timeout,
        }
    }

    pub async fn execute(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ConversationSummary>, ListConversationsError> {
        let conversations = bounded(
            self.persistence_timeout,
            self.repository.list_conversations(user_id),
        )
        .await
        .map_err(|e| ListConversationsError::Unavailable(e.to_string()))?;

        let mut summaries: Vec<ConversationSummary> = conversations
            .into_iter()
            .filter_map(|conversation| {
                let partner_id = conversation.members.partner_of(user_id)?.clone();
                Some(ConversationSummary {
                    conversation_id: conversation.id,
                    partner_id,
                    matched_at: conversation.created_at,
                })
            })
            .collect();

        // 新しい順、同時刻なら相手の ID 順
        summaries.sort_by(|a, b| {
            b.matched_at
                .cmp(&a.matched_at)
                .then_with(|| a.partner_id.cmp(&b.partner_id))
        });
        Ok(summaries)
    }
}
