//! InMemory Conversation Repository 実装
//!
//! ドメイン層が定義する ConversationRepository trait の具体的な実装。
//! メンバーの組（`MemberPair`）を自然キーとする HashMap をインメモリ DB として使用します。
//!
//! 一意性は「キーが存在しなければ挿入」を 1 回のロック区間で行うことで保証します。
//! RDBMS で実装する場合は、メンバーの組に UNIQUE 制約を張った upsert に相当します。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Conversation, ConversationId, ConversationRepository, MemberPair, RepositoryError, Timestamp,
    UserId,
};

/// インメモリ Conversation Repository 実装
#[derive(Default)]
pub struct InMemoryConversationRepository {
    /// MemberPair -> Conversation
    conversations: Mutex<HashMap<MemberPair, Conversation>>,
}

impl InMemoryConversationRepository {
    /// 新しい InMemoryConversationRepository を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存されている会話の件数
    pub async fn count(&self) -> usize {
        self.conversations.lock().await.len()
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn find_conversation(
        &self,
        members: &MemberPair,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let conversations = self.conversations.lock().await;
        Ok(conversations.get(members).cloned())
    }

    async fn create_conversation(
        &self,
        members: MemberPair,
        created_at: Timestamp,
    ) -> Result<Conversation, RepositoryError> {
        let mut conversations = self.conversations.lock().await;
        let conversation = conversations
            .entry(members.clone())
            .or_insert_with(|| Conversation::new(ConversationId::generate(), members, created_at));
        Ok(conversation.clone())
    }

    async fn list_conversations(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let conversations = self.conversations.lock().await;
        Ok(conversations
            .values()
            .filter(|conversation| conversation.members.contains(user_id))
            .cloned()
            .collect())
    }
}
