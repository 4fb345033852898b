//! Repository trait 定義
//!
//! ドメイン層が必要とする永続化ストアのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! 会話とメッセージの寿命は永続化ストアが所有します。
//! このサーバーは問い合わせと挿入だけを行います。

use async_trait::async_trait;

use super::{Conversation, ConversationId, MemberPair, Message, RepositoryError, Timestamp, UserId};

/// Conversation Repository trait
///
/// ## 一意性の保証
///
/// `create_conversation` は「存在しなければ挿入」をアトミックに行う。
/// 同じメンバーの組に対する同時呼び出しでも、作成される会話は 1 件だけで、
/// 競合に負けた呼び出しは既存の会話を受け取る。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// メンバーの組に対応する会話を取得
    async fn find_conversation(
        &self,
        members: &MemberPair,
    ) -> Result<Option<Conversation>, RepositoryError>;

    /// 会話を作成（既に存在する場合は既存の会話を返す）
    async fn create_conversation(
        &self,
        members: MemberPair,
        created_at: Timestamp,
    ) -> Result<Conversation, RepositoryError>;

    /// ユーザーが参加している全ての会話を取得
    async fn list_conversations(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Conversation>, RepositoryError>;
}

/// Message Repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// メッセージを保存
    async fn save_message(&self, message: &Message) -> Result<(), RepositoryError>;

    /// 会話のメッセージ履歴を古い順に取得
    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, RepositoryError>;
}
