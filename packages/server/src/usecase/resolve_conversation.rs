//! UseCase: 会話の解決
//!
//! 2 人のメンバーの会話を取得し、なければ作成します。
//! 同じ組への同時呼び出しでも会話が 1 件だけになるよう、作成は
//! 永続化ストアの「存在しなければ挿入」に任せます。

use std::{sync::Arc, time::Duration};

use chatline_shared::time::Clock;

use crate::domain::{
    Conversation, ConversationRepository, MemberPair, Timestamp, UserId, ValueObjectError,
};

use super::{error::ResolveConversationError, persistence::bounded};

/// 会話解決のユースケース
pub struct ResolveConversationUseCase {
    repository: Arc<dyn ConversationRepository>,
    clock: Arc<dyn Clock>,
    persistence_timeout: Duration,
}

impl ResolveConversationUseCase {
    pub fn new(
        repository: Arc<dyn ConversationRepository>,
        clock: Arc<dyn Clock>,
        persistence_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            clock,
            persistence_timeout,
        }
    }

    /// 会話を解決する
    ///
    /// メンバーの順序は問わない。
    pub async fn execute(
        &self,
        member_a: UserId,
        member_b: UserId,
    ) -> Result<Conversation, ResolveConversationError> {
        let members = match MemberPair::new(member_a, member_b) {
            Ok(members) => members,
            Err(ValueObjectError::SameMember(id)) => {
                return Err(ResolveConversationError::SameMember(id));
            }
            Err(e) => return Err(ResolveConversationError::ConversationUnavailable(e.to_string())),
        };

        let found = bounded(
            self.persistence_timeout,
            self.repository.find_conversation(&members),
        )
        .await
        .map_err(|e| ResolveConversationError::ConversationUnavailable(e.to_string()))?;
        if let Some(conversation) = found {
            return Ok(conversation);
        }

        let created_at = Timestamp::new(self.clock.now_millis());
        let conversation = bounded(
            self.persistence_timeout,
            self.repository.create_conversation(members, created_at),
        )
        .await
        .map_err(|e| ResolveConversationError::ConversationUnavailable(e.to_string()))?;
        tracing::info!(
            "Resolved conversation '{}' for {} and {}",
            conversation.id,
            conversation.members.first(),
            conversation.members.second()
        );
        Ok(conversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConversationId, MockConversationRepository, RepositoryError},
        infrastructure::repository::InMemoryConversationRepository,
    };
    use async_trait::async_trait;
    use chatline_shared::time::FixedClock;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn create_usecase(repository: Arc<dyn ConversationRepository>) -> ResolveConversationUseCase {
        ResolveConversationUseCase::new(repository, Arc::new(FixedClock::new(5_000)), TIMEOUT)
    }

    #[tokio::test]
    async fn test_resolve_creates_then_reuses_conversation() {
        // テスト項目: 初回は作成し、逆順のメンバーでも同じ会話を返す
        // given (前提条件):
        let repository = Arc::new(InMemoryConversationRepository::new());
        let usecase = create_usecase(repository.clone());

        // when (操作):
        let first = usecase.execute(user("alice"), user("bob")).await.unwrap();
        let second = usecase.execute(user("bob"), user("alice")).await.unwrap();

        // then (期待する結果):
        assert_eq!(first, second);
        assert_eq!(first.created_at, Timestamp::new(5_000));
        assert_eq!(repository.count().await, 1);
    }

    #[tokio::test]
    async fn test_resolve_same_member_fails() {
        // テスト項目: 同じメンバー同士の会話は解決できない
        // given (前提条件):
        let usecase = create_usecase(Arc::new(InMemoryConversationRepository::new()));

        // when (操作):
        let result = usecase.execute(user("alice"), user("alice")).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ResolveConversationError::SameMember("alice".to_string()))
        );
    }

    #[tokio::test]
    async fn test_concurrent_resolves_yield_one_conversation() {
        // テスト項目: 同じ組への同時解決でも会話は 1 件だけ
        // given (前提条件):
        let repository = Arc::new(InMemoryConversationRepository::new());
        let usecase = Arc::new(create_usecase(repository.clone()));

        // when (操作):
        let mut handles = Vec::new();
        for i in 0..16 {
            let usecase = usecase.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    usecase.execute(user("alice"), user("bob")).await
                } else {
                    usecase.execute(user("bob"), user("alice")).await
                }
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }

        // then (期待する結果):
        assert_eq!(repository.count().await, 1);
        assert!(ids.iter().all(|id| *id == ids[0]));
    }

    #[tokio::test]
    async fn test_lost_race_returns_existing_conversation() {
        // テスト項目: 検索後に他の呼び出しが作成していても、既存の会話を受け取る
        // given (前提条件): find は None、create は既存の会話を返すストア
        let existing = Conversation::new(
            ConversationId::generate(),
            MemberPair::new(user("alice"), user("bob")).unwrap(),
            Timestamp::new(1_000),
        );
        let returned = existing.clone();
        let mut repository = MockConversationRepository::new();
        repository
            .expect_find_conversation()
            .times(1)
            .returning(|_| Ok(None));
        repository
            .expect_create_conversation()
            .times(1)
            .returning(move |_, _| Ok(returned.clone()));
        let usecase = create_usecase(Arc::new(repository));

        // when (操作):
        let result = usecase.execute(user("bob"), user("alice")).await;

        // then (期待する結果):
        assert_eq!(result, Ok(existing));
    }

    #[tokio::test]
    async fn test_store_failure_is_conversation_unavailable() {
        // テスト項目: ストアの障害は ConversationUnavailable になり、作成は試みない
        // given (前提条件):
        let mut repository = MockConversationRepository::new();
        repository
            .expect_find_conversation()
            .returning(|_| Err(RepositoryError::Unavailable("connection refused".to_string())));
        repository.expect_create_conversation().never();
        let usecase = create_usecase(Arc::new(repository));

        // when (操作):
        let result = usecase.execute(user("alice"), user("bob")).await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(ResolveConversationError::ConversationUnavailable(_))
        ));
    }

    struct HangingConversationRepository;

    #[async_trait]
    impl ConversationRepository for HangingConversationRepository {
        async fn find_conversation(
            &self,
            _members: &MemberPair,
        ) -> Result<Option<Conversation>, RepositoryError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(None)
        }

        async fn create_conversation(
            &self,
            _members: MemberPair,
            _created_at: Timestamp,
        ) -> Result<Conversation, RepositoryError> {
            Err(RepositoryError::Unavailable("not reached".to_string()))
        }

        async fn list_conversations(
            &self,
            _user_id: &UserId,
        ) -> Result<Vec<Conversation>, RepositoryError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        // テスト項目: 応答しないストアは時間切れで ConversationUnavailable になる
        // given (前提条件):
        let usecase = ResolveConversationUseCase::new(
            Arc::new(HangingConversationRepository),
            Arc::new(FixedClock::new(0)),
            Duration::from_millis(20),
        );

        // when (操作):
        let result = usecase.execute(user("alice"), user("bob")).await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(ResolveConversationError::ConversationUnavailable(reason)) if reason.contains("timed out")
        ));
    }
}
