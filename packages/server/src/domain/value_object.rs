//! Value Object 定義
//!
//! 不変で、値そのものによって等価性が決まるオブジェクト。
//! 生成時にバリデーションを行い、不正な値は存在できないようにします。

use std::fmt;

use uuid::Uuid;

use super::error::ValueObjectError;

/// UserId の最大文字数
pub const USER_ID_MAX_LENGTH: usize = 64;

/// MessageBody の最大文字数
pub const MESSAGE_BODY_MAX_LENGTH: usize = 2000;

/// ユーザー ID
///
/// 認証基盤から渡される不透明な識別子。空白や制御文字を含まない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::UserIdEmpty);
        }
        if value.chars().count() > USER_ID_MAX_LENGTH {
            return Err(ValueObjectError::UserIdTooLong(USER_ID_MAX_LENGTH));
        }
        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ValueObjectError::UserIdInvalidCharacter(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 接続 ID
///
/// サーバーが接続ごとに払い出す UUID v4。再接続時は必ず新しい ID になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// 会話 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationId(Uuid);

impl ConversationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Result<Self, ValueObjectError> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|_| ValueObjectError::InvalidConversationId(value.to_string()))
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// メッセージ本文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBody(String);

impl MessageBody {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::MessageBodyEmpty);
        }
        if value.chars().count() > MESSAGE_BODY_MAX_LENGTH {
            return Err(ValueObjectError::MessageBodyTooLong(MESSAGE_BODY_MAX_LENGTH));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageBody {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// タイムスタンプ（Unix エポックからのミリ秒、UTC）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// `self` から `later` までの経過ミリ秒（負にはならない）
    pub fn elapsed_until(&self, later: Timestamp) -> i64 {
        (later.0 - self.0).max(0)
    }
}

/// 2 人の会話メンバーの組
///
/// 順序に依存しない自然キー。`{A, B}` と `{B, A}` は同じ値になるよう、
/// 常にソート済みの順で保持します。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberPair {
    first: UserId,
    second: UserId,
}

impl MemberPair {
    pub fn new(a: UserId, b: UserId) -> Result<Self, ValueObjectError> {
        if a == b {
            return Err(ValueObjectError::SameMember(a.into_string()));
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { first, second })
    }

    pub fn first(&self) -> &UserId {
        &self.first
    }

    pub fn second(&self) -> &UserId {
        &self.second
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        &self.first == user_id || &self.second == user_id
    }

    /// `user_id` から見た相手側のメンバーを返す（メンバーでなければ `None`）
    pub fn partner_of(&self, user_id: &UserId) -> Option<&UserId> {
        if &self.first == user_id {
            Some(&self.second)
        } else if &self.second == user_id {
            Some(&self.first)
        } else {
            None
        }
    }
}
