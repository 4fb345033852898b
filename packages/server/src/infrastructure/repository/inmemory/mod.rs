//! インメモリ実装

pub mod conversation;
pub mod message;

pub use conversation::InMemoryConversationRepository;
pub use message::InMemoryMessageRepository;
