//! Domain layer for the presence and message routing core.
//!
//! This module contains business rules that are independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod entity;
pub mod error;
pub mod message_pusher;
pub mod registry;
pub mod repository;
pub mod value_object;

pub use entity::{
    Connection, ConnectionState, Conversation, ConversationSummary, DisconnectReason, Message,
    PresenceRoster,
};
pub use error::{
    LifecycleError, MessagePushError, RegistryError, RepositoryError, ValueObjectError,
};
pub use message_pusher::{MessagePusher, PushEvent, PusherChannel};
pub use registry::{ConnectionRegistry, RegisterOutcome, RosterFeed, UnregisterOutcome};
pub use repository::{ConversationRepository, MessageRepository};
pub use value_object::{
    ConnectionId, ConversationId, MemberPair, MessageBody, Timestamp, UserId,
};

#[cfg(test)]
pub use repository::{MockConversationRepository, MockMessageRepository};
