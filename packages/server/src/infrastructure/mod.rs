//! Infrastructure layer: concrete persistence, push transport and wire DTOs.

pub mod dto;
pub mod message_pusher;
pub mod repository;
