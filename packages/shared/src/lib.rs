//! Utilities shared by the Chatline server and client.

pub mod logger;
pub mod time;
