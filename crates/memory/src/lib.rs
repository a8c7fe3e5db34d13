//! Conversation memory for Streamgate.
//!
//! A [`ConversationBuffer`] holds the last few answers of one conversation and
//! renders them into the "previous conversation" hint sent upstream. The
//! [`ConversationStore`] keys buffers by tenant and session and forgets idle
//! conversations.

pub mod buffer;
pub mod store;

pub use buffer::{ConversationBuffer, DEFAULT_CAPACITY};
pub use store::{ConversationStore, MemoryKey, spawn_reaper};
