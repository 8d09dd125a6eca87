//! Streaming chat: optimistic message state and the exchange driver.

mod consumer;
mod message;

pub use consumer::{ChatClient, ChatEvent, ExchangeOutcome, StreamStatus};
pub use message::{Conversation, ERROR_NOTE, Message, MessageId, MessageUpdate, Role};
