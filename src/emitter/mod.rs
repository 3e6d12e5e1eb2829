//! Publication backends for replayed snapshots
//!
//! The transport is pluggable: replay hands each `Message` to an `Emitter`
//! and only cares about the bytes-sent count or the failure. Failures are
//! logged by the caller and never stop a replay.

pub mod channel;
pub mod jsonl;

pub use channel::ChannelEmitter;
pub use jsonl::JsonlEmitter;

use crate::record::Message;
use async_trait::async_trait;

#[derive(Debug)]
pub enum PublishError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Disconnected,
}

impl From<std::io::Error> for PublishError {
    fn from(err: std::io::Error) -> Self {
        PublishError::Io(err)
    }
}

impl From<serde_json::Error> for PublishError {
    fn from(err: serde_json::Error) -> Self {
        PublishError::Serialization(err)
    }
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishError::Io(e) => write!(f, "IO error: {}", e),
            PublishError::Serialization(e) => write!(f, "Serialization error: {}", e),
            PublishError::Disconnected => write!(f, "Subscriber disconnected"),
        }
    }
}

impl std::error::Error for PublishError {}

/// Encode a message into its wire form.
pub fn encode(message: &Message) -> Result<Vec<u8>, PublishError> {
    Ok(serde_json::to_vec(message)?)
}

/// Decode a message from its wire form.
pub fn decode(bytes: &[u8]) -> Result<Message, PublishError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[async_trait]
pub trait Emitter: Send + Sync {
    /// Publish one message, returning the number of encoded bytes sent
    async fn publish(&self, message: &Message) -> Result<usize, PublishError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
