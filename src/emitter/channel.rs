use super::{encode, Emitter, PublishError};
use crate::record::Message;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Forwards messages to an in-process subscriber over a bounded channel
#[derive(Clone)]
pub struct ChannelEmitter {
    tx: mpsc::Sender<Message>,
}

impl ChannelEmitter {
    pub fn new(tx: mpsc::Sender<Message>) -> Self {
        Self { tx }
    }

    /// Create an emitter together with the receiving end
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl Emitter for ChannelEmitter {
    async fn publish(&self, message: &Message) -> Result<usize, PublishError> {
        let size = encode(message)?.len();
        self.tx
            .send(message.clone())
            .await
            .map_err(|_| PublishError::Disconnected)?;
        Ok(size)
    }

    fn backend_type(&self) -> &'static str {
        "channel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_receiver_is_disconnected() {
        let (emitter, rx) = ChannelEmitter::channel(4);
        drop(rx);

        let result = emitter.publish(&Message::Batch(Vec::new())).await;
        assert!(matches!(result, Err(PublishError::Disconnected)));
    }

    #[tokio::test]
    async fn test_publish_delivers_message() {
        let (emitter, mut rx) = ChannelEmitter::channel(4);
        let sent = emitter.publish(&Message::Batch(Vec::new())).await.unwrap();

        assert!(sent > 0);
        assert_eq!(rx.recv().await, Some(Message::Batch(Vec::new())));
    }
}
