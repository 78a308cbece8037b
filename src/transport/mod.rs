//! Outbound transport seam
//!
//! The real messaging transport (pairing, session persistence, delivery) is
//! an external collaborator. The gateway only needs its send capability,
//! expressed as a trait so tests and local runs can substitute an in-process
//! channel.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::conversation::SenderId;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `text` to `recipient`. The recipient identity is already
    /// normalized; the transport adds its own addressing back.
    async fn send(&self, recipient: &SenderId, text: &str) -> Result<(), TransportError>;
}

/// Outbound message as observed by a [`ChannelTransport`] consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub recipient: SenderId,
    pub text: String,
}

/// In-process transport backed by a tokio channel. Local runs drain the
/// receiver to stdout; tests assert on it.
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, recipient: &SenderId, text: &str) -> Result<(), TransportError> {
        self.tx
            .send(OutboundMessage {
                recipient: recipient.clone(),
                text: text.to_string(),
            })
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }
}
