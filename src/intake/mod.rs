//! Inbound message intake
//!
//! Narrow boundary between the messaging transport and the pipeline. The
//! transport's general event shape is reduced here to the fields this core
//! needs: sender, group flag, and the message body in one of its two text
//! encodings. Group messages never get a reply. The literal `ping` takes a
//! fast path that answers with the measured response time and touches
//! neither the language backend nor session memory.

use std::sync::Arc;
use std::time::Instant;

use crate::conversation::SenderId;
use crate::core::Engine;
use crate::transport::Transport;

/// Inbound message event, already reduced from the transport's own shape.
/// Exactly one of `conversation` and `extended_text` is populated per event.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Raw sender address as the transport delivered it.
    pub sender: String,
    pub is_group: bool,
    /// Plain conversational body.
    pub conversation: Option<String>,
    /// Extended-text wrapper body.
    pub extended_text: Option<String>,
}

impl InboundMessage {
    pub fn text(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            is_group: false,
            conversation: Some(body.into()),
            extended_text: None,
        }
    }

    /// Plain form first, extended form as the fallback.
    fn extract_text(&self) -> Option<&str> {
        match self.conversation.as_deref() {
            Some(text) if !text.is_empty() => Some(text),
            _ => self.extended_text.as_deref().filter(|t| !t.is_empty()),
        }
    }
}

pub struct IntakeRouter {
    engine: Arc<Engine>,
    transport: Arc<dyn Transport>,
}

impl IntakeRouter {
    pub fn new(engine: Arc<Engine>, transport: Arc<dyn Transport>) -> Self {
        Self { engine, transport }
    }

    /// Process one inbound event to completion. Fire-and-forget from the
    /// transport's perspective; callers spawn one task per event.
    pub async fn on_message(&self, event: InboundMessage) {
        let started = Instant::now();

        if event.is_group {
            return;
        }

        let Some(text) = event.extract_text() else {
            tracing::debug!(sender = %event.sender, "event carries no text, dropping");
            return;
        };

        let sender = SenderId::normalize(&event.sender);

        if text.trim() == "ping" {
            // Covers extraction and normalization, not just the send.
            let reply = format!("Pong! Response Time: {}ns", started.elapsed().as_nanos());
            if let Err(err) = self.transport.send(&sender, &reply).await {
                tracing::error!(%sender, error = %err, "failed to send pong");
            }
            return;
        }

        let text = text.to_string();
        let reply = self.engine.handle(&sender, &text).await;

        tracing::debug!(%sender, reply = %reply, "sending reply");
        if let Err(err) = self.transport.send(&sender, &reply).await {
            tracing::error!(%sender, error = %err, "failed to send reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SessionMemory;
    use crate::dispatch::{Dispatcher, HandlerError, IssueTracker, ResidentData};
    use crate::providers::{CompletionBackend, ProviderError};
    use crate::transport::ChannelTransport;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionBackend for CountingBackend {
        async fn complete(
            &self,
            _prior: &[crate::conversation::Turn],
            _message: &str,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(r#"{ "type": "chat", "value": "halo" }"#.to_string())
        }
    }

    struct NoResidents;

    #[async_trait]
    impl ResidentData for NoResidents {
        async fn personal_data(&self, s: &SenderId) -> Result<String, HandlerError> {
            Err(HandlerError::UnknownResident(s.clone()))
        }
        async fn household_data(&self, s: &SenderId) -> Result<String, HandlerError> {
            Err(HandlerError::UnknownResident(s.clone()))
        }
        async fn household_members(&self, s: &SenderId) -> Result<String, HandlerError> {
            Err(HandlerError::UnknownResident(s.clone()))
        }
    }

    struct NoIssues;

    #[async_trait]
    impl IssueTracker for NoIssues {
        async fn file_report(
            &self,
            s: &SenderId,
            _t: &str,
            _d: &str,
        ) -> Result<(), HandlerError> {
            Err(HandlerError::UnknownResident(s.clone()))
        }
    }

    struct Fixture {
        router: IntakeRouter,
        backend: Arc<CountingBackend>,
        memory: Arc<SessionMemory>,
        outbound: tokio::sync::mpsc::UnboundedReceiver<crate::transport::OutboundMessage>,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(CountingBackend {
            calls: AtomicUsize::new(0),
        });
        let memory = Arc::new(SessionMemory::new(100, Duration::from_secs(1800), 4096));
        let dispatcher = Dispatcher::new(Arc::new(NoResidents), Arc::new(NoIssues));
        let engine = Arc::new(Engine::new(backend.clone(), dispatcher, memory.clone()));
        let (transport, outbound) = ChannelTransport::new();
        Fixture {
            router: IntakeRouter::new(engine, Arc::new(transport)),
            backend,
            memory,
            outbound,
        }
    }

    #[tokio::test]
    async fn ping_gets_timestamped_pong_without_backend_or_memory() {
        let mut f = fixture();
        f.router
            .on_message(InboundMessage::text("628123:5@s.whatsapp.net", "ping"))
            .await;

        let out = f.outbound.recv().await.unwrap();
        assert_eq!(out.recipient.as_str(), "628123");
        let ns: u128 = out
            .text
            .strip_prefix("Pong! Response Time: ")
            .and_then(|s| s.strip_suffix("ns"))
            .unwrap()
            .parse()
            .unwrap();
        // The clock starts at handler entry, so the figure covers the
        // extraction and normalization work and cannot be zero.
        assert!(ns > 0);
        assert!(ns < 1_000_000_000);

        assert_eq!(f.backend.calls.load(Ordering::SeqCst), 0);
        let ctx = f.memory.get(&SenderId::normalize("628123")).await;
        assert!(ctx.turns.is_empty());
    }

    #[tokio::test]
    async fn padded_ping_still_takes_the_fast_path() {
        let mut f = fixture();
        f.router
            .on_message(InboundMessage::text("628123", "  ping  "))
            .await;
        assert!(f.outbound.recv().await.unwrap().text.starts_with("Pong!"));
        assert_eq!(f.backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn group_messages_are_dropped() {
        let mut f = fixture();
        let mut event = InboundMessage::text("628123", "halo semua");
        event.is_group = true;
        f.router.on_message(event).await;

        assert_eq!(f.backend.calls.load(Ordering::SeqCst), 0);
        assert!(f.outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn textless_events_are_dropped() {
        let mut f = fixture();
        let event = InboundMessage {
            sender: "628123".into(),
            is_group: false,
            conversation: None,
            extended_text: None,
        };
        f.router.on_message(event).await;

        assert_eq!(f.backend.calls.load(Ordering::SeqCst), 0);
        assert!(f.outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn extended_text_is_used_when_plain_form_is_absent() {
        let mut f = fixture();
        let event = InboundMessage {
            sender: "628123@s.whatsapp.net".into(),
            is_group: false,
            conversation: None,
            extended_text: Some("siapa saya?".into()),
        };
        f.router.on_message(event).await;

        assert_eq!(f.backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.outbound.recv().await.unwrap().text, "halo");
    }

    #[tokio::test]
    async fn ordinary_messages_run_the_full_pipeline() {
        let mut f = fixture();
        f.router
            .on_message(InboundMessage::text("628999", "apa kabar?"))
            .await;

        assert_eq!(f.backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.outbound.recv().await.unwrap().text, "halo");
        let ctx = f.memory.get(&SenderId::normalize("628999")).await;
        assert_eq!(ctx.turns.len(), 2);
    }
}
