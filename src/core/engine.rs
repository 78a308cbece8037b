//! Per-message pipeline
//!
//! Read context, consult the language backend, decode its answer into a
//! command, dispatch, then write the exchange back to session memory. Every
//! failure along the way still terminates in a reply: a backend failure
//! becomes the fixed apology, a parse failure falls back to the raw
//! completion text, and memory failures are logged without blocking the
//! reply. The stored model turn is the text the user actually saw, fallback
//! replies included, so later turns stay coherent.

use std::sync::Arc;

use crate::command;
use crate::conversation::SenderId;
use crate::dispatch::{Dispatcher, APOLOGY_REPLY};
use crate::providers::CompletionBackend;

use super::memory::SessionMemory;

pub struct Engine {
    backend: Arc<dyn CompletionBackend>,
    dispatcher: Dispatcher,
    memory: Arc<SessionMemory>,
}

impl Engine {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        dispatcher: Dispatcher,
        memory: Arc<SessionMemory>,
    ) -> Self {
        Self {
            backend,
            dispatcher,
            memory,
        }
    }

    /// Run one message through the full pipeline and return the reply text.
    pub async fn handle(&self, sender: &SenderId, message: &str) -> String {
        let mut context = self.memory.get(sender).await;

        let answer = match self.backend.complete(&context.turns, message).await {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(%sender, error = %err, "language backend failed");
                APOLOGY_REPLY.to_string()
            }
        };

        let reply = match command::parse(&answer) {
            Ok(cmd) => self.dispatcher.dispatch(sender, cmd).await,
            Err(err) => {
                // Unparsable output is often still a usable free-text
                // answer, so it goes out verbatim.
                tracing::warn!(%sender, error = %err, "unparsable completion, replying with raw text");
                answer
            }
        };

        context.push_exchange(message, &reply);
        if let Err(err) = self.memory.put(context).await {
            tracing::error!(%sender, error = %err, "failed to store chat context");
        }

        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Role, Turn};
    use crate::dispatch::{HandlerError, IssueTracker, ResidentData, ISSUE_ACK_REPLY};
    use crate::providers::ProviderError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct ScriptedBackend {
        answers: Vec<Result<String, ()>>,
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn answering(text: &str) -> Self {
            Self {
                answers: vec![Ok(text.to_string())],
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                answers: vec![Err(())],
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(
            &self,
            _prior: &[Turn],
            _message: &str,
        ) -> Result<String, ProviderError> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.answers.get(i.min(self.answers.len() - 1)) {
                Some(Ok(text)) => Ok(text.clone()),
                _ => Err(ProviderError::EmptyResponse),
            }
        }
    }

    struct NoResidents;

    #[async_trait]
    impl ResidentData for NoResidents {
        async fn personal_data(&self, sender: &SenderId) -> Result<String, HandlerError> {
            Err(HandlerError::UnknownResident(sender.clone()))
        }
        async fn household_data(&self, sender: &SenderId) -> Result<String, HandlerError> {
            Err(HandlerError::UnknownResident(sender.clone()))
        }
        async fn household_members(&self, sender: &SenderId) -> Result<String, HandlerError> {
            Err(HandlerError::UnknownResident(sender.clone()))
        }
    }

    struct AcceptingIssues;

    #[async_trait]
    impl IssueTracker for AcceptingIssues {
        async fn file_report(
            &self,
            _sender: &SenderId,
            _title: &str,
            _description: &str,
        ) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    fn engine_with(backend: ScriptedBackend) -> (Engine, Arc<SessionMemory>) {
        let memory = Arc::new(SessionMemory::new(100, Duration::from_secs(1800), 4096));
        let dispatcher = Dispatcher::new(Arc::new(NoResidents), Arc::new(AcceptingIssues));
        (
            Engine::new(Arc::new(backend), dispatcher, memory.clone()),
            memory,
        )
    }

    #[tokio::test]
    async fn chat_command_replies_with_value_and_stores_exchange() {
        let (engine, memory) = engine_with(ScriptedBackend::answering(
            r#"{ "type": "chat", "value": "Baik, ada yang bisa saya bantu?" }"#,
        ));
        let sender = SenderId::normalize("628100");

        let reply = engine.handle(&sender, "halo pak RT").await;
        assert_eq!(reply, "Baik, ada yang bisa saya bantu?");

        let ctx = memory.get(&sender).await;
        assert_eq!(ctx.turns.len(), 2);
        assert_eq!(ctx.turns[0].role, Role::User);
        assert_eq!(ctx.turns[0].text, "halo pak RT");
        assert_eq!(ctx.turns[1].role, Role::Model);
        assert_eq!(ctx.turns[1].text, "Baik, ada yang bisa saya bantu?");
    }

    #[tokio::test]
    async fn unparsable_answer_goes_out_verbatim_and_is_stored() {
        let (engine, memory) = engine_with(ScriptedBackend::answering("I'm not sure"));
        let sender = SenderId::normalize("628200");

        let reply = engine.handle(&sender, "hmm?").await;
        assert_eq!(reply, "I'm not sure");

        let ctx = memory.get(&sender).await;
        assert_eq!(ctx.turns[1].text, "I'm not sure");
    }

    #[tokio::test]
    async fn backend_failure_yields_apology_and_still_writes_memory() {
        let (engine, memory) = engine_with(ScriptedBackend::failing());
        let sender = SenderId::normalize("628300");

        let reply = engine.handle(&sender, "ada apa?").await;
        assert_eq!(reply, APOLOGY_REPLY);

        let ctx = memory.get(&sender).await;
        assert_eq!(ctx.turns.len(), 2);
        assert_eq!(ctx.turns[1].text, APOLOGY_REPLY);
    }

    #[tokio::test]
    async fn issue_report_with_empty_value_uses_default_ack() {
        let (engine, _) = engine_with(ScriptedBackend::answering(
            r#"{ "type": "issue_report", "value": "", "meta": { "title": "Lampu", "description": "mati" } }"#,
        ));
        let sender = SenderId::normalize("628400");
        assert_eq!(engine.handle(&sender, "lapor: lampu mati").await, ISSUE_ACK_REPLY);
    }

    #[tokio::test]
    async fn replay_does_not_corrupt_the_store() {
        let (engine, memory) = engine_with(ScriptedBackend::answering(
            r#"{ "type": "chat", "value": "siap" }"#,
        ));
        let sender = SenderId::normalize("628500");

        engine.handle(&sender, "halo").await;
        engine.handle(&sender, "halo").await;

        let ctx = memory.get(&sender).await;
        assert_eq!(ctx.turns.len(), 4);
        assert!(ctx
            .turns
            .iter()
            .step_by(2)
            .all(|t| t.role == Role::User && t.text == "halo"));
    }
}
