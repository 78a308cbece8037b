//! Command dispatch
//!
//! Maps a parsed [`Command`] to its domain handler and normalizes every
//! outcome into a single user-facing reply string. Handler failures are
//! logged and answered with the fixed apology; they never propagate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::command::Command;
use crate::conversation::SenderId;

/// Bound on one domain-handler call. A handler that exceeds it is treated
/// as failed and the reply falls through to the apology.
const HANDLER_TIMEOUT: Duration = Duration::from_secs(60);

/// Reply used whenever the pipeline cannot produce a real answer.
pub const APOLOGY_REPLY: &str = "Maaf, saya tidak bisa membantu Anda saat ini.";

/// Acknowledgement used when an issue report succeeds but the backend gave
/// no reply text of its own.
pub const ISSUE_ACK_REPLY: &str =
    "Terima kasih atas laporan Anda. Kami akan segera menindaklanjuti.";

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("no resident registered for {0}")]
    UnknownResident(SenderId),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Resident-record lookups, keyed by the sender's normalized number.
#[async_trait]
pub trait ResidentData: Send + Sync {
    async fn personal_data(&self, sender: &SenderId) -> Result<String, HandlerError>;
    async fn household_data(&self, sender: &SenderId) -> Result<String, HandlerError>;
    async fn household_members(&self, sender: &SenderId) -> Result<String, HandlerError>;
}

/// Issue-tracking collaborator.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn file_report(
        &self,
        sender: &SenderId,
        title: &str,
        description: &str,
    ) -> Result<(), HandlerError>;
}

pub struct Dispatcher {
    residents: Arc<dyn ResidentData>,
    issues: Arc<dyn IssueTracker>,
}

impl Dispatcher {
    pub fn new(residents: Arc<dyn ResidentData>, issues: Arc<dyn IssueTracker>) -> Self {
        Self { residents, issues }
    }

    /// Route a command to its handler and return the reply text. Always
    /// answers; failures collapse to [`APOLOGY_REPLY`].
    pub async fn dispatch(&self, sender: &SenderId, command: Command) -> String {
        match command {
            Command::Chat { value } => value,

            Command::PersonalDataRequest { include } => {
                tracing::debug!(%sender, %include, "handling personal data request");
                let lookup = match include.as_str() {
                    "personal" => self.residents.personal_data(sender),
                    "household" => self.residents.household_data(sender),
                    "household_all" => self.residents.household_members(sender),
                    other => {
                        tracing::warn!(%sender, include = other, "invalid include selector");
                        return APOLOGY_REPLY.to_string();
                    }
                };
                match tokio::time::timeout(HANDLER_TIMEOUT, lookup).await {
                    Ok(Ok(reply)) => reply,
                    Ok(Err(err)) => {
                        tracing::error!(%sender, error = %err, "personal data request failed");
                        APOLOGY_REPLY.to_string()
                    }
                    Err(_) => {
                        tracing::error!(%sender, %include, "personal data request timed out");
                        APOLOGY_REPLY.to_string()
                    }
                }
            }

            Command::IssueReport { value, meta } => {
                tracing::debug!(%sender, title = %meta.title, "handling issue report");
                let filing = self
                    .issues
                    .file_report(sender, &meta.title, &meta.description);
                match tokio::time::timeout(HANDLER_TIMEOUT, filing).await {
                    Ok(Ok(())) if value.is_empty() => ISSUE_ACK_REPLY.to_string(),
                    Ok(Ok(())) => value,
                    Ok(Err(err)) => {
                        tracing::error!(%sender, error = %err, "issue report failed");
                        APOLOGY_REPLY.to_string()
                    }
                    Err(_) => {
                        tracing::error!(%sender, title = %meta.title, "issue report timed out");
                        APOLOGY_REPLY.to_string()
                    }
                }
            }

            // Advertised in the schema prompt but not implemented yet.
            other => {
                tracing::warn!(%sender, command = ?other, "unhandled command tag");
                APOLOGY_REPLY.to_string()
            }
        }
    }
}
