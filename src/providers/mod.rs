//! Language backend integrations

mod gemini;

use async_trait::async_trait;
use thiserror::Error;

use crate::conversation::Turn;

pub use gemini::GeminiClient;

/// The completion capability the pipeline consumes. Tests substitute fakes;
/// production wires [`GeminiClient`].
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prior: &[Turn], message: &str) -> Result<String, ProviderError>;
}

#[async_trait]
impl CompletionBackend for GeminiClient {
    async fn complete(&self, prior: &[Turn], message: &str) -> Result<String, ProviderError> {
        GeminiClient::complete(self, prior, message).await
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    BadStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("backend returned no answer")]
    EmptyResponse,
}
