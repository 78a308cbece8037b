//! Structured-command decoding
//!
//! The language backend is prompted to answer with a single JSON object
//! whose `type` field selects one of a closed set of commands. Decoding is
//! shape-only: required fields must be present with the right types, and a
//! tag outside the closed set fails the parse. Semantic checks (for example
//! whether an `include` selector is one the resident handler knows) belong
//! to the dispatcher.

use serde::Deserialize;

/// Nested metadata of an issue report, as prompted into the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueMeta {
    pub title: String,
    pub description: String,
}

/// Closed set of commands the backend may answer with.
///
/// The tags here must stay in lockstep with the schema prompt in
/// `crate::providers`. The variants past `IssueReport` are advertised to the
/// backend but have no handler yet; the dispatcher answers them with the
/// fixed apology.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Chat {
        value: String,
    },
    PersonalDataRequest {
        include: String,
    },
    IssueReport {
        value: String,
        meta: IssueMeta,
    },
    RwDataRequest,
    FundDataRequest {
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        fields: Option<Vec<String>>,
    },
    UmkmDataRequest,
    BroadcastRequest,
    RtDataRequest {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        fields: Option<Vec<String>>,
    },
    ReminderRequest {
        #[serde(default)]
        before: Option<String>,
        #[serde(default)]
        after: Option<String>,
        #[serde(default)]
        pick: Option<String>,
    },
}

/// Decode a raw completion into a command. Malformed JSON, an unknown tag,
/// or a missing required field all fail; the caller decides the fallback.
pub fn parse(raw: &str) -> Result<Command, serde_json::Error> {
    serde_json::from_str(raw)
}
