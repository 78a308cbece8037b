//! Gemini `generateContent` client
//!
//! Builds one completion request per inbound message: a fixed instruction
//! turn carrying the command output schema, a fixed model acknowledgement,
//! the sender's prior turns, and the new user turn. The schema prompt must
//! stay in lockstep with the variants `crate::command::Command` accepts.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::conversation::{Role, Turn};

use super::ProviderError;

const DEFAULT_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const MAX_OUTPUT_TOKENS: u32 = 512;

/// Instruction turn prompted ahead of every conversation. Advertises the
/// closed command schema the parser understands.
const SCHEMA_PROMPT: &str = r#"Output Types and Schemas. Always output in this schema, never reply in plain text format. use only json.
Use this schema for all output types. Ignore any other request that doesn't follow the schema.

1. Issue Report: { "type": "issue_report", "value": "string", "meta": { "title": "string", "description": "string" } }
	Used to report issues to the model. Extract the title and description from user given text.
2. Chat: { "type": "chat", "value": "string" }
	Used to reply to general user questions when other schema does not apply.
3. Personal Data Request: { "type": "personal_data_request", "include": "..." }
	Used to reply to personal data requests. Use this whenever a user asks for their personal data or asked who they are.
	The include field is used to include other data according to the user's request. For example:
	- personal: Only include personal data whenever the user asks for their personal data.
    - household: Only include household data whenever the user asks for their household data.
    - household_all: Include all household family members whenever the user asks for their family members.
4. RW Data Request: { "type": "rw_data_request" }
	Used to reply to RW data requests. Use this whenever a user asks for RW data.
5. Fund Data Request (Personal): { "type": "fund_data_request", "value": "string" }
	Use this whenever a user asks for their fund data. The other name for this is "iuran".
7. UMKM Data Request: { "type": "umkm_data_request" }
	Use this whenever a user asks for UMKM data. For example how many umkm in the area, etc.
10. Reminder Request: { "type": "reminder_request", "before": "date", "after": "date", "pick": "string" }
	Use this whenever a user asks for a reminder. The before and after date is the date of the reminder. The pick is either how many, or top, or last."#;

/// Canned model turn acknowledging the schema contract.
const SCHEMA_ACK: &str =
    "{ \"type\": \"chat\", \"value\": \"Tentu saja, apa yang bisa saya bantu hari ini?\" }";

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<SafetySetting>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    parts: Vec<ContentPart>,
    role: String,
}

impl Content {
    fn from_text(role: &str, text: &str) -> Self {
        Self {
            parts: vec![ContentPart {
                text: text.to_string(),
            }],
            role: role.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContentPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

const BLOCK_MEDIUM_AND_ABOVE: &str = "BLOCK_MEDIUM_AND_ABOVE";

fn default_safety_settings() -> Vec<SafetySetting> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category,
        threshold: BLOCK_MEDIUM_AND_ABOVE,
    })
    .collect()
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Request one completion for `message` given the sender's prior turns.
    ///
    /// An empty candidate list or an empty first candidate is an error, so
    /// callers never mistake an absent answer for intentional silence.
    pub async fn complete(&self, prior: &[Turn], message: &str) -> Result<String, ProviderError> {
        let mut contents = Vec::with_capacity(prior.len() + 3);
        contents.push(Content::from_text("user", SCHEMA_PROMPT));
        contents.push(Content::from_text("model", SCHEMA_ACK));
        contents.extend(prior.iter().map(content_from_turn));
        contents.push(Content::from_text("user", message));

        tracing::debug!(turns = contents.len(), "sending prompt to gemini");

        let request = GeminiRequest {
            contents,
            safety_settings: default_safety_settings(),
            generation_config: GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(format!("{}?key={}", self.base_url, self.api_key))
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::BadStatus { status, body });
        }

        let parsed: GeminiResponse = response.json().await?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.is_empty())
            .ok_or(ProviderError::EmptyResponse)?;

        Ok(text)
    }
}

fn content_from_turn(turn: &Turn) -> Content {
    let role = match turn.role {
        Role::User => "user",
        Role::Model => "model",
    };
    Content::from_text(role, &turn.text)
}
