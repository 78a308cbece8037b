//! Conversation types: turns, per-sender chat context, sender identity

use serde::{Deserialize, Serialize};

/// Newest turns kept per sender when writing context back to the store.
pub const MAX_TURNS: usize = 20;

/// Role of a conversation turn, matching the language backend's wire roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One exchange unit: a role-tagged piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Normalized identity of a conversation participant.
///
/// Transport addresses carry a server suffix and, for companion devices, a
/// device qualifier (`628123:17@s.whatsapp.net`). Both are stripped so every
/// device of the same person collapses to one identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SenderId(String);

impl SenderId {
    pub fn normalize(raw: &str) -> Self {
        let user = raw.split('@').next().unwrap_or(raw);
        let user = user.split(':').next().unwrap_or(user);
        Self(user.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SenderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered turn history for one sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatContext {
    pub sender: SenderId,
    pub turns: Vec<Turn>,
}

impl ChatContext {
    pub fn empty(sender: SenderId) -> Self {
        Self {
            sender,
            turns: Vec::new(),
        }
    }

    /// Append a user/model turn pair, then drop the oldest turns beyond
    /// [`MAX_TURNS`] so stored contexts stay within the per-entry bound.
    pub fn push_exchange(&mut self, user_text: &str, model_text: &str) {
        self.turns.push(Turn::user(user_text));
        self.turns.push(Turn::model(model_text));
        if self.turns.len() > MAX_TURNS {
            let excess = self.turns.len() - MAX_TURNS;
            self.turns.drain(..excess);
        }
    }
}
