//! Translates a transcript plus a pending prompt into the message list a backend expects.
use serde::Serialize;

use crate::transcript::{RawTurn, Speaker, Turn};

/// Role vocabulary of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub user_role: &'static str,
    pub agent_role: &'static str,
    /// Role of the slot reserved for system level instructions. Backends without one get the
    /// persona as a leading user turn.
    pub system_role: Option<&'static str>,
}

impl Dialect {
    pub fn role_of(&self, speaker: Speaker) -> &'static str {
        match speaker {
            Speaker::User => self.user_role,
            Speaker::Agent => self.agent_role,
        }
    }

    pub fn persona_role(&self) -> &'static str {
        self.system_role.unwrap_or(self.user_role)
    }
}

/// A message in backend vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestMessage {
    pub role: &'static str,
    pub text: String,
}

impl RequestMessage {
    fn new(role: &'static str, text: &str) -> Self {
        Self {
            role,
            text: text.to_string(),
        }
    }
}

/// Ordered messages for one backend call. The persona is always first and the pending prompt
/// always last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendRequest {
    pub messages: Vec<RequestMessage>,
}

impl BackendRequest {
    /// The leading message, when it sits in the dialect's system slot.
    pub fn system_message(&self, dialect: &Dialect) -> Option<&RequestMessage> {
        let system_role = dialect.system_role?;
        self.messages.first().filter(|m| m.role == system_role)
    }
}

/// Builds the outgoing request for `new_prompt`.
///
/// Turns with blank text are skipped. `new_prompt` must not already be part of `turns`.
pub fn build_backend_request(
    turns: &[Turn],
    new_prompt: &str,
    persona: &str,
    dialect: &Dialect,
) -> BackendRequest {
    let history = turns
        .iter()
        .filter(|t| t.is_valid())
        .map(|t| RequestMessage::new(dialect.role_of(t.speaker), &t.text));

    assemble(history, new_prompt, persona, dialect)
}

/// Same as [`build_backend_request`] for records from outside the session. Records without a
/// speaker or text are skipped.
pub fn build_backend_request_from_records(
    records: &[RawTurn],
    new_prompt: &str,
    persona: &str,
    dialect: &Dialect,
) -> BackendRequest {
    let history = records
        .iter()
        .filter_map(RawTurn::to_turn)
        .map(|t| RequestMessage::new(dialect.role_of(t.speaker), &t.text));

    assemble(history, new_prompt, persona, dialect)
}

fn assemble(
    history: impl Iterator<Item = RequestMessage>,
    new_prompt: &str,
    persona: &str,
    dialect: &Dialect,
) -> BackendRequest {
    let mut messages = vec![RequestMessage::new(dialect.persona_role(), persona)];
    messages.extend(history);
    messages.push(RequestMessage::new(dialect.user_role, new_prompt));
    BackendRequest { messages }
}
