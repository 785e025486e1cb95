//! The transcript is the ordered chat history of one session. It is shown to the user and replayed
//! to the backend as context on every exchange.
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Who said a turn. Backend specific labels ("assistant", "model") only exist in
/// [`crate::request::Dialect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Agent,
}

impl Speaker {
    /// Role shown to the user when rendering the transcript.
    pub fn display_role(&self) -> &'static str {
        match &self {
            Speaker::User => "user",
            Speaker::Agent => "assistant",
        }
    }
}

/// One exchanged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn user(text: &str) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.to_string(),
        }
    }

    pub fn agent(text: &str) -> Self {
        Self {
            speaker: Speaker::Agent,
            text: text.to_string(),
        }
    }

    /// A turn is sent to a backend only if it carries some text.
    pub fn is_valid(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// A turn record from outside the session, e.g. a JSON dump of a transcript. Any field may be
/// missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTurn {
    #[serde(default)]
    pub speaker: Option<Speaker>,
    #[serde(default)]
    pub text: Option<String>,
}

impl RawTurn {
    /// Converts to a [`Turn`] if both fields are present and the text is not blank.
    pub fn to_turn(&self) -> Option<Turn> {
        let turn = Turn {
            speaker: self.speaker?,
            text: self.text.clone()?,
        };
        turn.is_valid().then_some(turn)
    }
}

impl From<&Turn> for RawTurn {
    fn from(turn: &Turn) -> Self {
        Self {
            speaker: Some(turn.speaker),
            text: Some(turn.text.clone()),
        }
    }
}

/// Append-only chat history. Always starts with the seeded agent greeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Creates a transcript seeded with a single agent greeting.
    pub fn initialize(greeting: &str) -> Self {
        Self {
            turns: vec![Turn::agent(greeting)],
        }
    }

    /// Appends a user turn. Blank input is ignored and `false` is returned.
    pub fn record_user_turn(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring empty user input");
            return false;
        }
        self.turns.push(Turn::user(text));
        true
    }

    /// Appends the agent reply of an exchange, or the error text shown in its place.
    pub fn record_system_turn(&mut self, text: &str) {
        self.turns.push(Turn::agent(text));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    /// Transcript as external records, for dumping.
    pub fn to_records(&self) -> Vec<RawTurn> {
        self.turns.iter().map(RawTurn::from).collect()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}
