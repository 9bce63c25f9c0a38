//! Conversation log: the ordered turn sequence sent to the completion endpoint.
//!
//! Slot 0, when present, is always the system turn holding the most recently
//! compiled prompt. It is overwritten in place on every render cycle, never
//! appended. Every other turn is append-only.

use serde::{Deserialize, Serialize};

/// Conversation participant role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instruction turn conditioning the model.
    System,
    /// Human user message.
    User,
    /// Assistant (LLM) message.
    Assistant,
}

impl Role {
    /// Wire name of the role (`system`, `user`, `assistant`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in the dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Speaker role.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl Turn {
    /// Create a system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered, append-only turn sequence for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    /// Create an empty log. The first render inserts the system turn.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log seeded with a single system turn.
    pub fn with_system(prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::system(prompt)],
        }
    }

    /// Discard every turn.
    pub fn reset(&mut self) {
        self.turns.clear();
    }

    /// Insert the system turn when the log is empty.
    ///
    /// Returns `true` when a turn was inserted.
    pub fn ensure_system_turn(&mut self, prompt: &str) -> bool {
        if self.turns.is_empty() {
            self.turns.push(Turn::system(prompt));
            return true;
        }
        false
    }

    /// Overwrite the content of slot 0 if it is a system turn.
    pub fn refresh_system_turn(&mut self, prompt: &str) {
        if let Some(first) = self.turns.first_mut() {
            if first.role == Role::System && first.content != prompt {
                first.content = prompt.to_owned();
            }
        }
    }

    /// Append a turn at the end.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Every turn except the leading system turn, in dialogue order.
    pub fn history(&self) -> impl Iterator<Item = &Turn> + Clone + '_ {
        let skip = usize::from(self.system_turn().is_some());
        self.turns.iter().skip(skip)
    }

    /// The leading system turn, if present.
    pub fn system_turn(&self) -> Option<&Turn> {
        self.turns.first().filter(|t| t.role == Role::System)
    }

    /// Full turn sequence in the order sent to the endpoint.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Full turn sequence followed by a pending turn that is not yet appended.
    pub fn with_pending(&self, pending: &Turn) -> Vec<Turn> {
        let mut out = Vec::with_capacity(self.turns.len().saturating_add(1));
        out.extend_from_slice(&self.turns);
        out.push(pending.clone());
        out
    }

    /// Number of turns, system turn included.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the log holds no turns at all.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
