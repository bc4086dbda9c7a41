//! Turn and Dialogue domain types.
//!
//! A turn is one utterance in the chat log. The dialogue is the append-only
//! log itself; it owns id assignment so ids stay strictly increasing and are
//! never reused.

use serde::{Deserialize, Serialize};

use crate::session::Session;

/// The conversational role of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions and out-of-band context
    System,
    /// The human side of the conversation
    User,
    /// The model side of the conversation
    Assistant,
}

impl Role {
    /// Wire name used by every backend dialect.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Monotonic id, assigned by [`Dialogue`]. Zero means "not yet appended".
    #[serde(default)]
    pub id: u64,

    /// Who said it
    pub role: Role,

    /// Raw text
    pub content: String,

    /// Pre-formatted variant used in place of `content` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_content: Option<String>,

    /// True once the text is final
    #[serde(default)]
    pub done: bool,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: 0,
            role,
            content: content.into(),
            rendered_content: None,
            done: true,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// An empty assistant turn that will be filled by a stream.
    pub fn pending_assistant() -> Self {
        Self {
            done: false,
            ..Self::assistant("")
        }
    }

    pub fn with_rendered(mut self, rendered: impl Into<String>) -> Self {
        self.rendered_content = Some(rendered.into());
        self
    }

    /// The text sent to a backend: `rendered_content` if set, else `content`.
    pub fn text(&self) -> &str {
        self.rendered_content.as_deref().unwrap_or(&self.content)
    }

    /// Append a streamed delta.
    pub fn push_delta(&mut self, delta: &str) {
        self.content.push_str(delta);
    }

    pub fn finish(&mut self) {
        self.done = true;
    }
}

/// The ordered, append-only chat log.
///
/// Loading goes through [`Dialogue::from_turns`], so a persisted log with
/// duplicate or decreasing ids is repaired on the way in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "DialogueRecord")]
pub struct Dialogue {
    turns: Vec<Turn>,
    next_id: u64,
}

/// The persisted shape of a [`Dialogue`].
#[derive(Deserialize)]
struct DialogueRecord {
    turns: Vec<Turn>,
    #[serde(default)]
    next_id: u64,
}

impl From<DialogueRecord> for Dialogue {
    fn from(record: DialogueRecord) -> Self {
        let mut dialogue = Self::from_turns(record.turns);
        dialogue.next_id = dialogue.next_id.max(record.next_id);
        dialogue
    }
}

impl Dialogue {
    pub fn new() -> Self {
        Self {
            turns: Vec::new(),
            next_id: 1,
        }
    }

    /// Rebuild a dialogue from persisted turns, keeping their ids.
    ///
    /// Turns whose id does not exceed the previous one are renumbered so the
    /// strictly-increasing invariant holds.
    pub fn from_turns(turns: impl IntoIterator<Item = Turn>) -> Self {
        let mut dialogue = Self::new();
        for mut turn in turns {
            if turn.id < dialogue.next_id {
                turn.id = dialogue.next_id;
            }
            dialogue.next_id = turn.id + 1;
            dialogue.turns.push(turn);
        }
        dialogue
    }

    /// Append a turn, assigning it the next id. Returns the id.
    pub fn append(&mut self, mut turn: Turn) -> u64 {
        let floor = self.turns.last().map_or(1, |t| t.id + 1);
        let id = self.next_id.max(floor);
        turn.id = id;
        self.next_id = id + 1;
        self.turns.push(turn);
        id
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) -> u64 {
        self.append(Turn::new(role, content))
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

    pub fn last_mut(&mut self) -> Option<&mut Turn> {
        self.turns.last_mut()
    }

    /// Turns not yet evicted into memory.
    pub fn active_window(&self, session: &Session) -> &[Turn] {
        let start = session.start_index.min(self.turns.len());
        &self.turns[start..]
    }
}
