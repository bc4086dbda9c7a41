//! Prompt templates.
//!
//! A template is the fixed skeleton of every request: instructions, persona
//! blocks, one chat-history slot and one memory slot. Slots are typed
//! variants, so literal text that happens to look like a marker is never
//! mistaken for one.

use serde::{Deserialize, Serialize};

use crate::scene::Role;

/// Upper bound of a chat-history slot range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeEnd {
    /// Through the last turn of the active window (`"end"` on the wire).
    End(EndMarker),
    /// Exclusive offset from the window's start.
    Index(i64),
}

/// The literal `"end"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndMarker {
    End,
}

impl RangeEnd {
    pub const END: RangeEnd = RangeEnd::End(EndMarker::End);
}

impl Default for RangeEnd {
    fn default() -> Self {
        Self::END
    }
}

/// One entry of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateEntry {
    /// Fixed text sent with the given role.
    Text { role: Role, content: String },

    /// Marks where the story begins. Emits nothing.
    StartOfStory,

    /// The sliding window of live turns.
    ///
    /// `range_start` is an offset into the active window; `-1` selects the
    /// most recent turn only.
    ChatHistory {
        #[serde(default)]
        range_start: i64,
        #[serde(default)]
        range_end: RangeEnd,
    },

    /// Long-term memory, introduced by `label`. Emits nothing when memory is empty.
    Memory { label: String },

    /// Resolved to the persona's character description.
    CharacterSetting {
        #[serde(default)]
        content: String,
    },

    /// Resolved to the persona's user description.
    UserSetting {
        #[serde(default)]
        content: String,
    },

    /// Closing text of a persona block.
    EndTag { content: String },
}

impl TemplateEntry {
    pub fn system(content: impl Into<String>) -> Self {
        Self::Text {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn history() -> Self {
        Self::ChatHistory {
            range_start: 0,
            range_end: RangeEnd::END,
        }
    }

    /// The role a content-bearing entry is sent with.
    ///
    /// Persona and closing markers fold to system; the user setting folds to user.
    pub fn wire_role(&self) -> Role {
        match self {
            Self::Text { role, .. } => *role,
            Self::UserSetting { .. } => Role::User,
            _ => Role::System,
        }
    }
}

/// Who is talking: names plus the descriptions that fill persona slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub character_name: String,
    #[serde(default)]
    pub character_setting: String,
    #[serde(default)]
    pub user_setting: String,
}
