//! Template interpreter.
//!
//! Walks a profile's template in order and resolves each entry against the
//! active window, the persona and the memory text. Two render targets share
//! one walk: a flat prompt (every piece followed by a newline) and a
//! role-tagged message list.
//!
//! # Slot resolution
//!
//! | Entry | Emits |
//! |-------|-------|
//! | `StartOfStory` | nothing |
//! | `ChatHistory` | the selected turns, in order, as `rendered_content ?? content` |
//! | `Memory` | `label` + newline + memory text, or nothing if memory is empty |
//! | `CharacterSetting` / `UserSetting` | the persona text, else the slot's own content |
//! | `Text` / `EndTag` | the content, verbatim |
//!
//! When the template has no history slot the whole window is appended after
//! it, so history is never dropped silently.

use scenewright_config::Profile;
use scenewright_core::context::{RenderTarget, RenderedContext, RenderedMessage};
use scenewright_core::scene::{Role, Turn};
use scenewright_core::template::{Persona, RangeEnd, TemplateEntry};
use serde::{Deserialize, Serialize};
use tracing::warn;

// ── Types ─────────────────────────────────────────────────────────────────

/// What a render is for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Continue the conversation through the template.
    #[default]
    Continue,
    /// Condense turns into memory: the summarize prompt, then every input
    /// turn verbatim. The template is bypassed.
    Summary,
}

/// Renders one template for one persona into one target shape.
#[derive(Debug, Clone, Copy)]
pub struct TemplateRenderer<'a> {
    template: &'a [TemplateEntry],
    persona: &'a Persona,
    summarize_prompt: &'a str,
    target: RenderTarget,
}

impl<'a> TemplateRenderer<'a> {
    pub fn new(template: &'a [TemplateEntry], persona: &'a Persona, target: RenderTarget) -> Self {
        Self {
            template,
            persona,
            summarize_prompt: "",
            target,
        }
    }

    /// A renderer over a profile's template and summarize prompt.
    pub fn for_profile(profile: &'a Profile, persona: &'a Persona, target: RenderTarget) -> Self {
        Self::new(&profile.template, persona, target).with_summarize_prompt(&profile.summarize_prompt)
    }

    pub fn with_summarize_prompt(mut self, prompt: &'a str) -> Self {
        self.summarize_prompt = prompt;
        self
    }

    /// Render against `window`.
    ///
    /// In `Continue` mode `window` is the active window; in `Summary` mode it
    /// is the set of turns to condense.
    pub fn render(&self, window: &[Turn], memory_text: &str, mode: RenderMode) -> RenderedContext {
        let mut out = Output::new(self.target);
        match mode {
            RenderMode::Summary => {
                out.push(Role::System, self.summarize_prompt);
                for turn in window {
                    out.push(turn.role, &turn.content);
                }
            }
            RenderMode::Continue => self.render_template(&mut out, window, memory_text),
        }
        out.finish()
    }

    fn render_template(&self, out: &mut Output, window: &[Turn], memory_text: &str) {
        let mut history_sent = false;

        for entry in self.template {
            match entry {
                TemplateEntry::StartOfStory => {}
                TemplateEntry::ChatHistory {
                    range_start,
                    range_end,
                } => {
                    if history_sent {
                        warn!("Skipping extra chat-history slot; only the first is rendered");
                        continue;
                    }
                    let (start, end) = resolve_range(*range_start, *range_end, window.len());
                    for turn in &window[start..end] {
                        out.push(turn.role, turn.text());
                    }
                    history_sent = true;
                }
                TemplateEntry::Memory { label } => {
                    if !memory_text.is_empty() {
                        out.push(Role::System, &format!("{label}\n{memory_text}"));
                    }
                }
                TemplateEntry::CharacterSetting { content } => {
                    out.push(entry.wire_role(), or_slot(&self.persona.character_setting, content));
                }
                TemplateEntry::UserSetting { content } => {
                    out.push(entry.wire_role(), or_slot(&self.persona.user_setting, content));
                }
                TemplateEntry::Text { content, .. } | TemplateEntry::EndTag { content } => {
                    out.push(entry.wire_role(), content);
                }
            }
        }

        if !history_sent {
            for turn in window {
                out.push(turn.role, turn.text());
            }
        }
    }
}

fn or_slot<'s>(persona_text: &'s str, slot_content: &'s str) -> &'s str {
    if persona_text.is_empty() {
        slot_content
    } else {
        persona_text
    }
}

/// Resolve a history slot's bounds against a window of `len` turns.
///
/// Negative values count back from the end (`-1` is the last turn);
/// non-negative values are offsets from the window start. Both bounds are
/// clamped to the window, and an inverted range is empty.
pub fn resolve_range(range_start: i64, range_end: RangeEnd, len: usize) -> (usize, usize) {
    let clamp = |index: i64| -> usize {
        if index < 0 {
            len.saturating_sub(usize::try_from(index.unsigned_abs()).unwrap_or(usize::MAX))
        } else {
            usize::try_from(index).map_or(len, |i| i.min(len))
        }
    };

    let start = clamp(range_start);
    let end = match range_end {
        RangeEnd::End(_) => len,
        RangeEnd::Index(index) => clamp(index),
    };
    (start, end.max(start))
}

// ── Output ────────────────────────────────────────────────────────────────

enum Output {
    Prompt(String),
    Messages(Vec<RenderedMessage>),
}

impl Output {
    fn new(target: RenderTarget) -> Self {
        match target {
            RenderTarget::Prompt => Self::Prompt(String::new()),
            RenderTarget::Messages => Self::Messages(Vec::new()),
        }
    }

    /// Empty pieces emit nothing.
    fn push(&mut self, role: Role, text: &str) {
        if text.is_empty() {
            return;
        }
        match self {
            Self::Prompt(prompt) => {
                prompt.push_str(text);
                prompt.push('\n');
            }
            Self::Messages(messages) => messages.push(RenderedMessage::new(role, text)),
        }
    }

    fn finish(self) -> RenderedContext {
        match self {
            Self::Prompt(prompt) => RenderedContext::Prompt(prompt),
            Self::Messages(messages) => RenderedContext::Messages(messages),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(n: usize) -> Vec<Turn> {
        (0..n)
            .map(|i| {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                Turn::new(role, format!("turn {i}"))
            })
            .collect()
    }

    fn persona() -> Persona {
        Persona {
            user_name: "Alice".into(),
            character_name: "Narrator".into(),
            character_setting: "A dry, patient narrator.".into(),
            user_setting: String::new(),
        }
    }

    fn history(range_start: i64, range_end: RangeEnd) -> TemplateEntry {
        TemplateEntry::ChatHistory {
            range_start,
            range_end,
        }
    }

    #[test]
    fn full_range_yields_every_turn() {
        assert_eq!(resolve_range(0, RangeEnd::END, 5), (0, 5));
    }

    #[test]
    fn minus_one_yields_last_turn_only() {
        assert_eq!(resolve_range(-1, RangeEnd::END, 5), (4, 5));
    }

    #[test]
    fn ranges_clamp_and_never_invert() {
        assert_eq!(resolve_range(2, RangeEnd::Index(99), 5), (2, 5));
        assert_eq!(resolve_range(4, RangeEnd::Index(1), 5), (4, 4));
        assert_eq!(resolve_range(-10, RangeEnd::END, 3), (0, 3));
        assert_eq!(resolve_range(0, RangeEnd::END, 0), (0, 0));
        assert_eq!(resolve_range(0, RangeEnd::Index(-1), 5), (0, 4));
    }

    #[test]
    fn history_slot_renders_window_in_order() {
        let template = vec![TemplateEntry::system("Rules."), history(0, RangeEnd::END)];
        let persona = persona();
        let renderer = TemplateRenderer::new(&template, &persona, RenderTarget::Messages);
        let turns = window(5);

        let RenderedContext::Messages(messages) =
            renderer.render(&turns, "", RenderMode::Continue)
        else {
            panic!("expected messages");
        };
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[0], RenderedMessage::new(Role::System, "Rules."));
        assert_eq!(messages[1].content, "turn 0");
        assert_eq!(messages[5].content, "turn 4");
        assert_eq!(messages[2].role, Role::Assistant);
    }

    #[test]
    fn last_only_slot() {
        let template = vec![history(-1, RangeEnd::END)];
        let persona = persona();
        let renderer = TemplateRenderer::new(&template, &persona, RenderTarget::Prompt);
        let rendered = renderer.render(&window(5), "", RenderMode::Continue);
        assert_eq!(rendered, RenderedContext::Prompt("turn 4\n".into()));
    }

    #[test]
    fn empty_memory_and_history_reproduce_fixed_text() {
        let template = vec![
            TemplateEntry::system("You are a narrator."),
            TemplateEntry::Memory {
                label: "Earlier:".into(),
            },
            TemplateEntry::StartOfStory,
            TemplateEntry::EndTag {
                content: "### Response".into(),
            },
            history(0, RangeEnd::END),
        ];
        let persona = Persona::default();
        let renderer = TemplateRenderer::new(&template, &persona, RenderTarget::Prompt);
        let rendered = renderer.render(&[], "", RenderMode::Continue);
        assert_eq!(
            rendered,
            RenderedContext::Prompt("You are a narrator.\n### Response\n".into())
        );
    }

    #[test]
    fn memory_slot_carries_label() {
        let template = vec![TemplateEntry::Memory {
            label: "Earlier:".into(),
        }];
        let persona = persona();

        let prompt = TemplateRenderer::new(&template, &persona, RenderTarget::Prompt).render(
            &[],
            "They met at the inn.",
            RenderMode::Continue,
        );
        assert_eq!(
            prompt,
            RenderedContext::Prompt("Earlier:\nThey met at the inn.\n".into())
        );

        let messages = TemplateRenderer::new(&template, &persona, RenderTarget::Messages).render(
            &[],
            "They met at the inn.",
            RenderMode::Continue,
        );
        assert_eq!(
            messages,
            RenderedContext::Messages(vec![RenderedMessage::new(
                Role::System,
                "Earlier:\nThey met at the inn."
            )])
        );
    }

    #[test]
    fn persona_slots_resolve_and_fold_roles() {
        let template = vec![
            TemplateEntry::CharacterSetting {
                content: "fallback character".into(),
            },
            TemplateEntry::UserSetting {
                content: "A curious traveller.".into(),
            },
        ];
        let persona = persona();
        let renderer = TemplateRenderer::new(&template, &persona, RenderTarget::Messages);
        let rendered = renderer.render(&[], "", RenderMode::Continue);
        assert_eq!(
            rendered,
            RenderedContext::Messages(vec![
                RenderedMessage::new(Role::System, "A dry, patient narrator."),
                RenderedMessage::new(Role::User, "A curious traveller."),
            ])
        );
    }

    #[test]
    fn missing_history_slot_appends_window() {
        let template = vec![TemplateEntry::system("Rules.")];
        let persona = persona();
        let renderer = TemplateRenderer::new(&template, &persona, RenderTarget::Prompt);
        let rendered = renderer.render(&window(2), "", RenderMode::Continue);
        assert_eq!(
            rendered,
            RenderedContext::Prompt("Rules.\nturn 0\nturn 1\n".into())
        );
    }

    #[test]
    fn only_first_history_slot_is_rendered() {
        let template = vec![history(-1, RangeEnd::END), history(0, RangeEnd::END)];
        let persona = persona();
        let renderer = TemplateRenderer::new(&template, &persona, RenderTarget::Prompt);
        let rendered = renderer.render(&window(3), "", RenderMode::Continue);
        assert_eq!(rendered, RenderedContext::Prompt("turn 2\n".into()));
    }

    #[test]
    fn rendered_content_wins_in_history() {
        let template = vec![history(0, RangeEnd::END)];
        let persona = persona();
        let renderer = TemplateRenderer::new(&template, &persona, RenderTarget::Prompt);
        let turns = vec![Turn::user("raw").with_rendered("Alice: raw")];
        let rendered = renderer.render(&turns, "", RenderMode::Continue);
        assert_eq!(rendered, RenderedContext::Prompt("Alice: raw\n".into()));
    }

    #[test]
    fn marker_like_text_is_literal() {
        let template = vec![TemplateEntry::system("{{chat_history}} <memory>")];
        let persona = persona();
        let renderer = TemplateRenderer::new(&template, &persona, RenderTarget::Prompt);
        let rendered = renderer.render(&window(1), "", RenderMode::Continue);
        assert_eq!(
            rendered,
            RenderedContext::Prompt("{{chat_history}} <memory>\nturn 0\n".into())
        );
    }

    #[test]
    fn summary_mode_bypasses_template() {
        let template = vec![TemplateEntry::system("Rules."), history(-1, RangeEnd::END)];
        let persona = persona();
        let renderer = TemplateRenderer::new(&template, &persona, RenderTarget::Messages)
            .with_summarize_prompt("Summarize:");
        let turns = vec![Turn::user("a").with_rendered("Alice: a"), Turn::assistant("b")];
        let rendered = renderer.render(&turns, "ignored memory", RenderMode::Summary);
        assert_eq!(
            rendered,
            RenderedContext::Messages(vec![
                RenderedMessage::new(Role::System, "Summarize:"),
                RenderedMessage::new(Role::User, "a"),
                RenderedMessage::new(Role::Assistant, "b"),
            ])
        );
    }
}
