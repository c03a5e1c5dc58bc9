//! Conversation History: append-only turn log with a bounded prompt window.

use serde::{Deserialize, Serialize};

/// Turns shown to the model when rendering history into a prompt.
pub const PROMPT_WINDOW: usize = 10;
const EMPTY_HISTORY: &str = "No conversation history yet.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Bot,
    User,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Position in the log. Older records without it read back as 0.
    #[serde(default)]
    pub sequence: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        let sequence = self.turns.len() as u64;
        self.turns.push(Turn {
            role,
            content: content.into(),
            sequence,
        });
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

    /// The last `PROMPT_WINDOW` bot/user turns, one per line.
    pub fn prompt_view(&self) -> String {
        let visible: Vec<&Turn> = self
            .turns
            .iter()
            .filter(|t| t.role != Role::System)
            .collect();
        if visible.is_empty() {
            return EMPTY_HISTORY.to_string();
        }
        let start = visible.len().saturating_sub(PROMPT_WINDOW);
        visible[start..]
            .iter()
            .map(|t| match t.role {
                Role::Bot => format!("Bot: {}", t.content),
                _ => format!("User: {}", t.content),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history_placeholder() {
        assert_eq!(ConversationHistory::new().prompt_view(), EMPTY_HISTORY);
    }

    #[test]
    fn test_prompt_view_is_bounded_suffix() {
        let mut history = ConversationHistory::new();
        for i in 0..12 {
            history.push(Role::Bot, format!("q{i}"));
            history.push(Role::User, format!("a{i}"));
        }
        let view = history.prompt_view();
        assert_eq!(view.lines().count(), PROMPT_WINDOW);
        assert!(view.starts_with("Bot: q7"));
        assert!(view.ends_with("User: a11"));
        assert_eq!(history.len(), 24);
    }

    #[test]
    fn test_sequence_is_monotonic() {
        let mut history = ConversationHistory::new();
        history.push(Role::Bot, "hello");
        history.push(Role::System, "time_up");
        assert_eq!(history.turns()[1].sequence, 1);
        assert_eq!(history.prompt_view(), "Bot: hello");
    }
}
