//! Rolling conversation window
//!
//! Full history stays in memory for the session; prompts only ever see the
//! most recent [`PROMPT_WINDOW`] turns, which bounds token cost on long
//! conversations.

use crate::models::ConversationTurn;

/// Maximum turns rendered into a prompt
pub const PROMPT_WINDOW: usize = 10;

#[derive(Debug, Default)]
pub struct ConversationMemory {
  turns: Vec<ConversationTurn>,
}

impl ConversationMemory {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn append(&mut self, turn: ConversationTurn) {
    self.turns.push(turn);
  }

  pub fn clear(&mut self) {
    self.turns.clear();
  }

  pub fn len(&self) -> usize {
    self.turns.len()
  }

  pub fn is_empty(&self) -> bool {
    self.turns.is_empty()
  }

  /// Last `limit` turns in chronological order
  pub fn recent(&self, limit: usize) -> &[ConversationTurn] {
    let start = self.turns.len().saturating_sub(limit);
    &self.turns[start..]
  }

  /// Render the prompt window as alternating "User:"/"Assistant:" lines
  pub fn format_for_prompt(&self) -> String {
    self
      .recent(PROMPT_WINDOW)
      .iter()
      .map(|turn| format!("{}: {}", turn.role.prompt_label(), turn.content))
      .collect::<Vec<_>>()
      .join("\n")
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
