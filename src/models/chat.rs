use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  Assistant,
}

impl Role {
  /// Prefix used when rendering turns into a prompt
  pub fn prompt_label(&self) -> &'static str {
    match self {
      Role::User => "User",
      Role::Assistant => "Assistant",
    }
  }
}

/// One turn of the coaching chat, either side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
  pub id: Uuid,
  pub role: Role,
  pub content: String,
  pub at: DateTime<Utc>,
}

impl ConversationTurn {
  pub fn user(content: &str) -> Self {
    Self::new(Role::User, content)
  }

  pub fn assistant(content: &str) -> Self {
    Self::new(Role::Assistant, content)
  }

  fn new(role: Role, content: &str) -> Self {
    Self {
      id: Uuid::new_v4(),
      role,
      content: content.to_string(),
      at: Utc::now(),
    }
  }
}
