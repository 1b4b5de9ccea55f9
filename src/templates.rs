//! Local template matching
//!
//! Deterministic pre-selection of saved templates referenced in a transcript.
//! The language model does the actual merging (applying "add 5 pounds" style
//! deltas); this module only decides which templates are worth sending along.

use crate::models::{MealSession, WorkoutSession};

/// Anything with an optional template name
pub trait NamedTemplate {
  fn template_name(&self) -> Option<&str>;
}

impl NamedTemplate for WorkoutSession {
  fn template_name(&self) -> Option<&str> {
    self.name.as_deref()
  }
}

impl NamedTemplate for MealSession {
  fn template_name(&self) -> Option<&str> {
    self.name.as_deref()
  }
}

/// Select the templates a free-text reference points at.
///
/// Case-insensitive. A template matches when the text contains its full name,
/// or when any two-or-more-word run of the text appears inside the name - so
/// "let's do push day" picks up "Push Day A" while "arm day" leaves "Leg Day"
/// alone. No match is not an error; the caller falls through to plain parsing.
pub fn matching_templates<'a, T: NamedTemplate>(templates: &'a [T], text: &str) -> Vec<&'a T> {
  templates
    .iter()
    .filter(|t| t.template_name().is_some_and(|name| name_matches(name, text)))
    .collect()
}

fn name_matches(name: &str, text: &str) -> bool {
  let name = name.trim().to_lowercase();
  if name.is_empty() {
    return false;
  }
  let text = text.to_lowercase();
  if text.contains(&name) {
    return true;
  }

  let words: Vec<&str> = text
    .split_whitespace()
    .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
    .filter(|w| !w.is_empty())
    .collect();

  // Longest word runs first so "push day" wins before "push" could be tried
  for len in (2..=words.len()).rev() {
    for window in words.windows(len) {
      if name.contains(&window.join(" ")) {
        return true;
      }
    }
  }
  false
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::WorkoutSession;
  use chrono::Utc;

  fn template(name: &str) -> WorkoutSession {
    WorkoutSession::new(Utc::now()).make_template(name)
  }

  #[test]
  fn test_partial_reference_selects_right_template() {
    let templates = vec![template("Push Day A"), template("Leg Day")];
    let matched = matching_templates(&templates, "let's do push day");

    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name.as_deref(), Some("Push Day A"));
  }

  #[test]
  fn test_no_match_selects_none() {
    let templates = vec![template("Push Day A"), template("Leg Day")];
    let matched = matching_templates(&templates, "arm day");
    assert!(matched.is_empty());
  }

  #[test]
  fn test_full_name_in_text_matches() {
    let templates = vec![template("Leg Day")];
    let matched = matching_templates(&templates, "time for leg day again");
    assert_eq!(matched.len(), 1);
  }

  #[test]
  fn test_matching_ignores_case_and_punctuation() {
    let templates = vec![template("Push Day A")];
    let matched = matching_templates(&templates, "PUSH day, then some cardio");
    assert_eq!(matched.len(), 1);
  }

  #[test]
  fn test_unnamed_template_never_matches() {
    let mut unnamed = WorkoutSession::new(Utc::now());
    unnamed.is_template = true;
    let templates = vec![unnamed];
    assert!(matching_templates(&templates, "anything at all").is_empty());
  }

  #[test]
  fn test_multiple_references_select_multiple() {
    let templates = vec![template("Push Day A"), template("Leg Day")];
    let matched = matching_templates(&templates, "push day and then leg day");
    assert_eq!(matched.len(), 2);
  }
}
