//! Pre-save validation
//!
//! Independent of parsing: these checks run on user-edited records right
//! before persistence. A failure names the offending field and blocks the
//! save; it is surfaced for correction, never dropped.

use thiserror::Error;

use crate::models::{MealSession, WorkoutSession};

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{field}: {message}")]
pub struct ValidationError {
  pub field: String,
  pub message: String,
}

impl ValidationError {
  fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      field: field.into(),
      message: message.into(),
    }
  }
}

pub fn validate_workout(session: &WorkoutSession) -> Result<(), ValidationError> {
  if session.is_template && session.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
    return Err(ValidationError::new("name", "a template needs a name"));
  }
  if session.exercises.is_empty() {
    return Err(ValidationError::new("exercises", "add at least one exercise"));
  }

  for (i, exercise) in session.exercises.iter().enumerate() {
    let field = |name: &str| format!("exercises[{}].{}", i, name);
    if exercise.name.trim().is_empty() {
      return Err(ValidationError::new(field("name"), "exercise name cannot be empty"));
    }
    if exercise.sets <= 0 {
      return Err(ValidationError::new(field("sets"), "sets must be greater than zero"));
    }
    if exercise.reps <= 0 {
      return Err(ValidationError::new(field("reps"), "reps must be greater than zero"));
    }
    if exercise.weight < 0.0 {
      return Err(ValidationError::new(field("weight"), "weight cannot be negative"));
    }
    if !(0..=10).contains(&exercise.rpe) {
      return Err(ValidationError::new(field("rpe"), "RPE must be between 0 and 10"));
    }
  }
  Ok(())
}

pub fn validate_meal(session: &MealSession) -> Result<(), ValidationError> {
  if session.is_template && session.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
    return Err(ValidationError::new("name", "a template needs a name"));
  }
  if session.items.is_empty() {
    return Err(ValidationError::new("items", "add at least one food item"));
  }

  for (i, item) in session.items.iter().enumerate() {
    let field = |name: &str| format!("items[{}].{}", i, name);
    if item.name.trim().is_empty() {
      return Err(ValidationError::new(field("name"), "food name cannot be empty"));
    }
    for (macro_name, value) in [
      ("calories", item.calories),
      ("protein", item.protein),
      ("carbs", item.carbs),
      ("fat", item.fat),
    ] {
      if value.is_some_and(|v| v < 0.0) {
        return Err(ValidationError::new(
          field(macro_name),
          format!("{} cannot be negative", macro_name),
        ));
      }
    }
  }
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{ExerciseEntry, FoodEntry};
  use chrono::Utc;

  fn valid_workout() -> WorkoutSession {
    let mut session = WorkoutSession::new(Utc::now());
    session.exercises = vec![ExerciseEntry {
      name: "Squat".to_string(),
      sets: 5,
      reps: 5,
      weight: 225.0,
      rpe: 8,
      notes: None,
      order: 0,
    }];
    session
  }

  fn valid_meal() -> MealSession {
    let mut meal = MealSession::new(Utc::now());
    meal.items = vec![FoodEntry {
      name: "Oatmeal".to_string(),
      portion: None,
      calories: Some(300.0),
      protein: Some(10.0),
      carbs: Some(54.0),
      fat: Some(5.0),
      notes: None,
      order: 0,
    }];
    meal
  }

  #[test]
  fn test_valid_records_pass() {
    assert!(validate_workout(&valid_workout()).is_ok());
    assert!(validate_meal(&valid_meal()).is_ok());
  }

  #[test]
  fn test_empty_exercise_name_blocks_save() {
    let mut session = valid_workout();
    session.exercises[0].name = "   ".to_string();
    let err = validate_workout(&session).unwrap_err();
    assert_eq!(err.field, "exercises[0].name");
  }

  #[test]
  fn test_nonpositive_counts_blocked() {
    let mut session = valid_workout();
    session.exercises[0].sets = 0;
    assert_eq!(validate_workout(&session).unwrap_err().field, "exercises[0].sets");

    let mut session = valid_workout();
    session.exercises[0].reps = -1;
    assert_eq!(validate_workout(&session).unwrap_err().field, "exercises[0].reps");
  }

  #[test]
  fn test_rpe_out_of_bounds_blocked() {
    let mut session = valid_workout();
    session.exercises[0].rpe = 11;
    assert_eq!(validate_workout(&session).unwrap_err().field, "exercises[0].rpe");
  }

  #[test]
  fn test_template_requires_name() {
    let mut session = valid_workout();
    session.is_template = true;
    session.name = None;
    assert_eq!(validate_workout(&session).unwrap_err().field, "name");
  }

  #[test]
  fn test_empty_session_blocked() {
    let mut session = valid_workout();
    session.exercises.clear();
    assert_eq!(validate_workout(&session).unwrap_err().field, "exercises");
  }

  #[test]
  fn test_negative_macro_blocked_but_unknown_allowed() {
    let mut meal = valid_meal();
    meal.items[0].fat = Some(-2.0);
    assert_eq!(validate_meal(&meal).unwrap_err().field, "items[0].fat");

    let mut meal = valid_meal();
    meal.items[0].calories = None;
    assert!(validate_meal(&meal).is_ok());
  }
}
