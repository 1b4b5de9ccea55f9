//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Mock data factories
//! - A canned completion client with call counting
//! - A fixed-value key provider

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::Utc;

use crate::credentials::ApiKeyProvider;
use crate::llm::{CompletionApi, CompletionCall, LlmError};
use crate::models::{ExerciseEntry, FoodEntry, MealSession, MealType, WorkoutSession};
use crate::prompts::Prompt;

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

pub fn mock_workout() -> WorkoutSession {
  let mut session = WorkoutSession::new(Utc::now());
  session.name = Some("Push Day".to_string());
  session.exercises = vec![
    ExerciseEntry {
      name: "Bench Press".to_string(),
      sets: 4,
      reps: 8,
      weight: 185.0,
      rpe: 7,
      notes: None,
      order: 0,
    },
    ExerciseEntry {
      name: "Overhead Press".to_string(),
      sets: 3,
      reps: 10,
      weight: 95.0,
      rpe: 8,
      notes: Some("felt heavy".to_string()),
      order: 1,
    },
  ];
  session
}

pub fn mock_meal() -> MealSession {
  let mut meal = MealSession::new(Utc::now());
  meal.meal_type = Some(MealType::Breakfast);
  meal.items = vec![FoodEntry {
    name: "Scrambled Eggs".to_string(),
    portion: Some("3 eggs".to_string()),
    calories: Some(210.0),
    protein: Some(18.0),
    carbs: Some(2.0),
    fat: Some(15.0),
    notes: None,
    order: 0,
  }];
  meal
}

/// A model reply describing a push day plus a 20 minute run
pub fn canned_workout_reply() -> String {
  r#"{
    "workouts": [
      {
        "name": "Push Day",
        "date": null,
        "exercises": [
          { "name": "Bench Press", "sets": 4, "reps": 8, "weight": 185, "rpe": 7 }
        ]
      },
      {
        "name": "Morning Run",
        "date": null,
        "exercises": [
          { "name": "Run", "sets": 1, "reps": 20, "weight": 0 }
        ]
      }
    ]
  }"#
  .to_string()
}

/// ---------------------------------------------------------------------------
/// Completion Client Mock
/// ---------------------------------------------------------------------------

/// Hands out canned replies in order and records every prompt it sees
pub struct MockCompletions {
  replies: Mutex<Vec<String>>,
  prompts: Mutex<Vec<Prompt>>,
  call_count: AtomicUsize,
}

impl MockCompletions {
  pub fn new(replies: Vec<String>) -> Self {
    Self {
      replies: Mutex::new(replies),
      prompts: Mutex::new(Vec::new()),
      call_count: AtomicUsize::new(0),
    }
  }

  pub fn calls(&self) -> usize {
    self.call_count.load(Ordering::SeqCst)
  }

  pub fn last_prompt(&self) -> Option<Prompt> {
    self.prompts.lock().unwrap().last().cloned()
  }
}

impl CompletionApi for MockCompletions {
  async fn complete(&self, _api_key: &str, call: &CompletionCall) -> Result<String, LlmError> {
    self.call_count.fetch_add(1, Ordering::SeqCst);
    self.prompts.lock().unwrap().push(call.prompt.clone());
    let mut replies = self.replies.lock().unwrap();
    if replies.is_empty() {
      return Err(LlmError::Api("mock has no reply queued".to_string()));
    }
    Ok(replies.remove(0))
  }
}

/// ---------------------------------------------------------------------------
/// Key Provider Stub
/// ---------------------------------------------------------------------------

pub struct FixedKey(pub Option<String>);

impl ApiKeyProvider for FixedKey {
  fn api_key(&self) -> Option<String> {
    self.0.clone()
  }
}
