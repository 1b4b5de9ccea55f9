//! Response decoding
//!
//! Turns the model's raw reply into domain records. Structurally invalid
//! replies fail the whole batch - a partially-applied bulk save is worse than
//! an all-or-nothing retry. Missing optional fields get explicit defaults.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::dates::{resolve_entry_date, resolve_entry_date_at, ANCHOR_HOUR};
use crate::models::{ExerciseEntry, FoodEntry, MealSession, MealType, WorkoutSession};

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("Could not find JSON in reply")]
  NoJson,

  #[error("Reply is not the expected shape: {0}")]
  Shape(String),
}

/// ---------------------------------------------------------------------------
/// Wire Types (the schema the model is instructed to emit)
/// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WorkoutBatch {
  workouts: Vec<WorkoutWire>,
}

#[derive(Debug, Deserialize)]
struct WorkoutWire {
  name: Option<String>,
  date: Option<String>,
  exercises: Vec<ExerciseWire>,
}

#[derive(Debug, Deserialize)]
struct ExerciseWire {
  name: String,
  sets: Option<i64>,
  reps: Option<i64>,
  weight: Option<f64>,
  rpe: Option<i64>,
  notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MealBatch {
  meals: Vec<MealWire>,
}

#[derive(Debug, Deserialize)]
struct MealWire {
  name: Option<String>,
  meal_type: Option<String>,
  date: Option<String>,
  items: Vec<FoodWire>,
}

#[derive(Debug, Deserialize)]
struct FoodWire {
  name: String,
  portion: Option<String>,
  calories: Option<f64>,
  protein: Option<f64>,
  carbs: Option<f64>,
  fat: Option<f64>,
  notes: Option<String>,
}

/// ---------------------------------------------------------------------------
/// Decoding
/// ---------------------------------------------------------------------------

pub fn decode_workouts<Tz: TimeZone>(
  raw: &str,
  now: DateTime<Utc>,
  zone: &Tz,
) -> Result<Vec<WorkoutSession>, DecodeError> {
  let json = extract_json(raw).ok_or(DecodeError::NoJson)?;
  let batch: WorkoutBatch =
    serde_json::from_str(&json).map_err(|e| DecodeError::Shape(e.to_string()))?;

  Ok(
    batch
      .workouts
      .into_iter()
      .map(|wire| {
        let exercises = wire
          .exercises
          .into_iter()
          .enumerate()
          .map(|(i, e)| ExerciseEntry {
            name: e.name,
            sets: e.sets.unwrap_or(1).max(1),
            reps: e.reps.unwrap_or(1).max(1),
            weight: e.weight.unwrap_or(0.0).max(0.0),
            rpe: e.rpe.unwrap_or(0).clamp(0, 10),
            notes: e.notes,
            order: i as i64,
          })
          .collect();

        WorkoutSession {
          id: Uuid::new_v4(),
          logged_at: resolve_entry_date(wire.date.as_deref(), now, zone),
          name: non_empty(wire.name),
          is_template: false,
          exercises,
        }
      })
      .collect(),
  )
}

pub fn decode_meals<Tz: TimeZone>(
  raw: &str,
  now: DateTime<Utc>,
  zone: &Tz,
) -> Result<Vec<MealSession>, DecodeError> {
  let json = extract_json(raw).ok_or(DecodeError::NoJson)?;
  let batch: MealBatch =
    serde_json::from_str(&json).map_err(|e| DecodeError::Shape(e.to_string()))?;

  Ok(
    batch
      .meals
      .into_iter()
      .map(|wire| {
        let meal_type = wire.meal_type.as_deref().and_then(MealType::parse);
        // A tagged meal on a past day lands at its slot's hour, not the
        // generic morning anchor
        let anchor = meal_type.map(|t| t.default_hour()).unwrap_or(ANCHOR_HOUR);

        let items = wire
          .items
          .into_iter()
          .enumerate()
          .map(|(i, f)| FoodEntry {
            name: f.name,
            portion: f.portion,
            calories: f.calories,
            protein: f.protein,
            carbs: f.carbs,
            fat: f.fat,
            notes: f.notes,
            order: i as i64,
          })
          .collect();

        MealSession {
          id: Uuid::new_v4(),
          logged_at: resolve_entry_date_at(wire.date.as_deref(), now, zone, anchor),
          name: non_empty(wire.name),
          is_template: false,
          meal_type,
          items,
        }
      })
      .collect(),
  )
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.and_then(|s| {
    let trimmed = s.trim();
    if trimmed.is_empty() {
      None
    } else {
      Some(trimmed.to_string())
    }
  })
}

/// Extract JSON from the reply (handles markdown code blocks)
pub fn extract_json(text: &str) -> Option<String> {
  // Try direct parse first
  if text.trim().starts_with('{') {
    return Some(text.trim().to_string());
  }

  // Look for JSON in code blocks
  if let Some(start) = text.find("```json") {
    let start = start + 7;
    if let Some(end) = text[start..].find("```") {
      return Some(text[start..start + end].trim().to_string());
    }
  }

  // Look for plain code blocks
  if let Some(start) = text.find("```") {
    let start = start + 3;
    // Skip language identifier if present
    let content_start = text[start..]
      .find('\n')
      .map(|i| start + i + 1)
      .unwrap_or(start);
    if let Some(end) = text[content_start..].find("```") {
      return Some(text[content_start..content_start + end].trim().to_string());
    }
  }

  // Last resort: find first { to last }
  if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
    return Some(text[start..=end].to_string());
  }

  None
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
