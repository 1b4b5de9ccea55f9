use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single exercise within a workout session.
///
/// `reps` doubles as duration-in-minutes for cardio entries; `weight` is in
/// pounds with 0 meaning bodyweight, cardio, or recovery work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseEntry {
  pub name: String,
  pub sets: i64,
  pub reps: i64,
  pub weight: f64,
  /// RPE 0-10; 0 = not recorded
  pub rpe: i64,
  pub notes: Option<String>,
  /// Stable display position, dense 0..n-1 within a session
  pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
  pub id: Uuid,
  pub logged_at: DateTime<Utc>,
  pub name: Option<String>,
  pub is_template: bool,
  pub exercises: Vec<ExerciseEntry>,
}

impl WorkoutSession {
  pub fn new(logged_at: DateTime<Utc>) -> Self {
    Self {
      id: Uuid::new_v4(),
      logged_at,
      name: None,
      is_template: false,
      exercises: Vec::new(),
    }
  }

  /// Total number of sets across all exercises
  pub fn total_sets(&self) -> i64 {
    self.exercises.iter().map(|e| e.sets).sum()
  }

  /// Total rep volume (sets x reps summed over all exercises)
  pub fn total_volume(&self) -> i64 {
    self.exercises.iter().map(|e| e.sets * e.reps).sum()
  }

  /// Restore the dense 0..n-1 order sequence after any edit
  pub fn reindex(&mut self) {
    for (i, exercise) in self.exercises.iter_mut().enumerate() {
      exercise.order = i as i64;
    }
  }

  /// Remove the exercise at `index` and close the gap in the order sequence
  pub fn remove_exercise(&mut self, index: usize) {
    if index < self.exercises.len() {
      self.exercises.remove(index);
      self.reindex();
    }
  }

  /// Start a fresh loggable session from a saved template.
  ///
  /// The copy gets its own id and is never itself a template, so editing or
  /// saving it cannot touch the template it came from.
  pub fn from_template(template: &WorkoutSession, logged_at: DateTime<Utc>) -> Self {
    Self {
      id: Uuid::new_v4(),
      logged_at,
      name: template.name.clone(),
      is_template: false,
      exercises: template.exercises.clone(),
    }
  }

  /// Save this session's exercise list as a named, reusable template
  pub fn make_template(&self, name: &str) -> Self {
    Self {
      id: Uuid::new_v4(),
      logged_at: self.logged_at,
      name: Some(name.to_string()),
      is_template: true,
      exercises: self.exercises.clone(),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
