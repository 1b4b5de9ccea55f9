//! Backup export/import
//!
//! A single JSON document carrying every workout and meal, templates
//! included. Import replays `save` per element - per-kind counts are
//! reported and one bad element never blocks the rest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{MealSession, WorkoutSession};
use crate::store::{RecordStore, StoreError};

pub const BACKUP_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
  pub version: u32,
  pub export_date: DateTime<Utc>,
  pub workouts: Vec<WorkoutSession>,
  pub meals: Vec<MealSession>,
}

#[derive(Debug, Default, PartialEq)]
pub struct ImportOutcome {
  pub workouts_saved: usize,
  pub meals_saved: usize,
  pub failed: usize,
}

/// Snapshot the full store, templates included
pub async fn export<S: RecordStore>(store: &S) -> Result<BackupDocument, StoreError> {
  Ok(BackupDocument {
    version: BACKUP_VERSION,
    export_date: Utc::now(),
    workouts: store.workouts(false).await?,
    meals: store.meals(false).await?,
  })
}

/// Replay a backup into the store. Saves are upserts by id, so importing
/// over existing data is idempotent.
pub async fn import<S: RecordStore>(store: &S, document: &BackupDocument) -> ImportOutcome {
  let mut outcome = ImportOutcome::default();

  for workout in &document.workouts {
    match store.save_workout(workout).await {
      Ok(()) => outcome.workouts_saved += 1,
      Err(e) => {
        warn!(id = %workout.id, error = %e, "workout skipped during import");
        outcome.failed += 1;
      }
    }
  }
  for meal in &document.meals {
    match store.save_meal(meal).await {
      Ok(()) => outcome.meals_saved += 1,
      Err(e) => {
        warn!(id = %meal.id, error = %e, "meal skipped during import");
        outcome.failed += 1;
      }
    }
  }
  outcome
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
