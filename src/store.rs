//! Record persistence
//!
//! The core treats storage as a key-indexed record store behind the
//! [`RecordStore`] trait, injected into the service so tests can run against
//! an in-memory database. [`SqliteStore`] is the shipping implementation.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::{ExerciseEntry, FoodEntry, MealSession, MealType, WorkoutSession};

pub type DbPool = SqlitePool;

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("No record with id {0}")]
  NotFound(Uuid),

  #[error("Corrupt record id: {0}")]
  BadId(String),
}

/// ---------------------------------------------------------------------------
/// Store Contract
/// ---------------------------------------------------------------------------

/// Key-indexed record store. Saves are upserts by id; fetches never mix
/// templates into dated history unless asked.
pub trait RecordStore {
  fn save_workout(
    &self,
    session: &WorkoutSession,
  ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
  fn save_meal(
    &self,
    session: &MealSession,
  ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

  fn workouts(
    &self,
    exclude_templates: bool,
  ) -> impl std::future::Future<Output = Result<Vec<WorkoutSession>, StoreError>> + Send;
  fn meals(
    &self,
    exclude_templates: bool,
  ) -> impl std::future::Future<Output = Result<Vec<MealSession>, StoreError>> + Send;

  fn workouts_between(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> impl std::future::Future<Output = Result<Vec<WorkoutSession>, StoreError>> + Send;
  fn meals_between(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> impl std::future::Future<Output = Result<Vec<MealSession>, StoreError>> + Send;

  fn workout_templates(
    &self,
  ) -> impl std::future::Future<Output = Result<Vec<WorkoutSession>, StoreError>> + Send;
  fn meal_templates(
    &self,
  ) -> impl std::future::Future<Output = Result<Vec<MealSession>, StoreError>> + Send;

  fn delete_workout(
    &self,
    id: Uuid,
  ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
  fn delete_meal(
    &self,
    id: Uuid,
  ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

  fn update_workout_template(
    &self,
    id: Uuid,
    content: &WorkoutSession,
  ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
  fn update_meal_template(
    &self,
    id: Uuid,
    content: &MealSession,
  ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}

/// ---------------------------------------------------------------------------
/// SQLite Implementation
/// ---------------------------------------------------------------------------

pub struct SqliteStore {
  pool: DbPool,
}

impl SqliteStore {
  /// Open (or create) the database at `db_url` and run migrations
  pub async fn connect(db_url: &str) -> Result<Self, StoreError> {
    let pool = SqlitePoolOptions::new()
      .max_connections(5)
      .connect(db_url)
      .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!(db_url, "database ready");

    Ok(Self { pool })
  }

  /// In-memory database for tests.
  ///
  /// Uses max_connections(1) to prevent multiple pool connections from
  /// creating isolated in-memory databases.
  pub async fn in_memory() -> Result<Self, StoreError> {
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .connect("sqlite::memory:")
      .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(Self { pool })
  }

  async fn workouts_from_headers(
    &self,
    headers: Vec<WorkoutHeader>,
  ) -> Result<Vec<WorkoutSession>, StoreError> {
    let mut sessions = Vec::with_capacity(headers.len());
    for (id, logged_at, name, is_template) in headers {
      let rows: Vec<(String, i64, i64, f64, i64, Option<String>, i64)> = sqlx::query_as(
        "SELECT name, sets, reps, weight, rpe, notes, order_idx
         FROM exercise_entries WHERE session_id = ?1 ORDER BY order_idx",
      )
      .bind(&id)
      .fetch_all(&self.pool)
      .await?;

      sessions.push(WorkoutSession {
        id: parse_id(&id)?,
        logged_at,
        name,
        is_template,
        exercises: rows
          .into_iter()
          .map(|(name, sets, reps, weight, rpe, notes, order)| ExerciseEntry {
            name,
            sets,
            reps,
            weight,
            rpe,
            notes,
            order,
          })
          .collect(),
      });
    }
    Ok(sessions)
  }

  async fn meals_from_headers(
    &self,
    headers: Vec<MealHeader>,
  ) -> Result<Vec<MealSession>, StoreError> {
    let mut sessions = Vec::with_capacity(headers.len());
    for (id, logged_at, name, is_template, meal_type) in headers {
      let rows: Vec<(
        String,
        Option<String>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<String>,
        i64,
      )> = sqlx::query_as(
        "SELECT name, portion, calories, protein, carbs, fat, notes, order_idx
         FROM food_entries WHERE session_id = ?1 ORDER BY order_idx",
      )
      .bind(&id)
      .fetch_all(&self.pool)
      .await?;

      sessions.push(MealSession {
        id: parse_id(&id)?,
        logged_at,
        name,
        is_template,
        meal_type: meal_type.as_deref().and_then(MealType::parse),
        items: rows
          .into_iter()
          .map(
            |(name, portion, calories, protein, carbs, fat, notes, order)| FoodEntry {
              name,
              portion,
              calories,
              protein,
              carbs,
              fat,
              notes,
              order,
            },
          )
          .collect(),
      });
    }
    Ok(sessions)
  }
}

type WorkoutHeader = (String, DateTime<Utc>, Option<String>, bool);
type MealHeader = (String, DateTime<Utc>, Option<String>, bool, Option<String>);

fn parse_id(raw: &str) -> Result<Uuid, StoreError> {
  Uuid::parse_str(raw).map_err(|_| StoreError::BadId(raw.to_string()))
}

impl RecordStore for SqliteStore {
  async fn save_workout(&self, session: &WorkoutSession) -> Result<(), StoreError> {
    let id = session.id.to_string();
    let mut tx = self.pool.begin().await?;

    sqlx::query(
      r#"
      INSERT INTO workout_sessions (id, logged_at, name, is_template)
      VALUES (?1, ?2, ?3, ?4)
      ON CONFLICT(id) DO UPDATE SET
        logged_at = excluded.logged_at,
        name = excluded.name,
        is_template = excluded.is_template
      "#,
    )
    .bind(&id)
    .bind(session.logged_at)
    .bind(&session.name)
    .bind(session.is_template)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM exercise_entries WHERE session_id = ?1")
      .bind(&id)
      .execute(&mut *tx)
      .await?;

    for exercise in &session.exercises {
      sqlx::query(
        r#"
        INSERT INTO exercise_entries (session_id, order_idx, name, sets, reps, weight, rpe, notes)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
      )
      .bind(&id)
      .bind(exercise.order)
      .bind(&exercise.name)
      .bind(exercise.sets)
      .bind(exercise.reps)
      .bind(exercise.weight)
      .bind(exercise.rpe)
      .bind(&exercise.notes)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(())
  }

  async fn save_meal(&self, session: &MealSession) -> Result<(), StoreError> {
    let id = session.id.to_string();
    let mut tx = self.pool.begin().await?;

    sqlx::query(
      r#"
      INSERT INTO meal_sessions (id, logged_at, name, is_template, meal_type)
      VALUES (?1, ?2, ?3, ?4, ?5)
      ON CONFLICT(id) DO UPDATE SET
        logged_at = excluded.logged_at,
        name = excluded.name,
        is_template = excluded.is_template,
        meal_type = excluded.meal_type
      "#,
    )
    .bind(&id)
    .bind(session.logged_at)
    .bind(&session.name)
    .bind(session.is_template)
    .bind(session.meal_type.map(|t| t.as_str()))
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM food_entries WHERE session_id = ?1")
      .bind(&id)
      .execute(&mut *tx)
      .await?;

    for item in &session.items {
      sqlx::query(
        r#"
        INSERT INTO food_entries (session_id, order_idx, name, portion, calories, protein, carbs, fat, notes)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
      )
      .bind(&id)
      .bind(item.order)
      .bind(&item.name)
      .bind(&item.portion)
      .bind(item.calories)
      .bind(item.protein)
      .bind(item.carbs)
      .bind(item.fat)
      .bind(&item.notes)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(())
  }

  async fn workouts(&self, exclude_templates: bool) -> Result<Vec<WorkoutSession>, StoreError> {
    let headers: Vec<WorkoutHeader> = sqlx::query_as(
      "SELECT id, logged_at, name, is_template FROM workout_sessions
       WHERE is_template = 0 OR ?1 = 0 ORDER BY logged_at",
    )
    .bind(exclude_templates)
    .fetch_all(&self.pool)
    .await?;
    self.workouts_from_headers(headers).await
  }

  async fn meals(&self, exclude_templates: bool) -> Result<Vec<MealSession>, StoreError> {
    let headers: Vec<MealHeader> = sqlx::query_as(
      "SELECT id, logged_at, name, is_template, meal_type FROM meal_sessions
       WHERE is_template = 0 OR ?1 = 0 ORDER BY logged_at",
    )
    .bind(exclude_templates)
    .fetch_all(&self.pool)
    .await?;
    self.meals_from_headers(headers).await
  }

  async fn workouts_between(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Vec<WorkoutSession>, StoreError> {
    // Dated history only; templates are definitions, not log entries
    let headers: Vec<WorkoutHeader> = sqlx::query_as(
      "SELECT id, logged_at, name, is_template FROM workout_sessions
       WHERE is_template = 0 AND logged_at >= ?1 AND logged_at < ?2 ORDER BY logged_at",
    )
    .bind(start)
    .bind(end)
    .fetch_all(&self.pool)
    .await?;
    self.workouts_from_headers(headers).await
  }

  async fn meals_between(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Vec<MealSession>, StoreError> {
    let headers: Vec<MealHeader> = sqlx::query_as(
      "SELECT id, logged_at, name, is_template, meal_type FROM meal_sessions
       WHERE is_template = 0 AND logged_at >= ?1 AND logged_at < ?2 ORDER BY logged_at",
    )
    .bind(start)
    .bind(end)
    .fetch_all(&self.pool)
    .await?;
    self.meals_from_headers(headers).await
  }

  async fn workout_templates(&self) -> Result<Vec<WorkoutSession>, StoreError> {
    let headers: Vec<WorkoutHeader> = sqlx::query_as(
      "SELECT id, logged_at, name, is_template FROM workout_sessions
       WHERE is_template = 1 ORDER BY name",
    )
    .fetch_all(&self.pool)
    .await?;
    self.workouts_from_headers(headers).await
  }

  async fn meal_templates(&self) -> Result<Vec<MealSession>, StoreError> {
    let headers: Vec<MealHeader> = sqlx::query_as(
      "SELECT id, logged_at, name, is_template, meal_type FROM meal_sessions
       WHERE is_template = 1 ORDER BY name",
    )
    .fetch_all(&self.pool)
    .await?;
    self.meals_from_headers(headers).await
  }

  async fn delete_workout(&self, id: Uuid) -> Result<(), StoreError> {
    let id = id.to_string();
    let mut tx = self.pool.begin().await?;
    sqlx::query("DELETE FROM exercise_entries WHERE session_id = ?1")
      .bind(&id)
      .execute(&mut *tx)
      .await?;
    sqlx::query("DELETE FROM workout_sessions WHERE id = ?1")
      .bind(&id)
      .execute(&mut *tx)
      .await?;
    tx.commit().await?;
    Ok(())
  }

  async fn delete_meal(&self, id: Uuid) -> Result<(), StoreError> {
    let id = id.to_string();
    let mut tx = self.pool.begin().await?;
    sqlx::query("DELETE FROM food_entries WHERE session_id = ?1")
      .bind(&id)
      .execute(&mut *tx)
      .await?;
    sqlx::query("DELETE FROM meal_sessions WHERE id = ?1")
      .bind(&id)
      .execute(&mut *tx)
      .await?;
    tx.commit().await?;
    Ok(())
  }

  async fn update_workout_template(
    &self,
    id: Uuid,
    content: &WorkoutSession,
  ) -> Result<(), StoreError> {
    let exists: i64 =
      sqlx::query_scalar("SELECT COUNT(*) FROM workout_sessions WHERE id = ?1 AND is_template = 1")
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await?;
    if exists == 0 {
      return Err(StoreError::NotFound(id));
    }

    let mut updated = content.clone();
    updated.id = id;
    updated.is_template = true;
    self.save_workout(&updated).await
  }

  async fn update_meal_template(&self, id: Uuid, content: &MealSession) -> Result<(), StoreError> {
    let exists: i64 =
      sqlx::query_scalar("SELECT COUNT(*) FROM meal_sessions WHERE id = ?1 AND is_template = 1")
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await?;
    if exists == 0 {
      return Err(StoreError::NotFound(id));
    }

    let mut updated = content.clone();
    updated.id = id;
    updated.is_template = true;
    self.save_meal(&updated).await
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::ExerciseEntry;
  use chrono::Duration;

  fn workout(name: &str, days_ago: i64) -> WorkoutSession {
    let mut session = WorkoutSession::new(Utc::now() - Duration::days(days_ago));
    session.name = Some(name.to_string());
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

  #[tokio::test]
  async fn test_save_is_upsert_by_id() {
    let store = SqliteStore::in_memory().await.unwrap();
    let mut session = workout("Leg Day", 0);
    store.save_workout(&session).await.unwrap();

    session.exercises[0].weight = 235.0;
    session.name = Some("Leg Day (heavy)".to_string());
    store.save_workout(&session).await.unwrap();

    let all = store.workouts(true).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, session.id);
    assert_eq!(all[0].name.as_deref(), Some("Leg Day (heavy)"));
    assert_eq!(all[0].exercises[0].weight, 235.0);
  }

  #[tokio::test]
  async fn test_templates_excluded_from_history() {
    let store = SqliteStore::in_memory().await.unwrap();
    store.save_workout(&workout("Leg Day", 1)).await.unwrap();
    store
      .save_workout(&workout("ignored", 0).make_template("Push Day A"))
      .await
      .unwrap();

    assert_eq!(store.workouts(true).await.unwrap().len(), 1);
    assert_eq!(store.workouts(false).await.unwrap().len(), 2);

    let templates = store.workout_templates().await.unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].name.as_deref(), Some("Push Day A"));
  }

  #[tokio::test]
  async fn test_range_query_is_half_open() {
    let store = SqliteStore::in_memory().await.unwrap();
    store.save_workout(&workout("old", 10)).await.unwrap();
    store.save_workout(&workout("recent", 2)).await.unwrap();

    let found = store
      .workouts_between(Utc::now() - Duration::days(5), Utc::now())
      .await
      .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name.as_deref(), Some("recent"));
  }

  #[tokio::test]
  async fn test_delete_removes_session_and_entries() {
    let store = SqliteStore::in_memory().await.unwrap();
    let session = workout("Leg Day", 0);
    store.save_workout(&session).await.unwrap();
    store.delete_workout(session.id).await.unwrap();

    assert!(store.workouts(false).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_update_template_keeps_id_and_flag() {
    let store = SqliteStore::in_memory().await.unwrap();
    let template = workout("ignored", 0).make_template("Push Day A");
    store.save_workout(&template).await.unwrap();

    let mut edited = template.clone();
    edited.exercises[0].weight = 245.0;
    store
      .update_workout_template(template.id, &edited)
      .await
      .unwrap();

    let stored = store.workout_templates().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, template.id);
    assert!(stored[0].is_template);
    assert_eq!(stored[0].exercises[0].weight, 245.0);
  }

  #[tokio::test]
  async fn test_update_missing_template_is_not_found() {
    let store = SqliteStore::in_memory().await.unwrap();
    let ghost = workout("ignored", 0).make_template("Ghost");
    let err = store
      .update_workout_template(ghost.id, &ghost)
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
  }

  #[tokio::test]
  async fn test_meal_round_trip_preserves_unknown_macros() {
    let store = SqliteStore::in_memory().await.unwrap();
    let mut meal = MealSession::new(Utc::now());
    meal.meal_type = Some(MealType::Lunch);
    meal.items = vec![FoodEntry {
      name: "Burrito".to_string(),
      portion: Some("one large".to_string()),
      calories: Some(850.0),
      protein: None,
      carbs: None,
      fat: None,
      notes: None,
      order: 0,
    }];
    store.save_meal(&meal).await.unwrap();

    let loaded = store.meals(true).await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].meal_type, Some(MealType::Lunch));
    assert_eq!(loaded[0].items[0].calories, Some(850.0));
    assert_eq!(loaded[0].items[0].protein, None);
  }
}
