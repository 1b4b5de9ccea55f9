//! Service layer
//!
//! Wires transcript -> prompt -> completion -> decoded records, and owns the
//! conversation memory for the chat flow. Store, completion client, and key
//! lookup are injected so every path is testable without a network or a real
//! database. One call is in flight per user action; the surrounding shell is
//! expected to serialize input events.

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::credentials::ApiKeyProvider;
use crate::decode::{self, DecodeError};
use crate::llm::{CompletionApi, CompletionCall, LlmError};
use crate::memory::ConversationMemory;
use crate::models::{ConversationTurn, MealSession, WorkoutSession};
use crate::prompts;
use crate::store::{RecordStore, StoreError};
use crate::templates::matching_templates;
use crate::validation::{validate_meal, validate_workout, ValidationError};

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ServiceError {
  #[error("No API key configured - add one in settings")]
  Configuration,

  #[error(transparent)]
  Llm(#[from] LlmError),

  #[error(transparent)]
  Decode(#[from] DecodeError),

  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error(transparent)]
  Store(#[from] StoreError),
}

/// Outcome of a non-transactional batch save: partial success is a valid,
/// reportable result, distinct from total failure.
#[derive(Debug, Default)]
pub struct BatchSaveOutcome {
  pub saved: usize,
  pub failed: Vec<(Uuid, String)>,
}

impl BatchSaveOutcome {
  pub fn all_saved(&self) -> bool {
    self.failed.is_empty()
  }
}

/// ---------------------------------------------------------------------------
/// Service
/// ---------------------------------------------------------------------------

pub struct LogService<S, C, K> {
  store: S,
  completions: C,
  keys: K,
  zone: FixedOffset,
  memory: ConversationMemory,
}

impl<S, C, K> LogService<S, C, K>
where
  S: RecordStore,
  C: CompletionApi,
  K: ApiKeyProvider,
{
  pub fn new(store: S, completions: C, keys: K) -> Self {
    Self::with_zone(store, completions, keys, Local::now().offset().fix())
  }

  /// Explicit zone for tests and for callers that track the user's zone
  pub fn with_zone(store: S, completions: C, keys: K, zone: FixedOffset) -> Self {
    Self {
      store,
      completions,
      keys,
      zone,
      memory: ConversationMemory::new(),
    }
  }

  fn require_key(&self) -> Result<String, ServiceError> {
    self.keys.api_key().ok_or(ServiceError::Configuration)
  }

  /// -------------------------------------------------------------------------
  /// Parsing
  /// -------------------------------------------------------------------------

  /// Parse a spoken workout description into zero or more sessions.
  ///
  /// The records are returned for user review, not yet saved.
  pub async fn parse_workouts(&self, transcript: &str) -> Result<Vec<WorkoutSession>, ServiceError> {
    let key = self.require_key()?;
    let templates = self.store.workout_templates().await?;
    let previous = latest(self.store.workouts(true).await?, |w: &WorkoutSession| w.logged_at);
    let now = Utc::now();

    let prompt =
      prompts::workout_parse_prompt(transcript, previous.as_ref(), &templates, now, &self.zone);
    let reply = self.completions.complete(&key, &CompletionCall::parse(prompt)).await?;

    Ok(decode::decode_workouts(&reply, now, &self.zone)?)
  }

  /// Parse a spoken meal description into zero or more meals
  pub async fn parse_meals(&self, transcript: &str) -> Result<Vec<MealSession>, ServiceError> {
    let key = self.require_key()?;
    let templates = self.store.meal_templates().await?;
    let previous = latest(self.store.meals(true).await?, |m: &MealSession| m.logged_at);
    let now = Utc::now();

    let prompt =
      prompts::meal_parse_prompt(transcript, previous.as_ref(), &templates, now, &self.zone);
    let reply = self.completions.complete(&key, &CompletionCall::parse(prompt)).await?;

    Ok(decode::decode_meals(&reply, now, &self.zone)?)
  }

  /// -------------------------------------------------------------------------
  /// Conversational Queries
  /// -------------------------------------------------------------------------

  /// Answer a question about logged history. Both sides of the exchange are
  /// appended to the conversation window for follow-ups.
  pub async fn answer_question(&mut self, question: &str) -> Result<String, ServiceError> {
    let key = self.require_key()?;
    let workouts = self.store.workouts(true).await?;
    let meals = self.store.meals(true).await?;

    let context = prompts::history_context(&workouts, &meals, &self.zone);
    let prompt = prompts::chat_prompt(question, &context, &self.memory, Utc::now(), &self.zone);
    let answer = self.completions.complete(&key, &CompletionCall::chat(prompt)).await?;

    self.memory.append(ConversationTurn::user(question));
    self.memory.append(ConversationTurn::assistant(&answer));
    Ok(answer)
  }

  pub fn conversation(&self) -> &ConversationMemory {
    &self.memory
  }

  pub fn clear_conversation(&mut self) {
    self.memory.clear();
  }

  /// -------------------------------------------------------------------------
  /// Saving
  /// -------------------------------------------------------------------------

  /// Save reviewed workouts one by one. Each record validates and saves
  /// independently; failures are collected, not thrown.
  pub async fn save_workouts(&self, sessions: &[WorkoutSession]) -> BatchSaveOutcome {
    let mut outcome = BatchSaveOutcome::default();
    for session in sessions {
      let result = match validate_workout(session) {
        Ok(()) => self.store.save_workout(session).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
      };
      match result {
        Ok(()) => outcome.saved += 1,
        Err(message) => {
          warn!(id = %session.id, %message, "workout not saved");
          outcome.failed.push((session.id, message));
        }
      }
    }
    outcome
  }

  pub async fn save_meals(&self, sessions: &[MealSession]) -> BatchSaveOutcome {
    let mut outcome = BatchSaveOutcome::default();
    for session in sessions {
      let result = match validate_meal(session) {
        Ok(()) => self.store.save_meal(session).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
      };
      match result {
        Ok(()) => outcome.saved += 1,
        Err(message) => {
          warn!(id = %session.id, %message, "meal not saved");
          outcome.failed.push((session.id, message));
        }
      }
    }
    outcome
  }

  /// -------------------------------------------------------------------------
  /// Templates
  /// -------------------------------------------------------------------------

  /// Templates a transcript appears to reference. The full list still goes
  /// into the prompt either way; this drives the "using template ..." hint
  /// shown while a parse is in flight.
  pub async fn referenced_workout_templates(
    &self,
    transcript: &str,
  ) -> Result<Vec<WorkoutSession>, ServiceError> {
    let templates = self.store.workout_templates().await?;
    Ok(
      matching_templates(&templates, transcript)
        .into_iter()
        .cloned()
        .collect(),
    )
  }

  pub async fn referenced_meal_templates(
    &self,
    transcript: &str,
  ) -> Result<Vec<MealSession>, ServiceError> {
    let templates = self.store.meal_templates().await?;
    Ok(
      matching_templates(&templates, transcript)
        .into_iter()
        .cloned()
        .collect(),
    )
  }

  /// Instantiate a saved workout template as a fresh, editable session
  pub async fn start_from_workout_template(&self, id: Uuid) -> Result<WorkoutSession, ServiceError> {
    let templates = self.store.workout_templates().await?;
    let template = templates
      .iter()
      .find(|t| t.id == id)
      .ok_or(StoreError::NotFound(id))?;
    Ok(WorkoutSession::from_template(template, Utc::now()))
  }

  pub async fn start_from_meal_template(&self, id: Uuid) -> Result<MealSession, ServiceError> {
    let templates = self.store.meal_templates().await?;
    let template = templates
      .iter()
      .find(|t| t.id == id)
      .ok_or(StoreError::NotFound(id))?;
    Ok(MealSession::from_template(template, Utc::now()))
  }

  /// Save a reviewed session's exercises as a named template
  pub async fn save_workout_as_template(
    &self,
    session: &WorkoutSession,
    name: &str,
  ) -> Result<WorkoutSession, ServiceError> {
    let template = session.make_template(name);
    validate_workout(&template)?;
    self.store.save_workout(&template).await?;
    Ok(template)
  }

  pub async fn save_meal_as_template(
    &self,
    session: &MealSession,
    name: &str,
  ) -> Result<MealSession, ServiceError> {
    let template = session.make_template(name);
    validate_meal(&template)?;
    self.store.save_meal(&template).await?;
    Ok(template)
  }

  pub async fn update_workout_template(
    &self,
    id: Uuid,
    content: &WorkoutSession,
  ) -> Result<(), ServiceError> {
    validate_workout(content)?;
    Ok(self.store.update_workout_template(id, content).await?)
  }

  pub async fn update_meal_template(
    &self,
    id: Uuid,
    content: &MealSession,
  ) -> Result<(), ServiceError> {
    validate_meal(content)?;
    Ok(self.store.update_meal_template(id, content).await?)
  }

  pub fn store(&self) -> &S {
    &self.store
  }
}

fn latest<T, F: Fn(&T) -> DateTime<Utc>>(records: Vec<T>, logged_at: F) -> Option<T> {
  records.into_iter().max_by_key(|r| logged_at(r))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
