//! Prompt construction
//!
//! Pure functions from transcript + context to the (system, user) message
//! pair sent to the model. The business rules live in the system prompt text
//! files; everything request-specific (date, templates, previous entry,
//! conversation window) is rendered into the user message as plain text.

use chrono::{DateTime, TimeZone, Utc};

use crate::memory::ConversationMemory;
use crate::models::{MealSession, WorkoutSession};

/// A system/user message pair ready for the completion client
#[derive(Debug, Clone)]
pub struct Prompt {
  pub system: String,
  pub user: String,
}

/// ---------------------------------------------------------------------------
/// Parsing Prompts
/// ---------------------------------------------------------------------------

pub fn workout_parse_prompt<Tz: TimeZone>(
  transcript: &str,
  previous: Option<&WorkoutSession>,
  templates: &[WorkoutSession],
  now: DateTime<Utc>,
  zone: &Tz,
) -> Prompt {
  let mut user = String::new();
  user.push_str(&current_date_line(now, zone));

  user.push_str("\nAVAILABLE TEMPLATES:\n");
  if templates.is_empty() {
    user.push_str("none\n");
  } else {
    for template in templates {
      user.push_str(&render_workout(template));
    }
  }

  user.push_str("\nPREVIOUS WORKOUT:\n");
  match previous {
    Some(workout) => user.push_str(&render_workout(workout)),
    None => user.push_str("none\n"),
  }

  user.push_str("\nNEW ENTRY:\n");
  user.push_str(transcript);

  Prompt {
    system: include_str!("prompts/workout_system.txt").to_string(),
    user,
  }
}

pub fn meal_parse_prompt<Tz: TimeZone>(
  transcript: &str,
  previous: Option<&MealSession>,
  templates: &[MealSession],
  now: DateTime<Utc>,
  zone: &Tz,
) -> Prompt {
  let mut user = String::new();
  user.push_str(&current_date_line(now, zone));

  user.push_str("\nAVAILABLE TEMPLATES:\n");
  if templates.is_empty() {
    user.push_str("none\n");
  } else {
    for template in templates {
      user.push_str(&render_meal(template));
    }
  }

  user.push_str("\nPREVIOUS MEAL:\n");
  match previous {
    Some(meal) => user.push_str(&render_meal(meal)),
    None => user.push_str("none\n"),
  }

  user.push_str("\nNEW ENTRY:\n");
  user.push_str(transcript);

  Prompt {
    system: include_str!("prompts/meal_system.txt").to_string(),
    user,
  }
}

/// ---------------------------------------------------------------------------
/// Conversational Query Prompt
/// ---------------------------------------------------------------------------

pub fn chat_prompt<Tz: TimeZone>(
  question: &str,
  history_context: &str,
  memory: &ConversationMemory,
  now: DateTime<Utc>,
  zone: &Tz,
) -> Prompt {
  let window = memory.format_for_prompt();

  let user = format!(
    "{}\nHISTORY:\n{}\n\nCONVERSATION:\n{}\n\nQUESTION:\n{}",
    current_date_line(now, zone),
    if history_context.is_empty() { "none" } else { history_context },
    if window.is_empty() { "none" } else { window.as_str() },
    question
  );

  Prompt {
    system: include_str!("prompts/chat_system.txt").to_string(),
    user,
  }
}

/// Render logged history as plain text for the chat prompt. No tables; one
/// line per session the model can quote numbers from.
pub fn history_context<Tz: TimeZone>(
  workouts: &[WorkoutSession],
  meals: &[MealSession],
  zone: &Tz,
) -> String {
  let mut out = String::new();

  out.push_str("WORKOUTS:\n");
  if workouts.is_empty() {
    out.push_str("none\n");
  } else {
    for workout in workouts {
      let day = workout.logged_at.with_timezone(zone).date_naive();
      out.push_str(&format!(
        "{} {}: {}\n",
        day.format("%Y-%m-%d"),
        workout.name.as_deref().unwrap_or("Workout"),
        workout
          .exercises
          .iter()
          .map(exercise_summary)
          .collect::<Vec<_>>()
          .join("; ")
      ));
    }
  }

  out.push_str("\nMEALS:\n");
  if meals.is_empty() {
    out.push_str("none\n");
  } else {
    for meal in meals {
      let day = meal.logged_at.with_timezone(zone).date_naive();
      out.push_str(&format!(
        "{} {}: {} ({:.0} kcal, {:.0}g protein)\n",
        day.format("%Y-%m-%d"),
        meal
          .meal_type
          .map(|t| t.as_str())
          .or(meal.name.as_deref())
          .unwrap_or("meal"),
        meal
          .items
          .iter()
          .map(|i| i.name.as_str())
          .collect::<Vec<_>>()
          .join(", "),
        meal.total_calories(),
        meal.total_protein()
      ));
    }
  }

  out
}

/// ---------------------------------------------------------------------------
/// Rendering Helpers
/// ---------------------------------------------------------------------------

fn current_date_line<Tz: TimeZone>(now: DateTime<Utc>, zone: &Tz) -> String {
  let today = now.with_timezone(zone).date_naive();
  format!("CURRENT DATE: {} ({})\n", today.format("%Y-%m-%d"), today.format("%A"))
}

fn render_workout(workout: &WorkoutSession) -> String {
  let mut out = format!("- {}:\n", workout.name.as_deref().unwrap_or("(unnamed)"));
  for exercise in &workout.exercises {
    out.push_str(&format!("  - {}\n", exercise_summary(exercise)));
  }
  out
}

fn exercise_summary(exercise: &crate::models::ExerciseEntry) -> String {
  let mut line = format!(
    "{} {}x{} @ {} lb",
    exercise.name, exercise.sets, exercise.reps, exercise.weight
  );
  if exercise.rpe > 0 {
    line.push_str(&format!(" (RPE {})", exercise.rpe));
  }
  if let Some(notes) = &exercise.notes {
    line.push_str(&format!(" - {}", notes));
  }
  line
}

fn render_meal(meal: &MealSession) -> String {
  let mut out = format!(
    "- {}{}:\n",
    meal.name.as_deref().unwrap_or("(unnamed)"),
    meal
      .meal_type
      .map(|t| format!(" [{}]", t.as_str()))
      .unwrap_or_default()
  );
  for item in &meal.items {
    out.push_str(&format!(
      "  - {}{}: {} kcal, {}g protein, {}g carbs, {}g fat\n",
      item.name,
      item
        .portion
        .as_deref()
        .map(|p| format!(" ({})", p))
        .unwrap_or_default(),
      fmt_macro(item.calories),
      fmt_macro(item.protein),
      fmt_macro(item.carbs),
      fmt_macro(item.fat),
    ));
  }
  out
}

fn fmt_macro(value: Option<f64>) -> String {
  match value {
    Some(v) => format!("{}", v),
    None => "?".to_string(),
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{ConversationTurn, ExerciseEntry};
  use chrono::{FixedOffset, TimeZone};

  fn pacific() -> FixedOffset {
    FixedOffset::west_opt(8 * 3600).unwrap()
  }

  fn push_day_template() -> WorkoutSession {
    let mut session = WorkoutSession::new(Utc::now());
    session.exercises = vec![ExerciseEntry {
      name: "Bench Press".to_string(),
      sets: 4,
      reps: 8,
      weight: 185.0,
      rpe: 7,
      notes: None,
      order: 0,
    }];
    session.make_template("Push Day A")
  }

  #[test]
  fn test_parse_prompt_carries_date_and_weekday() {
    // 2024-03-16 00:30 UTC is still Friday the 15th in UTC-8
    let now = Utc.with_ymd_and_hms(2024, 3, 16, 0, 30, 0).unwrap();
    let prompt = workout_parse_prompt("did squats", None, &[], now, &pacific());

    assert!(prompt.user.contains("CURRENT DATE: 2024-03-15 (Friday)"));
    assert!(prompt.user.contains("did squats"));
  }

  #[test]
  fn test_parse_prompt_embeds_template_contents() {
    let now = Utc::now();
    let templates = vec![push_day_template()];
    let prompt = workout_parse_prompt("push day but heavier", None, &templates, now, &pacific());

    assert!(prompt.user.contains("Push Day A"));
    assert!(prompt.user.contains("Bench Press 4x8 @ 185 lb (RPE 7)"));
    assert!(prompt.system.contains("\"workouts\""));
  }

  #[test]
  fn test_parse_prompt_renders_previous_or_none() {
    let now = Utc::now();
    let previous = push_day_template();
    let with = workout_parse_prompt("same as last time", Some(&previous), &[], now, &pacific());
    assert!(with.user.contains("PREVIOUS WORKOUT:\n- Push Day A:"));

    let without = workout_parse_prompt("same as last time", None, &[], now, &pacific());
    assert!(without.user.contains("PREVIOUS WORKOUT:\nnone"));
  }

  #[test]
  fn test_meal_prompt_unknown_macros_render_as_question_marks() {
    let mut meal = MealSession::new(Utc::now());
    meal.items = vec![crate::models::FoodEntry {
      name: "Mystery Stew".to_string(),
      portion: Some("one bowl".to_string()),
      calories: None,
      protein: None,
      carbs: None,
      fat: None,
      notes: None,
      order: 0,
    }];
    let templates = vec![meal.make_template("Camp Dinner")];

    let prompt = meal_parse_prompt("camp dinner again", None, &templates, Utc::now(), &pacific());
    assert!(prompt.user.contains("Mystery Stew (one bowl): ? kcal"));
  }

  #[test]
  fn test_chat_prompt_includes_window_and_question() {
    let mut memory = ConversationMemory::new();
    memory.append(ConversationTurn::user("how many squats this week?"));
    memory.append(ConversationTurn::assistant("You squatted twice."));

    let prompt = chat_prompt("and last week?", "WORKOUTS:\nnone", &memory, Utc::now(), &pacific());
    assert!(prompt.user.contains("User: how many squats this week?"));
    assert!(prompt.user.contains("Assistant: You squatted twice."));
    assert!(prompt.user.contains("QUESTION:\nand last week?"));
    assert!(prompt.system.contains("two to three paragraphs"));
  }
}
