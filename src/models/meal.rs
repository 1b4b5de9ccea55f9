use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Meal slot tags. Each carries a default local hour used when the user
/// names the meal without saying when they ate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
  Breakfast,
  Lunch,
  Dinner,
  Snack,
}

impl MealType {
  pub fn parse(value: &str) -> Option<Self> {
    match value.trim().to_lowercase().as_str() {
      "breakfast" => Some(MealType::Breakfast),
      "lunch" => Some(MealType::Lunch),
      "dinner" => Some(MealType::Dinner),
      "snack" => Some(MealType::Snack),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      MealType::Breakfast => "breakfast",
      MealType::Lunch => "lunch",
      MealType::Dinner => "dinner",
      MealType::Snack => "snack",
    }
  }

  /// Default local hour for entries of this slot: breakfast 08:00,
  /// lunch 12:00, snack 15:00, dinner 18:00
  pub fn default_hour(&self) -> u32 {
    match self {
      MealType::Breakfast => 8,
      MealType::Lunch => 12,
      MealType::Snack => 15,
      MealType::Dinner => 18,
    }
  }
}

/// A single food item within a meal.
///
/// Macro fields are `None` when unknown - distinct from an explicit zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEntry {
  pub name: String,
  pub portion: Option<String>,
  pub calories: Option<f64>,
  pub protein: Option<f64>,
  pub carbs: Option<f64>,
  pub fat: Option<f64>,
  pub notes: Option<String>,
  /// Stable display position, dense 0..n-1 within a meal
  pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealSession {
  pub id: Uuid,
  pub logged_at: DateTime<Utc>,
  pub name: Option<String>,
  pub is_template: bool,
  pub meal_type: Option<MealType>,
  pub items: Vec<FoodEntry>,
}

impl MealSession {
  pub fn new(logged_at: DateTime<Utc>) -> Self {
    Self {
      id: Uuid::new_v4(),
      logged_at,
      name: None,
      is_template: false,
      meal_type: None,
      items: Vec::new(),
    }
  }

  // Sums treat unknown macros as 0; the per-item None is preserved.
  pub fn total_calories(&self) -> f64 {
    self.items.iter().filter_map(|i| i.calories).sum()
  }

  pub fn total_protein(&self) -> f64 {
    self.items.iter().filter_map(|i| i.protein).sum()
  }

  pub fn total_carbs(&self) -> f64 {
    self.items.iter().filter_map(|i| i.carbs).sum()
  }

  pub fn total_fat(&self) -> f64 {
    self.items.iter().filter_map(|i| i.fat).sum()
  }

  /// Restore the dense 0..n-1 order sequence after any edit
  pub fn reindex(&mut self) {
    for (i, item) in self.items.iter_mut().enumerate() {
      item.order = i as i64;
    }
  }

  /// Remove the item at `index` and close the gap in the order sequence
  pub fn remove_item(&mut self, index: usize) {
    if index < self.items.len() {
      self.items.remove(index);
      self.reindex();
    }
  }

  /// Start a fresh loggable meal from a saved template
  pub fn from_template(template: &MealSession, logged_at: DateTime<Utc>) -> Self {
    Self {
      id: Uuid::new_v4(),
      logged_at,
      name: template.name.clone(),
      is_template: false,
      meal_type: template.meal_type,
      items: template.items.clone(),
    }
  }

  /// Save this meal's item list as a named, reusable template
  pub fn make_template(&self, name: &str) -> Self {
    Self {
      id: Uuid::new_v4(),
      logged_at: self.logged_at,
      name: Some(name.to_string()),
      is_template: true,
      meal_type: self.meal_type,
      items: self.items.clone(),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
