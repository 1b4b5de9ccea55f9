pub mod chat;
pub mod meal;
pub mod workout;

pub use chat::{ConversationTurn, Role};
pub use meal::{FoodEntry, MealSession, MealType};
pub use workout::{ExerciseEntry, WorkoutSession};
