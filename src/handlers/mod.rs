pub mod chat_handler;
pub mod meal_planner;

pub use chat_handler::ChatHandler;
pub use meal_planner::{format_meal_plan, MealPlanner};
