use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// One eating occasion of a generated meal plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    pub name: String,
    pub items: Vec<String>,
    pub description: String,
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
}

impl Meal {
    pub fn new(name: impl Into<String>, items: Vec<String>) -> Self {
        let description = items.join(", ");
        Self {
            name: name.into(),
            items,
            description,
            calories: 0,
            protein: 0,
            carbs: 0,
            fat: 0,
        }
    }
}

/// Whole-day nutrition figures as reported by the model (all zero if absent).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutritionTotals {
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: Uuid,
    pub meals: Vec<Meal>,
    pub total: NutritionTotals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub content: String,
    pub role: ChatRole,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_plan: Option<MealPlan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    /// Creation time, kept when the chat is saved again.
    pub timestamp: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_plan: Option<MealPlan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        };
        write!(f, "{}", s)
    }
}

impl Gender {
    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Some(Gender::Male),
            "female" | "f" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    WeightLoss,
    MuscleGain,
    Maintenance,
    ImproveHealth,
}

impl std::fmt::Display for Goal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Goal::WeightLoss => "weight_loss",
            Goal::MuscleGain => "muscle_gain",
            Goal::Maintenance => "maintenance",
            Goal::ImproveHealth => "improve_health",
        };
        write!(f, "{}", s)
    }
}

impl Goal {
    pub fn from_string(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");

        match normalized.as_str() {
            "weight_loss" | "lose_weight" => Some(Goal::WeightLoss),
            "muscle_gain" | "gain_muscle" => Some(Goal::MuscleGain),
            "maintenance" | "maintain" => Some(Goal::Maintenance),
            "improve_health" | "health" => Some(Goal::ImproveHealth),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,  // little or no exercise
    Light,      // 1-3 days/week
    Moderate,   // 3-5 days/week
    Active,     // 6-7 days/week
    VeryActive, // hard exercise daily
}

impl std::fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
            ActivityLevel::VeryActive => "very_active",
        };
        write!(f, "{}", s)
    }
}

impl ActivityLevel {
    pub fn from_string(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");

        match normalized.as_str() {
            "sedentary" => Some(ActivityLevel::Sedentary),
            "light" => Some(ActivityLevel::Light),
            "moderate" => Some(ActivityLevel::Moderate),
            "active" => Some(ActivityLevel::Active),
            "very_active" => Some(ActivityLevel::VeryActive),
            _ => None,
        }
    }
}

/// Inputs of the meal plan form. Enum fields accept the form's labels
/// ("Weight Loss", "very active") as well as the snake_case names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub age: u32,
    #[serde(deserialize_with = "deserialize_gender")]
    pub gender: Gender,
    pub weight_kg: f64,
    pub height_cm: f64,
    #[serde(deserialize_with = "deserialize_goal")]
    pub goal: Goal,
    #[serde(deserialize_with = "deserialize_activity_level")]
    pub activity_level: ActivityLevel,
    #[serde(default)]
    pub dietary_restrictions: Option<String>,
}

impl UserProfile {
    /// Rejects values outside the ranges the meal plan form accepts.
    pub fn validate(&self) -> Result<()> {
        if !(1..=120).contains(&self.age) {
            anyhow::bail!("age must be between 1 and 120, got {}", self.age);
        }
        if !(30.0..=300.0).contains(&self.weight_kg) {
            anyhow::bail!("weight must be between 30 and 300 kg, got {}", self.weight_kg);
        }
        if !(100.0..=250.0).contains(&self.height_cm) {
            anyhow::bail!("height must be between 100 and 250 cm, got {}", self.height_cm);
        }
        Ok(())
    }
}

fn deserialize_gender<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Gender, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Gender::from_string(&raw).ok_or_else(|| serde::de::Error::custom(format!("unknown gender '{}'", raw)))
}

fn deserialize_goal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Goal, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Goal::from_string(&raw).ok_or_else(|| serde::de::Error::custom(format!("unknown goal '{}'", raw)))
}

fn deserialize_activity_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ActivityLevel, D::Error> {
    let raw = String::deserialize(deserializer)?;
    ActivityLevel::from_string(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unknown activity level '{}'", raw)))
}
