use anyhow::Result;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{MealPlan, UserProfile};
use crate::services::{parse_meal_plan_response, ChatStore, TextGenerator};

pub struct MealPlanner {
    store: Arc<ChatStore>,
    generator: Arc<dyn TextGenerator>,
}

impl MealPlanner {
    pub fn new(store: Arc<ChatStore>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { store, generator }
    }

    pub fn build_prompt(profile: &UserProfile) -> String {
        let restrictions = profile
            .dietary_restrictions
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or("None");

        format!(
            "You are a nutrition expert. Create a personalized meal plan based on these details:\n\
             - Age: {}\n\
             - Gender: {}\n\
             - Weight: {} kg\n\
             - Height: {} cm\n\
             - Goal: {}\n\
             - Activity Level: {}\n\
             - Dietary Restrictions: {}\n\
             \n\
             IMPORTANT: Please provide a meal plan with Breakfast, Lunch, and Dinner. For EACH meal, include EXACTLY 3 food items.\n\
             \n\
             Format your response like this:\n\
             \n\
             Breakfast\n• Item 1\n• Item 2\n• Item 3\n\
             \n\
             Lunch\n• Item 1\n• Item 2\n• Item 3\n\
             \n\
             Dinner\n• Item 1\n• Item 2\n• Item 3",
            profile.age,
            profile.gender,
            profile.weight_kg,
            profile.height_cm,
            profile.goal,
            profile.activity_level,
            restrictions,
        )
    }

    /// Asks the model for a plan and parses it. When `chat_id` names an
    /// existing chat the plan is stored on it.
    pub async fn generate(&self, chat_id: Option<&str>, profile: &UserProfile) -> Result<MealPlan> {
        profile.validate()?;

        let prompt = Self::build_prompt(profile);
        log::info!("🥗 Generating meal plan (goal: {}, activity: {})", profile.goal, profile.activity_level);

        let response = self.generator.generate(&prompt).await?;
        log::debug!("📄 Raw meal plan response: {}", response);

        let parsed = parse_meal_plan_response(&response);
        log::info!("✅ Parsed {} meals from response", parsed.meals.len());

        if let Some(chat_id) = chat_id {
            if let Some(plan) = self
                .store
                .save_meal_plan_to_chat(chat_id, parsed.meals.clone(), parsed.total)
                .await?
            {
                return Ok(plan);
            }
            log::warn!("⚠️ Chat {} not found, meal plan not saved", chat_id);
        }

        Ok(MealPlan {
            id: Uuid::new_v4(),
            meals: parsed.meals,
            total: parsed.total,
        })
    }
}

/// Plain-text rendering of a plan for terminals and logs.
pub fn format_meal_plan(plan: &MealPlan) -> String {
    let mut out = String::from("🥗 Meal Plan\n");

    for meal in &plan.meals {
        out.push_str(&format!(
            "\n{}\n  {}\n  🔥 {} kcal | P {}g | C {}g | F {}g\n",
            meal.name, meal.description, meal.calories, meal.protein, meal.carbs, meal.fat
        ));
    }

    if plan.total.calories > 0 {
        out.push_str(&format!(
            "\nTotal: {} kcal | P {}g | C {}g | F {}g\n",
            plan.total.calories, plan.total.protein, plan.total.carbs, plan.total.fat
        ));
    }

    out
}
