use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::handlers::{ChatHandler, MealPlanner};
use crate::models::UserProfile;
use crate::services::ChatStore;

/// Body of `POST /api/meal-plan/parse`: the `response` field of an Ollama reply.
#[derive(Debug, Deserialize, Serialize)]
pub struct ParseRequest {
    #[serde(default)]
    pub response: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MealPlanRequest {
    #[serde(default)]
    pub chat_id: Option<String>,
    pub profile: UserProfile,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SendMessageRequest {
    pub content: String,
}

pub struct AppState {
    pub store: Arc<ChatStore>,
    pub chat_handler: Arc<ChatHandler>,
    pub meal_planner: Arc<MealPlanner>,
}

// Axum integration (optional - requires axum dependency)
#[cfg(feature = "http-server")]
pub mod server {
    use super::*;
    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use tower_http::cors::CorsLayer;

    use crate::services::parse_meal_plan;

    pub fn create_router(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_check))
            .route("/api/meal-plan", post(generate_meal_plan))
            .route("/api/meal-plan/parse", post(parse_meal_plan_handler))
            .route("/api/chats", get(list_chats))
            .route("/api/chats/:id", get(get_chat).delete(delete_chat))
            .route("/api/chats/:id/messages", post(send_message))
            .route("/api/chats/:id/meal-plan", get(get_chat_meal_plan))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    async fn parse_meal_plan_handler(Json(request): Json<ParseRequest>) -> impl IntoResponse {
        let meals = parse_meal_plan(&request.response);
        (StatusCode::OK, Json(meals))
    }

    async fn generate_meal_plan(
        State(state): State<Arc<AppState>>,
        Json(request): Json<MealPlanRequest>,
    ) -> Result<impl IntoResponse, (StatusCode, String)> {
        if let Err(e) = request.profile.validate() {
            log::warn!("⚠️ Invalid profile: {}", e);
            return Err((StatusCode::UNPROCESSABLE_ENTITY, e.to_string()));
        }

        let plan = state
            .meal_planner
            .generate(request.chat_id.as_deref(), &request.profile)
            .await
            .map_err(|e| {
                log::error!("❌ Failed to generate meal plan: {}", e);
                (StatusCode::BAD_GATEWAY, "Failed to generate meal plan".to_string())
            })?;

        Ok((StatusCode::OK, Json(plan)))
    }

    async fn list_chats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, StatusCode> {
        let chats = state.store.get_chats().await.map_err(|e| {
            log::error!("Failed to load chats: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

        Ok((StatusCode::OK, Json(chats)))
    }

    async fn get_chat(
        Path(id): Path<String>,
        State(state): State<Arc<AppState>>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let chat = state.store.get_chat(&id).await.map_err(|e| {
            log::error!("Failed to load chat {}: {}", id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

        chat.map(|chat| (StatusCode::OK, Json(chat)))
            .ok_or(StatusCode::NOT_FOUND)
    }

    async fn delete_chat(
        Path(id): Path<String>,
        State(state): State<Arc<AppState>>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let chats = state.store.delete_chat(&id).await.map_err(|e| {
            log::error!("Failed to delete chat {}: {}", id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

        Ok((StatusCode::OK, Json(chats)))
    }

    async fn get_chat_meal_plan(
        Path(id): Path<String>,
        State(state): State<Arc<AppState>>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let plan = state.store.get_meal_plan_from_chat(&id).await.map_err(|e| {
            log::error!("Failed to load meal plan for chat {}: {}", id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

        plan.map(|plan| (StatusCode::OK, Json(plan)))
            .ok_or(StatusCode::NOT_FOUND)
    }

    async fn send_message(
        Path(id): Path<String>,
        State(state): State<Arc<AppState>>,
        Json(request): Json<SendMessageRequest>,
    ) -> Result<impl IntoResponse, StatusCode> {
        if request.content.trim().is_empty() {
            return Err(StatusCode::BAD_REQUEST);
        }

        let reply = state
            .chat_handler
            .send_message(&id, &request.content)
            .await
            .map_err(|e| {
                log::error!("Failed to handle message for chat {}: {}", id, e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;

        Ok((StatusCode::OK, Json(reply)))
    }

    async fn root_handler() -> &'static str {
        "AI Nutrition Assistant API - POST /api/meal-plan to generate a meal plan"
    }

    async fn health_check() -> &'static str {
        "OK"
    }
}
