mod api; // HTTP API for the chat UI
mod config;
mod handlers;
mod models;
mod services;

#[cfg(feature = "http-server")]
use api::server::create_router;

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::env;
use std::sync::Arc;
use uuid::Uuid;

use api::AppState;
use config::AppConfig;
use handlers::{format_meal_plan, ChatHandler, MealPlanner};
use models::{MealPlan, UserProfile};
use services::{ChatStore, OllamaService, TextGenerator};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Load environment variables
    dotenv().ok();

    let config = AppConfig::from_env()?;
    let args: Vec<String> = env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("parse") => {
            let path = args.get(1).context("usage: nutrition-assistant parse <response.txt>")?;
            return parse_saved_response(path);
        }
        Some("plan") => {
            let path = args.get(1).context("usage: nutrition-assistant plan <profile.json>")?;
            return generate_plan(&config, path).await;
        }
        Some("image") => {
            let path = args.get(1).context("usage: nutrition-assistant image <photo.jpg>")?;
            return analyze_image(&config, path).await;
        }
        Some(other) if other != "serve" => {
            anyhow::bail!("unknown command '{}' (expected serve, parse, plan or image)", other);
        }
        _ => {}
    }

    serve(config).await
}

/// Parses a model response saved to disk and prints the resulting plan.
fn parse_saved_response(path: &str) -> Result<()> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;
    let parsed = services::parse_meal_plan_response(&text);

    let plan = MealPlan {
        id: Uuid::new_v4(),
        meals: parsed.meals,
        total: parsed.total,
    };
    println!("{}", format_meal_plan(&plan));
    Ok(())
}

async fn generate_plan(config: &AppConfig, path: &str) -> Result<()> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;
    let profile: UserProfile = serde_json::from_str(&raw).context("invalid profile JSON")?;

    let store = Arc::new(ChatStore::new(&config.data_dir));
    let ollama = Arc::new(OllamaService::new(&config.ollama)?);
    let planner = MealPlanner::new(store, ollama);

    let plan = planner.generate(None, &profile).await?;
    println!("{}", format_meal_plan(&plan));
    Ok(())
}

async fn analyze_image(config: &AppConfig, path: &str) -> Result<()> {
    let store = Arc::new(ChatStore::new(&config.data_dir));
    let ollama = Arc::new(OllamaService::new(&config.ollama)?);
    let handler = ChatHandler::new(store, ollama);

    let chat_id = Uuid::new_v4().to_string();
    let reply = handler.send_food_image(&chat_id, path).await?;
    println!("{}", reply.content);
    Ok(())
}

async fn serve(config: AppConfig) -> Result<()> {
    log::info!("🚀 Starting AI Nutrition Assistant...");

    let store = Arc::new(ChatStore::new(&config.data_dir));
    log::info!("✅ Chat storage at {}", store.path().display());

    let ollama = Arc::new(OllamaService::new(&config.ollama)?);
    log::info!("✅ Ollama service initialized with model: {} ({})", ollama.model(), config.ollama.api_url);
    let generator = ollama as Arc<dyn TextGenerator>;

    let state = Arc::new(AppState {
        store: store.clone(),
        chat_handler: Arc::new(ChatHandler::new(store.clone(), generator.clone())),
        meal_planner: Arc::new(MealPlanner::new(store, generator)),
    });
    log::info!("✅ Chat and meal plan handlers initialized");

    #[cfg(feature = "http-server")]
    {
        let app = create_router(state);
        let listener = tokio::net::TcpListener::bind(&config.server_addr)
            .await
            .with_context(|| format!("failed to bind {}", config.server_addr))?;

        log::info!("🌐 HTTP server listening on {}", config.server_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("❌ HTTP server stopped: {}", e);
            }
        });
    }

    #[cfg(not(feature = "http-server"))]
    {
        let _ = state;
        log::warn!("⚠️ Built without the http-server feature, nothing to serve");
    }

    log::info!("🎉 Assistant is ready! Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    log::info!("🛑 Shutting down...");

    Ok(())
}
