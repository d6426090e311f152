use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{Chat, ChatMessage, ChatRole, Meal, MealPlan, NutritionTotals};

pub const CHAT_STORAGE_KEY: &str = "ai-nutrition-chats";

/// Only this many chats survive a `save_chat`.
pub const MAX_RECENT_CHATS: usize = 10;

/// Chat history kept in a single JSON file, newest chat first.
pub struct ChatStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ChatStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(format!("{}.json", CHAT_STORAGE_KEY)),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get_chats(&self) -> Result<Vec<Chat>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    pub async fn get_chat(&self, chat_id: &str) -> Result<Option<Chat>> {
        let chats = self.get_chats().await?;
        Ok(chats.into_iter().find(|chat| chat.id == chat_id))
    }

    /// Creates or renames a chat. New chats go to the front and only the
    /// [`MAX_RECENT_CHATS`] first chats are kept.
    pub async fn save_chat(&self, chat_id: &str, title: &str) -> Result<Vec<Chat>> {
        let _guard = self.lock.lock().await;
        let mut chats = self.load().await?;
        let now = Utc::now();

        match chats.iter_mut().find(|chat| chat.id == chat_id) {
            Some(existing) => {
                existing.title = title.to_string();
                existing.updated_at = now;
            }
            None => {
                log::info!("💬 New chat created: {}", chat_id);
                chats.insert(
                    0,
                    Chat {
                        id: chat_id.to_string(),
                        title: title.to_string(),
                        messages: Vec::new(),
                        timestamp: now,
                        updated_at: now,
                        meal_plan: None,
                    },
                );
            }
        }

        chats.truncate(MAX_RECENT_CHATS);
        self.persist(&chats).await?;
        Ok(chats)
    }

    /// Appends a message; `None` when the chat does not exist.
    pub async fn add_message_to_chat(
        &self,
        chat_id: &str,
        role: ChatRole,
        content: &str,
    ) -> Result<Option<ChatMessage>> {
        let _guard = self.lock.lock().await;
        let mut chats = self.load().await?;

        let Some(chat) = chats.iter_mut().find(|chat| chat.id == chat_id) else {
            log::warn!("⚠️ Message for unknown chat {} dropped", chat_id);
            return Ok(None);
        };

        let message = ChatMessage {
            id: Uuid::new_v4(),
            content: content.to_string(),
            role,
            timestamp: Utc::now(),
            meal_plan: None,
        };
        chat.messages.push(message.clone());
        chat.updated_at = message.timestamp;

        self.persist(&chats).await?;
        Ok(Some(message))
    }

    pub async fn delete_chat(&self, chat_id: &str) -> Result<Vec<Chat>> {
        let _guard = self.lock.lock().await;
        let mut chats = self.load().await?;

        chats.retain(|chat| chat.id != chat_id);

        self.persist(&chats).await?;
        Ok(chats)
    }

    /// Attaches a meal plan (with a fresh id) to a chat; `None` when the chat does not exist.
    pub async fn save_meal_plan_to_chat(
        &self,
        chat_id: &str,
        meals: Vec<Meal>,
        total: NutritionTotals,
    ) -> Result<Option<MealPlan>> {
        let _guard = self.lock.lock().await;
        let mut chats = self.load().await?;

        let Some(chat) = chats.iter_mut().find(|chat| chat.id == chat_id) else {
            return Ok(None);
        };

        let plan = MealPlan {
            id: Uuid::new_v4(),
            meals,
            total,
        };
        chat.meal_plan = Some(plan.clone());
        chat.updated_at = Utc::now();

        self.persist(&chats).await?;
        log::info!("🥗 Meal plan {} saved to chat {}", plan.id, chat_id);
        Ok(Some(plan))
    }

    pub async fn get_meal_plan_from_chat(&self, chat_id: &str) -> Result<Option<MealPlan>> {
        Ok(self.get_chat(chat_id).await?.and_then(|chat| chat.meal_plan))
    }

    async fn load(&self) -> Result<Vec<Chat>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw)
            .with_context(|| format!("corrupt chat storage file {}", self.path.display()))
    }

    async fn persist(&self, chats: &[Chat]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let json = serde_json::to_string_pretty(chats)?;
        tokio::fs::write(&self.path, json).await?;
        log::debug!("💾 Stored {} chats in {}", chats.len(), self.path.display());
        Ok(())
    }
}
