use anyhow::Result;
use std::sync::Arc;

use crate::models::{ChatMessage, ChatRole};
use crate::services::{format_conversation, ChatStore, TextGenerator};

pub const EMPTY_REPLY_MESSAGE: &str = "I apologize, but I am unable to provide a response at this time.";
pub const ERROR_REPLY_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

/// Chat titles are cut to this many characters of the first message.
const TITLE_MAX_CHARS: usize = 50;

pub struct ChatHandler {
    store: Arc<ChatStore>,
    generator: Arc<dyn TextGenerator>,
}

impl ChatHandler {
    pub fn new(store: Arc<ChatStore>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { store, generator }
    }

    /// Stores the user's message, asks the model with the whole history and
    /// stores the reply. Model failures become an apology message, not an error.
    pub async fn send_message(&self, chat_id: &str, content: &str) -> Result<ChatMessage> {
        log::info!("📨 INCOMING MESSAGE - Chat: {} | Content: '{}'", chat_id, content);

        self.ensure_chat_exists(chat_id, content).await?;
        self.store.add_message_to_chat(chat_id, ChatRole::User, content).await?;

        let history = self
            .store
            .get_chat(chat_id)
            .await?
            .map(|chat| chat.messages)
            .unwrap_or_default();
        let prompt = format_conversation(&history);

        let reply = match self.generator.generate(&prompt).await {
            Ok(text) if text.trim().is_empty() => {
                log::warn!("⚠️ Empty reply from model for chat {}", chat_id);
                EMPTY_REPLY_MESSAGE.to_string()
            }
            Ok(text) => text,
            Err(e) => {
                log::error!("❌ Failed to get reply for chat {}: {}", chat_id, e);
                ERROR_REPLY_MESSAGE.to_string()
            }
        };

        self.store_reply(chat_id, &reply).await
    }

    /// Describes a food photo and stores the description as the assistant reply.
    pub async fn send_food_image(&self, chat_id: &str, image_path: &str) -> Result<ChatMessage> {
        log::info!("📸 Food image for chat {}: {}", chat_id, image_path);

        let note = format!("[image: {}]", image_path);
        self.ensure_chat_exists(chat_id, "Food photo").await?;
        self.store.add_message_to_chat(chat_id, ChatRole::User, &note).await?;

        let reply = match self.generator.analyze_food_image(image_path).await {
            Ok(description) => description,
            Err(e) => {
                log::error!("❌ Failed to analyze image {}: {}", image_path, e);
                format!("Error analyzing image: {}", e)
            }
        };

        self.store_reply(chat_id, &reply).await
    }

    async fn ensure_chat_exists(&self, chat_id: &str, first_message: &str) -> Result<()> {
        if self.store.get_chat(chat_id).await?.is_none() {
            let title: String = first_message.trim().chars().take(TITLE_MAX_CHARS).collect();
            self.store.save_chat(chat_id, &title).await?;
        }
        Ok(())
    }

    async fn store_reply(&self, chat_id: &str, reply: &str) -> Result<ChatMessage> {
        self.store
            .add_message_to_chat(chat_id, ChatRole::Assistant, reply)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Chat {} disappeared while answering", chat_id))
    }
}
