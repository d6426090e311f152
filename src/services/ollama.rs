use anyhow::Result;
use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::config::OllamaConfig;
use crate::models::ChatMessage;

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
    repeat_last_n: u32,
    repeat_penalty: f32,
    top_k: u32,
    top_p: f32,
    num_ctx: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Anything that turns a prompt into text (Ollama, or a stub in tests).
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Describe a food photo. Default implementation reports the feature as unsupported.
    async fn analyze_food_image(&self, image_path: &str) -> Result<String> {
        anyhow::bail!("image analysis not supported (image: {})", image_path)
    }
}

pub struct OllamaService {
    base_url: String,
    model: String,
    vision_model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OllamaService {
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            vision_model: config.vision_model.clone(),
            max_tokens: config.max_tokens,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, request: &GenerateRequest) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        log::info!("🤖 Sending request to Ollama with model: {}", request.model);
        log::debug!("📤 Prompt size: {} bytes", request.prompt.len());

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        log::debug!("📥 Ollama response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await?;
            log::error!("❌ Ollama API error ({}): {}", status, error_text);
            anyhow::bail!("Ollama API error ({}): {}", status, error_text);
        }

        let body: GenerateResponse = response.json().await?;
        log::debug!("📄 Ollama response size: {} bytes", body.response.len());

        Ok(body.response)
    }
}

#[async_trait::async_trait]
impl TextGenerator for OllamaService {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            images: None,
            options: Some(GenerateOptions {
                temperature: 0.7,
                num_predict: self.max_tokens,
                repeat_last_n: 0,
                repeat_penalty: 1.1,
                top_k: 40,
                top_p: 0.9,
                num_ctx: 4096,
            }),
        };

        self.send(&request).await
    }

    async fn analyze_food_image(&self, image_path: &str) -> Result<String> {
        log::debug!("📸 Starting image analysis for: {}", image_path);

        let image_data = fs::read(image_path)?;
        let base64_image = general_purpose::STANDARD.encode(&image_data);
        log::debug!("📊 Image file size: {} bytes", image_data.len());

        let request = GenerateRequest {
            model: self.vision_model.clone(),
            prompt: "Describe this food item in detail, including estimated calories and nutritional information:"
                .to_string(),
            stream: false,
            images: Some(vec![base64_image]),
            options: None,
        };

        let description = self.send(&request).await?;
        if description.trim().is_empty() {
            return Ok("I couldn't analyze the image.".to_string());
        }

        Ok(description)
    }
}

/// Flattens a chat history into a single completion prompt:
/// `USER: ...` / `ASSISTANT: ...` blocks followed by an open `ASSISTANT: ` turn.
pub fn format_conversation(messages: &[ChatMessage]) -> String {
    let mut prompt = String::new();

    for message in messages {
        prompt.push_str(&format!(
            "{}: {}\n\n",
            message.role.to_string().to_uppercase(),
            message.content
        ));
    }

    prompt.push_str("ASSISTANT: ");
    prompt
}
