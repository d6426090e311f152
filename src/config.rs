use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub api_url: String,
    pub model: String,
    pub vision_model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:11434".to_string(),
            model: "qwen2.5:0.5b".to_string(),
            vision_model: "llava".to_string(),
            max_tokens: 4000,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ollama: OllamaConfig,
    pub data_dir: PathBuf,
    pub server_addr: String,
}

impl AppConfig {
    /// Reads configuration from the process environment (call `dotenv` first).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = OllamaConfig::default();

        let ollama = OllamaConfig {
            api_url: lookup("OLLAMA_API_URL").unwrap_or(defaults.api_url),
            model: lookup("OLLAMA_MODEL").unwrap_or(defaults.model),
            vision_model: lookup("OLLAMA_VISION_MODEL").unwrap_or(defaults.vision_model),
            max_tokens: parse_var(&lookup, "OLLAMA_MAX_TOKENS", defaults.max_tokens)?,
            timeout_secs: parse_var(&lookup, "OLLAMA_TIMEOUT_SECS", defaults.timeout_secs)?,
        };

        Ok(Self {
            ollama,
            data_dir: lookup("DATA_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./data")),
            server_addr: lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} must be a number, got '{}'", key, raw)),
        None => Ok(default),
    }
}
