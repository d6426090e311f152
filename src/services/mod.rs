pub mod chat_storage; // JSON file chat history
pub mod meal_parser;
pub mod ollama; // Local Ollama text generation

pub use chat_storage::ChatStore;
pub use meal_parser::{parse_meal_plan, parse_meal_plan_response};
pub use ollama::{format_conversation, OllamaService, TextGenerator};
