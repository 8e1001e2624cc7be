//! Groq chat-completion API (OpenAI compatible).
//!
//! - `GROQ_API_KEY`: API key; recommendations fail with `401` without it
//! - `GROQ_BASE_URL`: Default `https://api.groq.com/openai/v1`
//! - `GROQ_MODEL`: Default `llama-3.3-70b-versatile`
//! - `GROQ_TIMEOUT_MS`: Default 30000

use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct GroqConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl GroqConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
            base_url: env::var("GROQ_BASE_URL")
                .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            model: env::var("GROQ_MODEL")
                .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string()),
            timeout: Duration::from_millis(
                env::var("GROQ_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30_000),
            ),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}
