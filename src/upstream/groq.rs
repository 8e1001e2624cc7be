//! Client for Groq's OpenAI-compatible chat-completion API.

use progres_config::GroqConfig;
use progres_core::AppError;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument, warn};

use crate::metrics::track_upstream_error;

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 2048;

#[derive(Clone, Debug)]
pub struct GroqClient {
    http: Client,
    config: GroqConfig,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

impl GroqClient {
    pub fn new(config: &GroqConfig) -> Result<Self, AppError> {
        if !config.is_configured() {
            warn!("Groq API key is not configured. AI recommendations will not work.");
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AppError::internal)?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Sends one system + user exchange and returns the assistant's content.
    ///
    /// The model is asked for a JSON object.
    #[instrument(skip_all, fields(model = %self.config.model))]
    pub async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AppError> {
        if !self.is_configured() {
            return Err(AppError::service_unavailable(
                "AI recommendations are not configured".to_string(),
            ));
        }

        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Error calling Groq API");
                track_upstream_error("groq");
                AppError::internal_error(format!("Failed to get AI recommendation: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Groq API error");
            track_upstream_error("groq");
            return Err(match status {
                StatusCode::UNAUTHORIZED => {
                    AppError::unauthorized("Invalid Groq API key".to_string())
                }
                StatusCode::TOO_MANY_REQUESTS => AppError::too_many_requests(
                    "Groq API rate limit exceeded. Please try again later.".to_string(),
                ),
                other => AppError::internal_error(format!(
                    "Failed to get AI recommendation: {}",
                    other
                )),
            });
        }

        let completion: ChatCompletion = response.json().await.map_err(|e| {
            error!(error = %e, "Unreadable Groq API response");
            AppError::internal_error("Invalid response from Groq API".to_string())
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::internal_error("Invalid response from Groq API".to_string()))
    }
}
