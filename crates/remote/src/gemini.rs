use std::env;
use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::{json, Value};
use tracing::{debug, warn};

use raksha_core::{GenerationError, TextGenerator};

use crate::{build_http_client, endpoint, env_seconds, transport_message, RemoteError};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_CHAT_TIMEOUT: Duration = Duration::from_secs(15);

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            timeout: DEFAULT_CHAT_TIMEOUT,
        }
    }

    /// `None` when `RAKSHA_GEMINI_API_KEY` is unset or blank.
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("RAKSHA_GEMINI_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty())?;
        let model = env::var("RAKSHA_GEMINI_MODEL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let base_url =
            env::var("RAKSHA_GEMINI_BASE_URL").unwrap_or_else(|_| GEMINI_BASE_URL.to_string());

        Some(Self {
            api_key,
            model,
            base_url,
            timeout: env_seconds("RAKSHA_CHAT_TIMEOUT_SECONDS", DEFAULT_CHAT_TIMEOUT),
        })
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, RemoteError> {
        Ok(Self {
            http: build_http_client(config.timeout)?,
            config,
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// The key travels in a header, never in this URL.
    pub fn generate_url(&self) -> Result<Url, RemoteError> {
        endpoint(
            &self.config.base_url,
            &format!("models/{}:generateContent", self.config.model),
            &[],
        )
    }

    async fn call(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = self
            .generate_url()
            .map_err(|err| GenerationError::Transport(err.to_string()))?;

        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&request_body(prompt))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "gemini returned non-success status");
            return Err(GenerationError::Status {
                code: status.as_u16(),
            });
        }

        let body: Value = response.json().await.map_err(transport_error)?;
        debug!(model = %self.config.model, "gemini response received");
        extract_candidate_text(&body).ok_or(GenerationError::Empty)
    }
}

impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.call(prompt).await
    }
}

fn transport_error(err: reqwest::Error) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout
    } else {
        GenerationError::Transport(transport_message(err))
    }
}

/// `generateContent` payload for a single user prompt.
pub fn request_body(prompt: &str) -> Value {
    json!({
        "contents": [
            { "parts": [ { "text": prompt } ] }
        ],
        "generationConfig": {
            "temperature": 0.9,
            "topK": 40,
            "topP": 0.95,
            "maxOutputTokens": 2048
        }
    })
}

/// Text of the first part of the first candidate.
pub fn extract_candidate_text(payload: &Value) -> Option<String> {
    payload
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?
        .first()?
        .get("text")?
        .as_str()
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_generation_config() {
        let body = request_body("What is the capital of France?");
        assert_eq!(
            body["contents"][0]["parts"][0]["text"],
            "What is the capital of France?"
        );
        assert_eq!(body["generationConfig"]["temperature"], 0.9);
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["topP"], 0.95);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn extracts_first_candidate_part() {
        let payload = json!({
            "candidates": [
                { "content": { "parts": [ { "text": "Paris." }, { "text": "ignored" } ] } },
                { "content": { "parts": [ { "text": "second" } ] } }
            ]
        });
        assert_eq!(extract_candidate_text(&payload).as_deref(), Some("Paris."));
    }

    #[test]
    fn missing_or_blank_text_is_none() {
        assert_eq!(extract_candidate_text(&json!({})), None);
        assert_eq!(extract_candidate_text(&json!({ "candidates": [] })), None);
        assert_eq!(
            extract_candidate_text(&json!({
                "candidates": [ { "content": { "parts": [ { "text": "  " } ] } } ]
            })),
            None
        );
    }

    #[test]
    fn url_carries_model_but_not_key() {
        let client = GeminiClient::new(GeminiConfig::new("SECRET-KEY-123")).unwrap();
        let url = client.generate_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(url.query().is_none());
    }

    #[tokio::test]
    async fn unreachable_service_is_transport_failure() {
        let mut config = GeminiConfig::new("SECRET-KEY-123");
        config.base_url = "http://127.0.0.1:9".to_string();
        config.timeout = Duration::from_secs(2);
        let client = GeminiClient::new(config).unwrap();

        let result = client.generate("hello?").await;
        assert!(
            matches!(
                result,
                Err(GenerationError::Transport(_)) | Err(GenerationError::Timeout)
            ),
            "{result:?}"
        );
        if let Err(GenerationError::Transport(message)) = result {
            assert!(!message.contains("SECRET-KEY-123"), "{message}");
            assert!(!message.contains("127.0.0.1"), "{message}");
        }
    }
}
