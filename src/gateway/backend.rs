use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use thiserror::Error;

/// Transport-level failure of a backend call. Mapping into the client-facing
/// taxonomy happens in `classifier`; this type may carry raw provider text.
#[derive(Debug, Error)]
pub enum BackendCallError {
    #[error("backend request timed out after {0}ms")]
    Timeout(u64),
    #[error("backend transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned status {status}: {body}")]
    Api { status: u16, body: String },
}

/// Grounding augmentation tools an action may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundingTool {
    WebSearch,
    MapSearch,
}

/// Per-call generation options assembled by the dispatcher.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateOptions {
    pub thinking_budget: Option<u32>,
    pub tools: Vec<GroundingTool>,
}

/// One-operation generative backend. The returned value is the raw response
/// body; its shape must be treated as untrusted and possibly partial.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        contents: &str,
        options: &GenerateOptions,
    ) -> Result<Value, BackendCallError>;
}

/// Gemini `generateContent` REST client with a bounded per-request timeout.
pub struct GeminiBackend {
    client: Client,
    endpoint: String,
    api_key: String,
    timeout_ms: u64,
}

impl GeminiBackend {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            client: Client::builder()
                .pool_idle_timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client must build"),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout_ms,
        }
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate(
        &self,
        model: &str,
        contents: &str,
        options: &GenerateOptions,
    ) -> Result<Value, BackendCallError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            model
        );

        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": contents }] }],
        });

        if let Some(budget) = options.thinking_budget {
            body["generationConfig"] = json!({ "thinkingConfig": { "thinkingBudget": budget } });
        }

        if !options.tools.is_empty() {
            let tools = options
                .tools
                .iter()
                .map(|tool| match tool {
                    GroundingTool::WebSearch => json!({ "googleSearch": {} }),
                    GroundingTool::MapSearch => json!({ "googleMaps": {} }),
                })
                .collect::<Vec<_>>();
            body["tools"] = Value::Array(tools);
        }

        let response = self
            .client
            .post(url)
            .timeout(Duration::from_millis(self.timeout_ms))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    BackendCallError::Timeout(self.timeout_ms)
                } else {
                    BackendCallError::Transport(err)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendCallError::Api {
                status: status.as_u16(),
                // Enough provider text for classification and logs.
                body: body.chars().take(240).collect(),
            });
        }

        response.json::<Value>().await.map_err(BackendCallError::from)
    }
}
