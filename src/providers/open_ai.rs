use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};

use super::{request_error, TextGenerator, EXTRACTION_TEMPERATURE, SYSTEM_PROMPT};
use crate::config::AiConfig;
use crate::error::AiError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiGenerator {
    /// Create a generator from configuration
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        // Try config first, then fall back to environment variable
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                AiError::NotConfigured("OPENAI_API_KEY not found in config or environment".to_string())
            })?;

        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            model,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, AiError> {
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": SYSTEM_PROMPT},
                    {"role": "user", "content": prompt}
                ],
                "temperature": EXTRACTION_TEMPERATURE,
                "max_tokens": max_tokens
            }))
            .send()
            .await
            .map_err(|e| request_error("openai", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiError::Generation(format!("openai returned status {status}")));
        }

        let response_body: Value = response.json().await.map_err(|e| request_error("openai", e))?;
        debug!("{:?}", response_body);

        response_body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AiError::Generation("Failed to extract content from response".to_string()))
    }
}
