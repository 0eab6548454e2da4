use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};

use super::{request_error, TextGenerator, EXTRACTION_TEMPERATURE, SYSTEM_PROMPT};
use crate::config::AiConfig;
use crate::error::AiError;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicGenerator {
    /// Create a generator from configuration
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| {
                AiError::NotConfigured(
                    "ANTHROPIC_API_KEY not found in config or environment".to_string(),
                )
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
            client: Client::builder().build().unwrap_or_else(|_| Client::new()),
            api_key,
            base_url,
            model,
        }
    }
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, AiError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&json!({
                "model": self.model,
                "max_tokens": max_tokens,
                "temperature": EXTRACTION_TEMPERATURE,
                "system": SYSTEM_PROMPT,
                "messages": [
                    {
                        "role": "user",
                        "content": prompt
                    }
                ]
            }))
            .send()
            .await
            .map_err(|e| request_error("anthropic", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiError::Generation(format!("anthropic returned status {status}")));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| request_error("anthropic", e))?;
        debug!("{:?}", response_body);

        response_body["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                AiError::Generation("Failed to extract content from Anthropic response".to_string())
            })
    }
}
