use std::sync::Arc;

use super::{AnthropicGenerator, OpenAiGenerator, TextGenerator};
use crate::config::AiConfig;
use crate::error::AiError;

pub struct GeneratorFactory;

impl GeneratorFactory {
    /// Create the configured generator
    pub fn create(config: &AiConfig) -> Result<Arc<dyn TextGenerator>, AiError> {
        if !config.enabled {
            return Err(AiError::NotConfigured(
                "AI fallback is disabled in configuration".to_string(),
            ));
        }

        match config.provider.as_str() {
            "openai" => Ok(Arc::new(OpenAiGenerator::new(config)?)),
            "anthropic" => Ok(Arc::new(AnthropicGenerator::new(config)?)),
            other => Err(AiError::NotConfigured(format!("Unknown provider: {other}"))),
        }
    }

    /// List all available provider names
    pub fn available_providers() -> Vec<&'static str> {
        vec!["openai", "anthropic"]
    }
}
