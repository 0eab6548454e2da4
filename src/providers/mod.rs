mod anthropic;
mod factory;
mod fake;
mod open_ai;

pub use anthropic::AnthropicGenerator;
pub use factory::GeneratorFactory;
pub use fake::FakeGenerator;
pub use open_ai::OpenAiGenerator;

use async_trait::async_trait;

use crate::error::AiError;

/// System message sent with every extraction prompt.
pub const SYSTEM_PROMPT: &str =
    "You extract structured recipe data from web pages. Answer with a single JSON object and nothing else.";

/// Extraction wants repeatable output, not creativity.
pub const EXTRACTION_TEMPERATURE: f32 = 0.1;

/// A generative model that turns a prompt into text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Get the provider name (e.g., "openai", "anthropic")
    fn provider_name(&self) -> &str;

    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, AiError>;
}

fn request_error(provider: &str, e: reqwest::Error) -> AiError {
    AiError::Generation(format!("{provider} request failed: {e}"))
}
