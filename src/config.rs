use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::fetchers::BrowserClass;

/// Main extractor configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExtractorConfig {
    /// Page fetching behaviour
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Recipe image resolution
    #[serde(default)]
    pub image: ImageConfig,
    /// Generative-model fallback
    #[serde(default)]
    pub ai: AiConfig,
    /// Orchestration thresholds
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Configuration for the retrying page fetcher
#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    /// Number of attempts before giving up
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Base delay between attempts in milliseconds (multiplied by attempt number)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Minimum time between any two requests issued by this process
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
    /// Pin the user agent to one browser family instead of rotating
    #[serde(default)]
    pub user_agent_class: Option<BrowserClass>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            min_request_interval_ms: default_min_request_interval_ms(),
            user_agent_class: None,
        }
    }
}

/// Configuration for the recipe image resolver
#[derive(Debug, Deserialize, Clone)]
pub struct ImageConfig {
    /// Whether images are resolved and validated at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Timeout for the fresh page fetch and HEAD probes
    #[serde(default = "default_image_timeout")]
    pub fetch_timeout_secs: u64,
    /// Attempts for the fresh page fetch
    #[serde(default = "default_image_retries")]
    pub fetch_retries: u32,
    /// Structured-data images narrower than this are rejected
    #[serde(default = "default_min_width")]
    pub min_width: u32,
    /// Declared content length below which an image is rejected
    #[serde(default = "default_min_bytes")]
    pub min_bytes: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fetch_timeout_secs: default_image_timeout(),
            fetch_retries: default_image_retries(),
            min_width: default_min_width(),
            min_bytes: default_min_bytes(),
        }
    }
}

/// Configuration for the generative-model fallback
#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    /// Whether the fallback may be used
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Provider name ("openai" or "anthropic")
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model identifier; provider default when absent
    pub model: Option<String>,
    /// API key (can also be set via the provider's environment variable)
    pub api_key: Option<String>,
    /// Base URL for API endpoint (for custom or proxy endpoints)
    pub base_url: Option<String>,
    /// Deadline for one generation call in seconds
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// How long AI results stay cached
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Characters of page content sent at the detailed level
    #[serde(default = "default_detailed_budget")]
    pub detailed_char_budget: usize,
    /// Characters of page content sent at the aggressive level
    #[serde(default = "default_aggressive_budget")]
    pub aggressive_char_budget: usize,
    /// Characters of page content sent by the minimal prompt
    #[serde(default = "default_minimal_budget")]
    pub minimal_char_budget: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: default_provider(),
            model: None,
            api_key: None,
            base_url: None,
            timeout_secs: default_ai_timeout(),
            max_tokens: default_max_tokens(),
            cache_ttl_secs: default_cache_ttl(),
            detailed_char_budget: default_detailed_budget(),
            aggressive_char_budget: default_aggressive_budget(),
            minimal_char_budget: default_minimal_budget(),
        }
    }
}

/// Thresholds used by the pipeline when choosing between stages
#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Below this confidence the generative fallback is invoked
    #[serde(default = "default_threshold")]
    pub ai_threshold: f64,
    /// Results at or above this confidence are written to the cache
    #[serde(default = "default_threshold")]
    pub cache_min_confidence: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ai_threshold: default_threshold(),
            cache_min_confidence: default_threshold(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_fetch_timeout() -> u64 {
    15
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_min_request_interval_ms() -> u64 {
    1000
}

fn default_image_timeout() -> u64 {
    8
}

fn default_image_retries() -> u32 {
    2
}

fn default_min_width() -> u32 {
    400
}

fn default_min_bytes() -> u64 {
    15 * 1024
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_ai_timeout() -> u64 {
    90
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_cache_ttl() -> u64 {
    7 * 24 * 60 * 60
}

fn default_detailed_budget() -> usize {
    12_000
}

fn default_aggressive_budget() -> usize {
    20_000
}

fn default_minimal_budget() -> usize {
    5_000
}

fn default_threshold() -> f64 {
    0.6
}

impl ExtractorConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with RECIPE_EXTRACT__ prefix
    /// 2. recipe-extract.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: RECIPE_EXTRACT__FETCH__RETRIES
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }
}

/// Load configuration from file and environment variables
pub fn load_config() -> Result<ExtractorConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("recipe-extract").required(false))
        // Use double underscore for nested: RECIPE_EXTRACT__AI__PROVIDER
        .add_source(
            Environment::with_prefix("RECIPE_EXTRACT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
