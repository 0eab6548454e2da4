use thiserror::Error;

/// Errors raised while fetching a page
#[derive(Error, Debug)]
pub enum FetchError {
    /// The URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Network or timeout failure from the HTTP client
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response looked like a bot-detection page
    #[error("Blocked by bot detection (status {status}): {reason}")]
    Blocked { status: u16, reason: String },

    /// Non-success status that was not classified as a block
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// Error parsing HTTP headers
    #[error("Header parse error: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    /// All attempts failed
    #[error("Fetch failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl FetchError {
    pub fn is_blocked(&self) -> bool {
        match self {
            FetchError::Blocked { .. } => true,
            FetchError::Exhausted { last, .. } => last.is_blocked(),
            _ => false,
        }
    }
}

/// Failure inside a single site scraper; always converted into a
/// zero-confidence result by the scraper itself
#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("Invalid selector '{0}'")]
    Selector(String),

    #[error("Malformed structured data: {0}")]
    StructuredData(String),

    #[error("No recipe found: {0}")]
    NotFound(String),
}

/// Failure of a single normalizer rule
#[derive(Error, Debug)]
pub enum NormalizationError {
    #[error("Rule '{rule}' could not be applied: {reason}")]
    Rule { rule: &'static str, reason: String },
}

/// The model's response could not be decoded as JSON by any repair tier
#[derive(Error, Debug)]
pub enum AiResponseParseError {
    #[error("Empty response from model")]
    Empty,

    #[error("Could not parse model response as JSON after {attempts} attempts")]
    AllAttemptsFailed { attempts: usize },
}

/// Errors from the generative-model fallback
#[derive(Error, Debug)]
pub enum AiError {
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Generation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error(transparent)]
    Parse(#[from] AiResponseParseError),

    #[error("Model reported no recipe: {0}")]
    NoRecipe(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// A candidate image was rejected; never fatal
#[derive(Error, Debug)]
pub enum ImageValidationError {
    #[error("Image request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected status {0}")]
    Status(u16),

    #[error("Content type '{0}' is not an image")]
    NotAnImage(String),

    #[error("Image too small: {size} bytes (min {min})")]
    TooSmall { size: u64, min: u64 },
}

/// Total pipeline failure, the only error surfaced to callers
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to fetch page: {0}")]
    Fetch(#[from] FetchError),

    #[error("Builder error: {0}")]
    Builder(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
