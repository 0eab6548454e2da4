//! Layered recipe extraction from arbitrary recipe web pages.
//!
//! A page goes through publisher scrapers, generic structured-data and
//! heuristic extractors, an optional generative-model fallback and finally
//! image resolution. Every stage degrades instead of failing; only a page
//! that cannot be fetched is an error.
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), recipe_extract::PipelineError> {
//! let result = recipe_extract::extract_recipe("https://example.com/best-chili").await?;
//! if let Some(recipe) = &result.recipe {
//!     println!("{} via {} ({:.2})", recipe.title, result.method, result.confidence);
//! }
//! # Ok(())
//! # }
//! ```

pub mod ai;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetchers;
pub mod images;
pub mod manager;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod providers;
pub mod scoring;
pub mod scrapers;
pub mod text;

pub use ai::{AiExtractor, AiOptions, FallbackLevel};
pub use cache::{MemoryCache, RecipeCache};
pub use config::{load_config, ExtractorConfig};
pub use error::{AiError, FetchError, PipelineError};
pub use fetchers::RequestFetcher;
pub use images::ImageResolver;
pub use manager::ScraperManager;
pub use model::{ExtractionMethod, ExtractionResult, RecipeDraft};
pub use normalizer::JsonLdNormalizer;
pub use pipeline::{ExtractionInput, RecipePipeline, RecipePipelineBuilder};
pub use providers::TextGenerator;

/// Fetch `url` and extract its recipe using configuration from
/// `recipe-extract.toml` and `RECIPE_EXTRACT__*` environment variables.
pub async fn extract_recipe(url: &str) -> Result<ExtractionResult, PipelineError> {
    let config = load_config()?;
    RecipePipeline::from_config(&config)?.extract_url(url).await
}

/// Like [`extract_recipe`], for HTML the caller already has.
pub async fn extract_recipe_from_html(
    url: &str,
    html: &str,
) -> Result<ExtractionResult, PipelineError> {
    let config = load_config()?;
    RecipePipeline::from_config(&config)?
        .extract_html(url, html)
        .await
}
