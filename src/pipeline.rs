use log::{debug, info, warn};
use std::sync::Arc;

use crate::ai::AiExtractor;
use crate::cache::{cache_key, MemoryCache, RecipeCache};
use crate::config::{AiConfig, ExtractorConfig, FetchConfig, ImageConfig, PipelineConfig};
use crate::error::PipelineError;
use crate::fetchers::{RateLimiter, RequestFetcher};
use crate::images::ImageResolver;
use crate::manager::ScraperManager;
use crate::model::{ExtractionMethod, ExtractionResult};
use crate::providers::TextGenerator;
use crate::scoring::{calculate_confidence, IMAGE_BONUS};
use crate::scrapers::SiteScraper;

/// A page to extract from. When `html` is absent the page is fetched.
#[derive(Debug, Clone)]
pub struct ExtractionInput {
    pub url: String,
    pub html: Option<String>,
}

impl ExtractionInput {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: None,
        }
    }

    pub fn with_html(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: Some(html.into()),
        }
    }
}

/// Fetch, scrape, fall back to the model, then settle the image.
pub struct RecipePipeline {
    fetcher: Arc<RequestFetcher>,
    manager: ScraperManager,
    images: Option<ImageResolver>,
    cache: Option<Arc<dyn RecipeCache>>,
    config: PipelineConfig,
}

impl RecipePipeline {
    pub fn builder() -> RecipePipelineBuilder {
        RecipePipelineBuilder::default()
    }

    /// Pipeline wired from configuration. A generative provider that cannot
    /// be set up (for example a missing API key) is logged and skipped.
    pub fn from_config(config: &ExtractorConfig) -> Result<Self, PipelineError> {
        let mut builder = Self::builder()
            .fetch_config(config.fetch.clone())
            .image_config(config.image.clone())
            .pipeline_config(config.pipeline.clone())
            .cache(Arc::new(MemoryCache::new(config.ai.cache_ttl())));

        if config.ai.enabled {
            match AiExtractor::from_config(&config.ai) {
                Ok(ai) => builder = builder.ai(ai),
                Err(e) => warn!("Generative fallback disabled: {}", e),
            }
        }
        builder.build()
    }

    pub fn has_ai(&self) -> bool {
        self.manager.has_ai()
    }

    /// Extract a recipe from `input`.
    ///
    /// Only a failed fetch is an error. A page without a recipe yields a
    /// zero-confidence result whose issues list every attempt.
    pub async fn extract(&self, input: ExtractionInput) -> Result<ExtractionResult, PipelineError> {
        let url = input.url.as_str();
        let key = cache_key(url);

        if let Some(cache) = &self.cache {
            if let Some(recipe) = cache.get(&key).await {
                info!("Returning cached recipe for {}", url);
                let hostname = url::Url::parse(url)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_lowercase))
                    .unwrap_or_default();
                let confidence = calculate_confidence(&recipe, &ExtractionMethod::Cache, &hostname);
                return Ok(ExtractionResult::found(recipe, confidence, ExtractionMethod::Cache));
            }
        }

        let html = match input.html {
            Some(html) => html,
            None => self.fetcher.fetch(url).await?.data,
        };

        let result = self.manager.extract(url, &html).await;
        let result = self.settle_image(url, &html, result).await;

        if let (Some(cache), Some(recipe)) = (&self.cache, &result.recipe) {
            if recipe.is_usable() && result.confidence >= self.config.cache_min_confidence {
                debug!("Caching result for {} ({:.2})", url, result.confidence);
                cache.set(&key, recipe).await;
            }
        }

        Ok(result)
    }

    pub async fn extract_url(&self, url: &str) -> Result<ExtractionResult, PipelineError> {
        self.extract(ExtractionInput::url(url)).await
    }

    pub async fn extract_html(&self, url: &str, html: &str) -> Result<ExtractionResult, PipelineError> {
        self.extract(ExtractionInput::with_html(url, html)).await
    }

    /// Keep a working image, otherwise look for one. Never fails.
    async fn settle_image(&self, url: &str, html: &str, result: ExtractionResult) -> ExtractionResult {
        let Some(images) = &self.images else {
            return result;
        };
        let Some(mut recipe) = result.recipe.clone() else {
            return result;
        };

        if let Some(existing) = &recipe.image {
            if images.is_valid(existing).await {
                return result;
            }
        }

        let mut confidence = result.confidence;
        let mut issues = result.issues;
        let had_image = recipe.image.is_some();

        match images.resolve_image(url, Some(html)).await {
            Some(image) => {
                if !had_image {
                    confidence += IMAGE_BONUS;
                }
                recipe.image = Some(image);
            }
            None if had_image => {
                issues.push("Dropped image that failed validation".to_string());
                recipe.image = None;
                confidence -= IMAGE_BONUS;
            }
            None => {}
        }

        ExtractionResult {
            recipe: Some(recipe),
            confidence: confidence.clamp(0.0, 1.0),
            method: result.method,
            issues,
        }
    }
}

/// Builder for [`RecipePipeline`].
///
/// # Example
/// ```
/// use recipe_extract::RecipePipeline;
///
/// let pipeline = RecipePipeline::builder()
///     .without_images()
///     .ai_threshold(0.5)
///     .build()
///     .unwrap();
/// assert!(!pipeline.has_ai());
/// ```
#[derive(Default)]
pub struct RecipePipelineBuilder {
    fetch: Option<FetchConfig>,
    rate_limiter: Option<Arc<RateLimiter>>,
    image: Option<ImageConfig>,
    images_enabled: Option<bool>,
    pipeline: Option<PipelineConfig>,
    ai: Option<AiExtractor>,
    scrapers: Option<Vec<Box<dyn SiteScraper>>>,
    cache: Option<Arc<dyn RecipeCache>>,
}

impl RecipePipelineBuilder {
    pub fn fetch_config(mut self, config: FetchConfig) -> Self {
        self.fetch = Some(config);
        self
    }

    /// Use a private rate limiter instead of the process-wide one.
    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn image_config(mut self, config: ImageConfig) -> Self {
        self.image = Some(config);
        self
    }

    /// Skip image validation and lookup entirely.
    pub fn without_images(mut self) -> Self {
        self.images_enabled = Some(false);
        self
    }

    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline = Some(config);
        self
    }

    /// Confidence below which the generative fallback runs.
    pub fn ai_threshold(mut self, threshold: f64) -> Self {
        let mut config = self.pipeline.take().unwrap_or_default();
        config.ai_threshold = threshold;
        self.pipeline = Some(config);
        self
    }

    pub fn ai(mut self, ai: AiExtractor) -> Self {
        self.ai = Some(ai);
        self
    }

    /// Use `generator` for the generative fallback with `config`'s budgets.
    pub fn generator(self, generator: Arc<dyn TextGenerator>, config: AiConfig) -> Self {
        self.ai(AiExtractor::new(generator, config))
    }

    /// Replace the default scraper registry.
    pub fn scrapers(mut self, scrapers: Vec<Box<dyn SiteScraper>>) -> Self {
        self.scrapers = Some(scrapers);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn RecipeCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Result<RecipePipeline, PipelineError> {
        let config = self.pipeline.unwrap_or_default();
        for (name, value) in [
            ("ai_threshold", config.ai_threshold),
            ("cache_min_confidence", config.cache_min_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PipelineError::Builder(format!(
                    "{name} must be between 0 and 1, got {value}"
                )));
            }
        }

        let fetch = self.fetch.unwrap_or_default();
        let fetcher = Arc::new(match self.rate_limiter {
            Some(limiter) => RequestFetcher::with_rate_limiter(&fetch, limiter),
            None => RequestFetcher::new(&fetch),
        });

        let image = self.image.unwrap_or_default();
        let images = (self.images_enabled.unwrap_or(true) && image.enabled)
            .then(|| ImageResolver::new(fetcher.clone(), image));

        let mut manager = match self.scrapers {
            Some(scrapers) => ScraperManager::with_scrapers(scrapers),
            None => ScraperManager::new(),
        }
        .with_ai_threshold(config.ai_threshold);
        if let Some(ai) = self.ai {
            manager = manager.with_ai(ai);
        }

        Ok(RecipePipeline {
            fetcher,
            manager,
            images,
            cache: self.cache,
            config,
        })
    }
}
