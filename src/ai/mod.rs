//! Generative-model fallback for pages the scrapers could not read.
//!
//! The level decides how much of the page goes to the model:
//!
//! - `fast` reads recipe-shaped lists with selectors and skips the model
//!   entirely unless nothing is found
//! - `detailed` sends the most recipe-like container
//! - `aggressive` sends the whole page text and backfills metadata
//!
//! Every model call races a deadline; losing the race drops the request.

mod content;
mod prompt;
mod repair;

pub use content::{detailed_content, fast_extract, page_text, visible_text, MetaBackfill};
pub use prompt::{aggressive_prompt, detailed_prompt, minimal_prompt, EXTRACTION_PROMPT};
pub use repair::parse_ai_response;

use log::{debug, info, warn};
use scraper::Html;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use url::Url;

use crate::cache::{cache_key, MemoryCache, RecipeCache};
use crate::config::AiConfig;
use crate::error::AiError;
use crate::model::{ExtractionMethod, ExtractionResult, RecipeDraft};
use crate::providers::{GeneratorFactory, TextGenerator};
use crate::scoring::calculate_confidence;
use crate::text::{clean_text, normalize_duration, parse_servings, truncate_chars};

/// AI results above this are cached.
pub const AI_CACHE_MIN_CONFIDENCE: f64 = 0.6;

const FAST_MIN_CONFIDENCE: f64 = 0.2;
const FAST_MAX_CONFIDENCE: f64 = 0.6;
const AGGRESSIVE_MAX_CONFIDENCE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackLevel {
    Fast,
    Detailed,
    Aggressive,
}

impl FallbackLevel {
    /// Pick the level the current best result calls for.
    pub fn select(best: &ExtractionResult) -> Self {
        match &best.recipe {
            None => FallbackLevel::Aggressive,
            Some(_) if best.confidence < AGGRESSIVE_MAX_CONFIDENCE => FallbackLevel::Aggressive,
            Some(_)
                if best.title().is_some()
                    && (FAST_MIN_CONFIDENCE..FAST_MAX_CONFIDENCE).contains(&best.confidence) =>
            {
                FallbackLevel::Fast
            }
            Some(_) => FallbackLevel::Detailed,
        }
    }

    pub fn escalate(self) -> Option<Self> {
        match self {
            FallbackLevel::Fast => Some(FallbackLevel::Detailed),
            FallbackLevel::Detailed => Some(FallbackLevel::Aggressive),
            FallbackLevel::Aggressive => None,
        }
    }
}

impl fmt::Display for FallbackLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackLevel::Fast => write!(f, "fast"),
            FallbackLevel::Detailed => write!(f, "detailed"),
            FallbackLevel::Aggressive => write!(f, "aggressive"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AiOptions {
    pub level: FallbackLevel,
    /// Partial result from the scrapers; fills fields the model leaves out.
    pub hints: Option<RecipeDraft>,
    /// When the model call is abandoned. Defaults to now plus the configured timeout.
    pub deadline: Option<Instant>,
}

impl AiOptions {
    pub fn new(level: FallbackLevel) -> Self {
        Self {
            level,
            hints: None,
            deadline: None,
        }
    }
}

/// What to do once the page has been read.
enum Plan {
    Done(RecipeDraft),
    Generate {
        prompt: String,
        method: ExtractionMethod,
        backfill: Option<MetaBackfill>,
    },
}

pub struct AiExtractor {
    generator: Arc<dyn TextGenerator>,
    cache: Arc<dyn RecipeCache>,
    config: AiConfig,
}

impl AiExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>, config: AiConfig) -> Self {
        let cache = Arc::new(MemoryCache::new(config.cache_ttl()));
        Self {
            generator,
            cache,
            config,
        }
    }

    pub fn from_config(config: &AiConfig) -> Result<Self, AiError> {
        Ok(Self::new(GeneratorFactory::create(config)?, config.clone()))
    }

    pub fn with_cache(mut self, cache: Arc<dyn RecipeCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.generator.provider_name()
    }

    pub async fn extract(
        &self,
        url: &str,
        html: &str,
        options: AiOptions,
    ) -> Result<ExtractionResult, AiError> {
        let hostname = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .unwrap_or_default();
        let key = format!("ai:{}", cache_key(url));

        if let Some(recipe) = self.cache.get(&key).await {
            info!("Using cached AI extraction for {}", url);
            let confidence = calculate_confidence(&recipe, &ExtractionMethod::Cache, &hostname);
            return Ok(ExtractionResult::found(recipe, confidence, ExtractionMethod::Cache));
        }

        let plan = self.plan(url, html, &options);

        let (mut draft, method) = match plan {
            Plan::Done(draft) => (draft, ExtractionMethod::AiFast),
            Plan::Generate {
                prompt,
                method,
                backfill,
            } => {
                debug!("Sending {} chars to {} ({})", prompt.len(), self.provider_name(), method);
                let response = self.generate(&prompt, options.deadline).await?;
                let payload = parse_ai_response(&response)?;
                let mut draft = draft_from_payload(&payload, url)?;
                if let Some(backfill) = backfill {
                    backfill.apply(&mut draft);
                }
                (draft, method)
            }
        };

        if let Some(hints) = &options.hints {
            fill_from_hints(&mut draft, hints);
        }
        if !draft.is_usable() {
            return Err(AiError::NoRecipe(
                "response had no title, ingredients or instructions".to_string(),
            ));
        }

        let confidence = calculate_confidence(&draft, &method, &hostname);
        if confidence > AI_CACHE_MIN_CONFIDENCE {
            self.cache.set(&key, &draft).await;
        }
        info!("AI extraction ({}) for {} scored {:.2}", method, url, confidence);
        Ok(ExtractionResult::found(draft, confidence, method))
    }

    /// Read the page and decide what, if anything, to send. The parsed
    /// document does not outlive this call.
    fn plan(&self, url: &str, html: &str, options: &AiOptions) -> Plan {
        let document = Html::parse_document(html);

        let minimal = |document: &Html| {
            let text = page_text(document);
            Plan::Generate {
                prompt: minimal_prompt(truncate_chars(&text, self.config.minimal_char_budget)),
                method: ExtractionMethod::AiMinimal,
                backfill: None,
            }
        };

        match options.level {
            FallbackLevel::Fast => match fast_extract(&document, url, options.hints.as_ref()) {
                Some(draft) => Plan::Done(draft),
                None => {
                    debug!("Fast heuristics found nothing on {}, using minimal prompt", url);
                    minimal(&document)
                }
            },
            FallbackLevel::Detailed => Plan::Generate {
                prompt: detailed_prompt(
                    url,
                    &detailed_content(&document, self.config.detailed_char_budget),
                ),
                method: ExtractionMethod::AiDetailed,
                backfill: None,
            },
            FallbackLevel::Aggressive => {
                let text = page_text(&document);
                Plan::Generate {
                    prompt: aggressive_prompt(
                        url,
                        truncate_chars(&text, self.config.aggressive_char_budget),
                    ),
                    method: ExtractionMethod::AiAggressive,
                    backfill: Some(MetaBackfill::from_document(&document, url)),
                }
            }
        }
    }

    async fn generate(&self, prompt: &str, deadline: Option<Instant>) -> Result<String, AiError> {
        let started = Instant::now();
        let deadline = deadline.unwrap_or_else(|| started + self.config.timeout());

        match timeout_at(deadline, self.generator.generate(prompt, self.config.max_tokens)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "{} did not answer within {:?}, abandoning request",
                    self.provider_name(),
                    started.elapsed()
                );
                Err(AiError::Timeout(started.elapsed()))
            }
        }
    }
}

fn text_field(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(clean_text)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
}

fn list_field(payload: &Value, key: &str) -> Vec<String> {
    match payload.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(clean_text(s)),
                Value::Object(map) => ["text", "name"]
                    .iter()
                    .find_map(|k| map.get(*k).and_then(Value::as_str))
                    .map(clean_text),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s.lines().map(clean_text).filter(|l| !l.is_empty()).collect(),
        _ => Vec::new(),
    }
}

/// Convert the model's JSON answer into a draft.
pub fn draft_from_payload(payload: &Value, url: &str) -> Result<RecipeDraft, AiError> {
    if !payload.is_object() {
        return Err(AiError::NoRecipe("response is not a JSON object".to_string()));
    }
    if let Some(reason) = text_field(payload, "error") {
        return Err(AiError::NoRecipe(reason));
    }

    let mut draft = RecipeDraft::new(text_field(payload, "title").unwrap_or_default(), url);
    draft.description = text_field(payload, "description");
    draft.image = text_field(payload, "image").filter(|i| i.starts_with("http"));
    draft.prep_time = text_field(payload, "prepTime").and_then(|t| normalize_duration(&t));
    draft.cook_time = text_field(payload, "cookTime").and_then(|t| normalize_duration(&t));
    draft.total_time = text_field(payload, "totalTime").and_then(|t| normalize_duration(&t));
    draft.servings = match payload.get("servings") {
        Some(Value::Number(n)) => n.as_f64().filter(|s| *s > 0.0),
        Some(Value::String(s)) => parse_servings(s),
        _ => None,
    };
    draft.difficulty = text_field(payload, "difficulty");
    draft.ingredients = list_field(payload, "ingredients");
    draft.instructions = list_field(payload, "instructions");
    for tag in list_field(payload, "tags") {
        draft.add_tag(&tag);
    }

    Ok(draft)
}

fn fill_from_hints(draft: &mut RecipeDraft, hints: &RecipeDraft) {
    if draft.title.trim().is_empty() {
        draft.title = hints.title.clone();
    }
    let fill = |field: &mut Option<String>, hint: &Option<String>| {
        if field.is_none() {
            *field = hint.clone();
        }
    };
    fill(&mut draft.description, &hints.description);
    fill(&mut draft.image, &hints.image);
    fill(&mut draft.prep_time, &hints.prep_time);
    fill(&mut draft.cook_time, &hints.cook_time);
    fill(&mut draft.total_time, &hints.total_time);
    if draft.servings.is_none() {
        draft.servings = hints.servings;
    }
    for tag in &hints.tags {
        draft.add_tag(tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::FakeGenerator;
    use serde_json::json;
    use std::time::Duration;

    const PAGE: &str = r#"<html><head><meta property="og:image" content="https://example.com/hero.jpg"></head>
        <body><nav>Home</nav><p>Grandma's shortbread. Cream 1 cup butter with 1/2 cup sugar,
        add 2 cups flour, press into a pan and bake at 325F for 25 minutes.</p></body></html>"#;

    const ANSWER: &str = r#"{"title": "Shortbread", "ingredients": ["1 cup butter", "1/2 cup sugar", "2 cups flour"],
        "instructions": ["Cream butter and sugar.", "Add flour.", "Press into a pan.", "Bake at 325F for 25 minutes."],
        "cookTime": "25 minutes", "servings": "16", "tags": ["dessert"]}"#;

    fn extractor(generator: FakeGenerator) -> (Arc<FakeGenerator>, AiExtractor) {
        let generator = Arc::new(generator);
        let extractor = AiExtractor::new(generator.clone(), AiConfig::default());
        (generator, extractor)
    }

    fn result_with(confidence: f64, title: &str) -> ExtractionResult {
        ExtractionResult::found(
            RecipeDraft::new(title, "https://example.com"),
            confidence,
            ExtractionMethod::CssSelectors,
        )
    }

    #[test]
    fn test_level_selection() {
        assert_eq!(
            FallbackLevel::select(&ExtractionResult::failed("none")),
            FallbackLevel::Aggressive
        );
        assert_eq!(FallbackLevel::select(&result_with(0.01, "T")), FallbackLevel::Aggressive);
        assert_eq!(FallbackLevel::select(&result_with(0.4, "Title")), FallbackLevel::Fast);
        assert_eq!(FallbackLevel::select(&result_with(0.4, "")), FallbackLevel::Detailed);
        assert_eq!(FallbackLevel::select(&result_with(0.1, "Title")), FallbackLevel::Detailed);
        assert_eq!(FallbackLevel::Aggressive.escalate(), None);
    }

    #[tokio::test]
    async fn test_aggressive_extraction_backfills_image_and_caches() {
        let (generator, extractor) = extractor(FakeGenerator::always(ANSWER));
        let url = "https://example.com/shortbread";

        let result = extractor
            .extract(url, PAGE, AiOptions::new(FallbackLevel::Aggressive))
            .await
            .unwrap();
        let recipe = result.recipe.as_ref().unwrap();
        assert_eq!(result.method, ExtractionMethod::AiAggressive);
        assert_eq!(recipe.image.as_deref(), Some("https://example.com/hero.jpg"));
        assert_eq!(recipe.cook_time.as_deref(), Some("PT25M"));
        assert_eq!(recipe.servings, Some(16.0));
        assert!(result.confidence > AI_CACHE_MIN_CONFIDENCE);
        assert!(generator.prompts()[0].contains("advertisements"));
        assert!(!generator.prompts()[0].contains("<nav>"));

        let again = extractor
            .extract(url, PAGE, AiOptions::new(FallbackLevel::Aggressive))
            .await
            .unwrap();
        assert_eq!(again.method, ExtractionMethod::Cache);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_fast_level_skips_model_when_lists_exist() {
        let (generator, extractor) = extractor(FakeGenerator::new());
        let html = "<h1>Salsa</h1><ul class='ingredients'><li>4 tomatoes</li><li>1 onion</li></ul>";
        let result = extractor
            .extract("https://example.com/salsa", html, AiOptions::new(FallbackLevel::Fast))
            .await
            .unwrap();
        assert_eq!(result.method, ExtractionMethod::AiFast);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_fast_level_falls_back_to_minimal_prompt() {
        let (generator, extractor) = extractor(FakeGenerator::always(ANSWER));
        let result = extractor
            .extract("https://example.com/a", PAGE, AiOptions::new(FallbackLevel::Fast))
            .await
            .unwrap();
        assert_eq!(result.method, ExtractionMethod::AiMinimal);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_abandons_call() {
        let (_, extractor) =
            extractor(FakeGenerator::always(ANSWER).with_delay(Duration::from_secs(600)));
        let options = AiOptions {
            deadline: Some(Instant::now() + Duration::from_secs(5)),
            ..AiOptions::new(FallbackLevel::Detailed)
        };
        let err = extractor
            .extract("https://example.com/slow", PAGE, options)
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_model_reports_no_recipe() {
        let (_, extractor) = extractor(FakeGenerator::always(r#"{"error": "This is a blog index"}"#));
        let err = extractor
            .extract("https://example.com/", PAGE, AiOptions::new(FallbackLevel::Detailed))
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::NoRecipe(_)));
    }

    #[tokio::test]
    async fn test_unparseable_answer() {
        let (_, extractor) = extractor(FakeGenerator::always("Sorry, I can't help with that."));
        let err = extractor
            .extract("https://example.com/", PAGE, AiOptions::new(FallbackLevel::Detailed))
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Parse(_)));
    }

    #[test]
    fn test_hints_fill_missing_fields() {
        let payload = json!({"title": "", "ingredients": ["salt"], "instructions": [{"text": "Season."}]});
        let mut draft = draft_from_payload(&payload, "https://example.com/").unwrap();
        let mut hints = RecipeDraft::new("Seasoned Fries", "https://example.com/");
        hints.prep_time = Some("PT5M".to_string());
        fill_from_hints(&mut draft, &hints);

        assert_eq!(draft.title, "Seasoned Fries");
        assert_eq!(draft.prep_time.as_deref(), Some("PT5M"));
        assert_eq!(draft.instructions, vec!["Season."]);
    }
}
