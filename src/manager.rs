//! Runs every applicable scraper against a page and keeps the best answer.

use log::{debug, info, warn};
use regex::Regex;
use scraper::Html;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::ai::{AiExtractor, AiOptions, FallbackLevel};
use crate::error::AiError;
use crate::model::{ExtractionMethod, ExtractionResult};
use crate::scoring::{merge_results, ENHANCE_IMAGE_BONUS, ENHANCE_LIST_BONUS};
use crate::scrapers::{
    absolutize, default_scrapers, element_text, parse_selector, HtmlClassExtractor,
    ParsingContext, SiteScraper,
};

/// Below this the enhance pass tries to fill in missing lists.
pub const ENHANCE_THRESHOLD: f64 = 0.6;

const SCAN_MIN_CHARS: usize = 10;
const SCAN_MAX_CHARS: usize = 200;
const SCAN_MAX_MATCHES: usize = 20;
const SCAN_MIN_MATCHES: usize = 3;

static UNIT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:cups?|tablespoons?|tbsps?|teaspoons?|tsps?|grams?|kg|oz|ounces?|pounds?|lbs?|ml|litres?|liters?|pinch|cloves?|cans?|sticks?)\b",
    )
    .expect("Invalid unit regex")
});

static STEP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:step|preheat|bake|stir|mix|whisk|simmer|boil|combine|heat|pour|serve|fold|season)\b",
    )
    .expect("Invalid step regex")
});

const INGREDIENT_SCAN: &[&str] = &["li", "p", "span"];
const INSTRUCTION_SCAN: &[&str] = &["ol li", "li", "p"];
const IMAGE_META: &[&str] = &["meta[property='og:image']", "meta[name='twitter:image']"];

pub struct ScraperManager {
    scrapers: Vec<Box<dyn SiteScraper>>,
    fallback: HtmlClassExtractor,
    ai: Option<AiExtractor>,
    ai_threshold: f64,
}

impl Default for ScraperManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ScraperManager {
    pub fn new() -> Self {
        Self::with_scrapers(default_scrapers())
    }

    pub fn with_scrapers(scrapers: Vec<Box<dyn SiteScraper>>) -> Self {
        Self {
            scrapers,
            fallback: HtmlClassExtractor,
            ai: None,
            ai_threshold: ENHANCE_THRESHOLD,
        }
    }

    pub fn with_ai(mut self, ai: AiExtractor) -> Self {
        self.ai = Some(ai);
        self
    }

    /// Confidence below which the generative fallback runs.
    pub fn with_ai_threshold(mut self, threshold: f64) -> Self {
        self.ai_threshold = threshold;
        self
    }

    pub fn has_ai(&self) -> bool {
        self.ai.is_some()
    }

    /// Best deterministic result for the page. Never fails; an empty page
    /// yields a zero-confidence result listing what every scraper tried.
    pub fn scrape_recipe(&self, context: &ParsingContext) -> ExtractionResult {
        let mut found = Vec::new();
        let mut issues = Vec::new();

        let applicable = self
            .scrapers
            .iter()
            .filter(|s| s.can_handle(&context.hostname))
            .map(|s| s.as_ref())
            .chain(std::iter::once(&self.fallback as &dyn SiteScraper));

        for scraper in applicable {
            let result = scraper.scrape(context);
            if result.recipe.is_some() {
                debug!(
                    "Scraper '{}' found a recipe via {} ({:.2})",
                    scraper.name(),
                    result.method,
                    result.confidence
                );
                found.push(result);
            } else {
                debug!("Scraper '{}' found nothing: {:?}", scraper.name(), result.issues);
                issues.extend(result.issues.iter().map(|i| format!("{}: {}", scraper.name(), i)));
            }
        }

        let Some(mut best) = found
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .cloned()
        else {
            warn!("No scraper found a recipe on {}", context.url);
            return ExtractionResult {
                recipe: None,
                confidence: 0.0,
                method: ExtractionMethod::Error,
                issues,
            };
        };

        if let Some(merged) = merge_results(&found, &context.hostname) {
            if merged.confidence > best.confidence {
                debug!(
                    "Merged result ({:.2}) beats {} ({:.2})",
                    merged.confidence, best.method, best.confidence
                );
                best = merged;
            }
        }

        if best.confidence < ENHANCE_THRESHOLD {
            best = enhance_partial_data(&context.document, &context.url, &best);
        }

        info!(
            "Best result for {}: {} ({:.2})",
            context.url, best.method, best.confidence
        );
        best
    }

    /// Deterministic scrapers, then the generative fallback when the best
    /// result is below the AI threshold.
    pub async fn extract(&self, url: &str, html: &str) -> ExtractionResult {
        let best = {
            let context = ParsingContext::new(url, html);
            self.scrape_recipe(&context)
        };

        if best.confidence >= self.ai_threshold {
            return best;
        }
        match &self.ai {
            Some(ai) => run_ai_fallback(ai, url, html, best).await,
            None => best,
        }
    }
}

/// Walk the fallback levels starting from the one the current result calls
/// for, keeping the prior result unless the model does better.
async fn run_ai_fallback(
    ai: &AiExtractor,
    url: &str,
    html: &str,
    best: ExtractionResult,
) -> ExtractionResult {
    let mut level = FallbackLevel::select(&best);
    let mut issues = best.issues.clone();

    loop {
        info!("Running {} AI fallback for {}", level, url);
        let options = AiOptions {
            level,
            hints: best.recipe.clone(),
            deadline: None,
        };

        match ai.extract(url, html, options).await {
            Ok(result) if result.confidence > best.confidence => {
                return result.with_issues(issues);
            }
            Ok(result) => {
                issues.push(format!(
                    "{} scored {:.2}, keeping {}",
                    result.method, result.confidence, best.method
                ));
            }
            Err(e) => {
                warn!("{} AI fallback failed for {}: {}", level, url, e);
                issues.push(format!("{level} AI fallback failed: {e}"));
                if matches!(e, AiError::NotConfigured(_)) {
                    break;
                }
            }
        }

        match level.escalate() {
            Some(next) => level = next,
            None => break,
        }
    }

    ExtractionResult { issues, ..best }
}

/// Element texts that look like `pattern`, from the first selector that
/// finds enough of them.
fn aggressive_scan(document: &Html, selectors: &[&str], pattern: &Regex) -> Option<Vec<String>> {
    for selector in selectors {
        let Ok(parsed) = parse_selector(selector) else {
            continue;
        };
        let mut seen = HashSet::new();
        let matches: Vec<String> = document
            .select(&parsed)
            .map(element_text)
            .filter(|t| (SCAN_MIN_CHARS..=SCAN_MAX_CHARS).contains(&t.chars().count()))
            .filter(|t| pattern.is_match(t))
            .filter(|t| seen.insert(t.clone()))
            .take(SCAN_MAX_MATCHES)
            .collect();
        if matches.len() >= SCAN_MIN_MATCHES {
            debug!("Aggressive scan matched {} items with '{}'", matches.len(), selector);
            return Some(matches);
        }
    }
    None
}

/// Fill empty lists and a missing image from a looser reading of the page.
///
/// Returns a new result; `result` itself is left untouched.
pub fn enhance_partial_data(document: &Html, page_url: &str, result: &ExtractionResult) -> ExtractionResult {
    let Some(mut recipe) = result.recipe.clone() else {
        return result.clone();
    };
    let mut confidence = result.confidence;
    let mut issues = result.issues.clone();

    if recipe.ingredients.is_empty() {
        if let Some(items) = aggressive_scan(document, INGREDIENT_SCAN, &UNIT_REGEX) {
            issues.push(format!("Recovered {} ingredients by page scan", items.len()));
            recipe.ingredients = items;
            confidence += ENHANCE_LIST_BONUS;
        }
    }

    if recipe.instructions.is_empty() {
        if let Some(items) = aggressive_scan(document, INSTRUCTION_SCAN, &STEP_REGEX) {
            issues.push(format!("Recovered {} instructions by page scan", items.len()));
            recipe.instructions = items;
            confidence += ENHANCE_LIST_BONUS;
        }
    }

    if recipe.image.is_none() {
        let image = IMAGE_META
            .iter()
            .filter_map(|s| parse_selector(s).ok())
            .find_map(|selector| {
                document
                    .select(&selector)
                    .filter_map(|el| el.value().attr("content"))
                    .find_map(|src| absolutize(page_url, src))
            });
        if let Some(image) = image {
            recipe.image = Some(image);
            confidence += ENHANCE_IMAGE_BONUS;
        }
    }

    ExtractionResult {
        recipe: Some(recipe),
        confidence: confidence.min(1.0),
        method: result.method.clone(),
        issues,
    }
}
