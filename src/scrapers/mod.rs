//! Extraction strategies that read a recipe out of a parsed page.
//!
//! Each [`SiteScraper`] runs in two stages: publisher-declared structured
//! data first, then an ordered list of CSS selectors when the structured data
//! is missing or unusable. A scraper never fails: problems are reported as a
//! zero-confidence [`ExtractionResult`] with issues attached.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::ScraperError;
use crate::model::{ExtractionMethod, ExtractionResult, RecipeDraft};
use crate::scoring::calculate_confidence;

mod allrecipes;
mod bbc_good_food;
mod delish;
mod food_network;
mod generic;
mod html_class;
mod microdata;
mod nyt_cooking;
mod selectors;
mod serious_eats;
mod simply_recipes;
pub mod structured;
mod taste_of_home;

pub use allrecipes::AllRecipesScraper;
pub use bbc_good_food::BbcGoodFoodScraper;
pub use delish::DelishScraper;
pub use food_network::FoodNetworkScraper;
pub use generic::GenericStructuredScraper;
pub use html_class::HtmlClassExtractor;
pub use microdata::extract_microdata;
pub use nyt_cooking::NytCookingScraper;
pub use selectors::{run_selector_stage, SelectorSet};
pub use serious_eats::SeriousEatsScraper;
pub use simply_recipes::SimplyRecipesScraper;
pub use structured::{find_json_ld_recipe, recipe_from_json_ld};
pub use taste_of_home::TasteOfHomeScraper;

/// A page ready for extraction.
pub struct ParsingContext {
    pub url: String,
    pub hostname: String,
    pub document: Html,
    pub raw_html: String,
}

impl ParsingContext {
    pub fn new(url: &str, raw_html: &str) -> Self {
        let hostname = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .unwrap_or_default();

        Self {
            url: url.to_string(),
            hostname,
            document: Html::parse_document(raw_html),
            raw_html: raw_html.to_string(),
        }
    }
}

pub trait SiteScraper: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_handle(&self, hostname: &str) -> bool;

    fn scrape(&self, context: &ParsingContext) -> ExtractionResult;
}

/// Publisher scrapers first, the catch-all structured-data scraper last.
pub fn default_scrapers() -> Vec<Box<dyn SiteScraper>> {
    vec![
        Box::new(AllRecipesScraper),
        Box::new(FoodNetworkScraper),
        Box::new(BbcGoodFoodScraper),
        Box::new(SeriousEatsScraper),
        Box::new(NytCookingScraper),
        Box::new(SimplyRecipesScraper),
        Box::new(TasteOfHomeScraper),
        Box::new(DelishScraper),
        Box::new(GenericStructuredScraper),
    ]
}

/// How a scraper runs its two stages.
pub(crate) struct StagePlan<'a> {
    pub selectors: &'a SelectorSet,
    /// Method reported when the selector stage produced the recipe.
    pub selector_method: ExtractionMethod,
    pub publisher_tag: Option<&'static str>,
    /// Publisher-specific cleanup applied to either stage's draft.
    pub refine: fn(&mut RecipeDraft),
}

fn finish(
    context: &ParsingContext,
    mut draft: RecipeDraft,
    method: ExtractionMethod,
    plan: &StagePlan,
    issues: Vec<String>,
) -> ExtractionResult {
    (plan.refine)(&mut draft);
    if let Some(tag) = plan.publisher_tag {
        draft.add_tag(tag);
    }
    let confidence = calculate_confidence(&draft, &method, &context.hostname);
    ExtractionResult::found(draft, confidence, method).with_issues(issues)
}

/// Structured data first, then the plan's selectors.
pub(crate) fn scrape_in_stages(context: &ParsingContext, plan: &StagePlan) -> ExtractionResult {
    let mut issues = Vec::new();

    match structured::run_json_ld_stage(context) {
        Ok(Some((draft, repairs))) => {
            issues.extend(repairs);
            if draft.is_usable() {
                return finish(context, draft, ExtractionMethod::JsonLd, plan, issues);
            }
            issues.push("JSON-LD recipe has no ingredients or instructions".to_string());
        }
        Ok(None) => issues.push("No JSON-LD recipe found".to_string()),
        Err(e) => issues.push(e.to_string()),
    }

    match run_selector_stage(context, plan.selectors) {
        Ok(draft) if draft.is_usable() => {
            finish(context, draft, plan.selector_method.clone(), plan, issues)
        }
        Ok(_) => ExtractionResult::not_found(
            plan.selector_method.clone(),
            "Selectors found a title but no ingredients or instructions",
        )
        .with_issues(issues),
        Err(e) => ExtractionResult::not_found(plan.selector_method.clone(), e.to_string())
            .with_issues(issues),
    }
}

pub(crate) fn no_refinement(_: &mut RecipeDraft) {}

/// True when `hostname` is `domain` or one of its subdomains.
pub(crate) fn host_matches(hostname: &str, domain: &str) -> bool {
    let host = hostname.to_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector, ScraperError> {
    Selector::parse(selector).map_err(|_| ScraperError::Selector(selector.to_string()))
}

/// Visible text of an element with whitespace collapsed and entities decoded.
pub(crate) fn element_text(element: ElementRef) -> String {
    crate::text::clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

/// Resolve a possibly relative URL against the page URL.
pub(crate) fn absolutize(page_url: &str, candidate: &str) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() || candidate.starts_with("data:") {
        return None;
    }
    if let Ok(absolute) = Url::parse(candidate) {
        return Some(absolute.to_string());
    }
    Url::parse(page_url)
        .and_then(|base| base.join(candidate))
        .ok()
        .map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_lowercases_hostname() {
        let context = ParsingContext::new("https://WWW.Example.com/recipe", "<html></html>");
        assert_eq!(context.hostname, "www.example.com");

        let context = ParsingContext::new("not a url", "<html></html>");
        assert_eq!(context.hostname, "");
    }

    #[test]
    fn test_host_matches_subdomains_only() {
        assert!(host_matches("www.allrecipes.com", "allrecipes.com"));
        assert!(host_matches("allrecipes.com", "allrecipes.com"));
        assert!(!host_matches("notallrecipes.com", "allrecipes.com"));
    }

    #[test]
    fn test_absolutize() {
        let page = "https://example.com/recipes/soup";
        assert_eq!(
            absolutize(page, "/img/soup.jpg").as_deref(),
            Some("https://example.com/img/soup.jpg")
        );
        assert_eq!(
            absolutize(page, "//cdn.example.com/a.jpg").as_deref(),
            Some("https://cdn.example.com/a.jpg")
        );
        assert_eq!(absolutize(page, "data:image/png;base64,AAA"), None);
        assert_eq!(absolutize(page, "  "), None);
    }

    #[test]
    fn test_every_publisher_is_registered_before_the_catch_all() {
        let scrapers = default_scrapers();
        assert_eq!(scrapers.last().unwrap().name(), "generic");
        assert!(scrapers.iter().all(|s| s.can_handle("www.allrecipes.com")
            == (s.name() == "allrecipes" || s.name() == "generic")));
    }
}
