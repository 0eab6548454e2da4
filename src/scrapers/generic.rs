use log::debug;

use super::microdata::extract_microdata;
use super::structured::run_json_ld_stage;
use super::{run_selector_stage, ParsingContext, SelectorSet, SiteScraper};
use crate::model::{ExtractionMethod, ExtractionResult, RecipeDraft};
use crate::scoring::calculate_confidence;

/// Markup emitted by the common recipe-card plugins.
const SELECTORS: SelectorSet = SelectorSet {
    title: &[
        ".wprm-recipe-name",
        ".tasty-recipes-title",
        ".mv-create-title",
        ".recipe-title",
        "h1.entry-title",
        "h1",
    ],
    description: &[
        ".wprm-recipe-summary",
        ".tasty-recipes-description",
        "meta[name='description']",
        "meta[property='og:description']",
    ],
    image: &[
        "meta[property='og:image']",
        "meta[name='twitter:image']",
        ".wprm-recipe-image img",
        ".tasty-recipes-image img",
    ],
    ingredients: &[
        ".wprm-recipe-ingredient",
        ".tasty-recipes-ingredients li",
        ".mv-create-ingredients li",
        ".recipe-ingredients li",
        ".ingredients li",
    ],
    instructions: &[
        ".wprm-recipe-instruction-text",
        ".tasty-recipes-instructions li",
        ".mv-create-instructions li",
        ".recipe-instructions li",
        ".instructions li",
        ".directions li",
    ],
    prep_time: &[".wprm-recipe-prep_time-container .wprm-recipe-time", ".tasty-recipes-prep-time"],
    cook_time: &[".wprm-recipe-cook_time-container .wprm-recipe-time", ".tasty-recipes-cook-time"],
    total_time: &[".wprm-recipe-total_time-container .wprm-recipe-time", ".tasty-recipes-total-time"],
    servings: &[".wprm-recipe-servings", ".tasty-recipes-yield"],
    difficulty: &[".wprm-recipe-difficulty", ".tasty-recipes-difficulty", ".mv-create-difficulty", ".recipe-difficulty"],
};

/// Catch-all scraper for any host: JSON-LD, then microdata, then the
/// recipe-card plugin selectors.
pub struct GenericStructuredScraper;

impl GenericStructuredScraper {
    fn found(context: &ParsingContext, draft: RecipeDraft, method: ExtractionMethod) -> ExtractionResult {
        let confidence = calculate_confidence(&draft, &method, &context.hostname);
        ExtractionResult::found(draft, confidence, method)
    }
}

impl SiteScraper for GenericStructuredScraper {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn can_handle(&self, _hostname: &str) -> bool {
        true
    }

    fn scrape(&self, context: &ParsingContext) -> ExtractionResult {
        let mut issues = Vec::new();

        match run_json_ld_stage(context) {
            Ok(Some((draft, repairs))) if draft.is_usable() => {
                return Self::found(context, draft, ExtractionMethod::JsonLd).with_issues(repairs);
            }
            Ok(Some(_)) => issues.push("JSON-LD recipe has no ingredients or instructions".to_string()),
            Ok(None) => issues.push("No JSON-LD recipe found".to_string()),
            Err(e) => issues.push(e.to_string()),
        }

        match extract_microdata(context) {
            Ok(draft) if draft.is_usable() => {
                debug!("Microdata recipe found on {}", context.url);
                return Self::found(context, draft, ExtractionMethod::Microdata).with_issues(issues);
            }
            Ok(_) => issues.push("Microdata recipe has no ingredients or instructions".to_string()),
            Err(e) => issues.push(e.to_string()),
        }

        match run_selector_stage(context, &SELECTORS) {
            Ok(draft) if draft.is_usable() => {
                Self::found(context, draft, ExtractionMethod::CssSelectors).with_issues(issues)
            }
            Ok(_) => ExtractionResult::not_found(
                ExtractionMethod::CssSelectors,
                "Selectors found a title but no ingredients or instructions",
            )
            .with_issues(issues),
            Err(e) => {
                ExtractionResult::not_found(ExtractionMethod::CssSelectors, e.to_string()).with_issues(issues)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrape(html: &str) -> ExtractionResult {
        GenericStructuredScraper.scrape(&ParsingContext::new("https://blog.example.com/soup", html))
    }

    #[test]
    fn test_prefers_json_ld() {
        let result = scrape(
            r#"<script type="application/ld+json">
                {"@type": "Recipe", "name": "Tomato Soup", "recipeIngredient": ["6 tomatoes"],
                 "recipeInstructions": "Blend."}
               </script>
               <div class="wprm-recipe-name">Other</div>"#,
        );
        assert_eq!(result.method, ExtractionMethod::JsonLd);
        assert_eq!(result.title(), Some("Tomato Soup"));
    }

    #[test]
    fn test_falls_back_to_plugin_markup() {
        let result = scrape(
            r#"<h2 class="wprm-recipe-name">Lentil Soup</h2>
               <li class="wprm-recipe-ingredient">1 cup lentils</li>
               <div class="wprm-recipe-instruction-text">Simmer for 30 minutes.</div>"#,
        );
        assert_eq!(result.method, ExtractionMethod::CssSelectors);
        assert_eq!(result.title(), Some("Lentil Soup"));
        assert!(result.issues.iter().any(|i| i.contains("microdata")));
    }

    #[test]
    fn test_title_only_page_is_not_found() {
        let result = scrape("<h1>About us</h1><p>We love food.</p>");
        assert!(result.recipe.is_none());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.method, ExtractionMethod::CssSelectors);
    }
}
