use super::{
    host_matches, no_refinement, scrape_in_stages, ParsingContext, SelectorSet, SiteScraper,
    StagePlan,
};
use crate::model::{ExtractionMethod, ExtractionResult};

const SELECTORS: SelectorSet = SelectorSet {
    title: &["h1.heading__title", "h1"],
    description: &["p.heading__subtitle", "meta[name='description']"],
    image: &["meta[property='og:image']", ".primary-image img"],
    ingredients: &[
        ".structured-ingredients__list-item",
        ".section--ingredients li",
    ],
    instructions: &[
        ".structured-project__steps ol li p",
        ".section--instructions li p",
    ],
    prep_time: &[".prep-time .meta-text__data"],
    cook_time: &[".cook-time .meta-text__data"],
    total_time: &[".total-time .meta-text__data"],
    servings: &[".recipe-serving .meta-text__data", ".recipe-yield .meta-text__data"],
    difficulty: &[],
};

pub struct SeriousEatsScraper;

impl SiteScraper for SeriousEatsScraper {
    fn name(&self) -> &'static str {
        "serious-eats"
    }

    fn can_handle(&self, hostname: &str) -> bool {
        host_matches(hostname, "seriouseats.com")
    }

    fn scrape(&self, context: &ParsingContext) -> ExtractionResult {
        scrape_in_stages(
            context,
            &StagePlan {
                selectors: &SELECTORS,
                selector_method: ExtractionMethod::SiteSpecific,
                publisher_tag: Some("serious-eats"),
                refine: no_refinement,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editorial_tips_removed_from_json_ld() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@context": "https://schema.org", "@graph": [{"@type": "Recipe",
             "name": "The Food Lab's Chili",
             "recipeIngredient": ["2 pounds chuck", "1 onion"],
             "recipeInstructions": [
                {"@type": "HowToStep", "text": "Brown the beef."},
                {"@type": "HowToTip", "text": "Work in batches."}
             ]}]}
        </script></head><body></body></html>"#;
        let context = ParsingContext::new("https://www.seriouseats.com/chili", html);
        let recipe = SeriousEatsScraper.scrape(&context).recipe.unwrap();
        assert_eq!(recipe.instructions, vec!["Brown the beef."]);
    }
}
