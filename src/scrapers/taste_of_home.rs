use super::{
    host_matches, no_refinement, scrape_in_stages, ParsingContext, SelectorSet, SiteScraper,
    StagePlan,
};
use crate::model::{ExtractionMethod, ExtractionResult};

const SELECTORS: SelectorSet = SelectorSet {
    title: &["h1.recipe-title", "h1"],
    description: &[".recipe-tagline__text", "meta[name='description']"],
    image: &["meta[property='og:image']", ".recipe-image-and-meta-sidebar__featured-container img"],
    ingredients: &[".recipe-ingredients__list li", ".recipe-ingredients li"],
    instructions: &[".recipe-directions__item", ".recipe-directions__list li"],
    prep_time: &[".recipe-time-yield__label-prep"],
    cook_time: &[],
    total_time: &[".recipe-time-yield__label-total"],
    servings: &[".recipe-time-yield__label-servings"],
    difficulty: &[],
};

pub struct TasteOfHomeScraper;

impl SiteScraper for TasteOfHomeScraper {
    fn name(&self) -> &'static str {
        "taste-of-home"
    }

    fn can_handle(&self, hostname: &str) -> bool {
        host_matches(hostname, "tasteofhome.com")
    }

    fn scrape(&self, context: &ParsingContext) -> ExtractionResult {
        scrape_in_stages(
            context,
            &StagePlan {
                selectors: &SELECTORS,
                selector_method: ExtractionMethod::SiteSpecific,
                publisher_tag: Some("taste-of-home"),
                refine: no_refinement,
            },
        )
    }
}
