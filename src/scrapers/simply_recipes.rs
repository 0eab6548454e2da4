use super::{host_matches, scrape_in_stages, ParsingContext, SelectorSet, SiteScraper, StagePlan};
use crate::model::{ExtractionMethod, ExtractionResult, RecipeDraft};

const SELECTORS: SelectorSet = SelectorSet {
    title: &["h1.heading__title", "h1"],
    description: &["p.heading__subtitle", "meta[name='description']"],
    image: &["meta[property='og:image']", ".primary-image__image"],
    ingredients: &[".structured-ingredients__list-item", ".ingredient"],
    instructions: &[".structured-project__steps ol li p", ".mntl-sc-block-group--LI p"],
    prep_time: &[".prep-time .meta-text__data"],
    cook_time: &[".cook-time .meta-text__data"],
    total_time: &[".total-time .meta-text__data"],
    servings: &[".recipe-serving .meta-text__data"],
    difficulty: &[],
};

/// Step photos are captioned "Simply Recipes / Photographer".
fn drop_photo_captions(draft: &mut RecipeDraft) {
    draft
        .instructions
        .retain(|step| !step.starts_with("Simply Recipes /"));
}

pub struct SimplyRecipesScraper;

impl SiteScraper for SimplyRecipesScraper {
    fn name(&self) -> &'static str {
        "simply-recipes"
    }

    fn can_handle(&self, hostname: &str) -> bool {
        host_matches(hostname, "simplyrecipes.com")
    }

    fn scrape(&self, context: &ParsingContext) -> ExtractionResult {
        scrape_in_stages(
            context,
            &StagePlan {
                selectors: &SELECTORS,
                selector_method: ExtractionMethod::SiteSpecific,
                publisher_tag: Some("simply-recipes"),
                refine: drop_photo_captions,
            },
        )
    }
}
