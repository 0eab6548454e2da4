use super::{host_matches, scrape_in_stages, ParsingContext, SelectorSet, SiteScraper, StagePlan};
use crate::model::{ExtractionMethod, ExtractionResult, RecipeDraft};

const SELECTORS: SelectorSet = SelectorSet {
    title: &["h1.article-heading", "h1.headline", "h1"],
    description: &["p.article-subheading", "meta[name='description']"],
    image: &[
        "meta[property='og:image']",
        ".primary-image__image",
        ".lead-content img",
    ],
    ingredients: &[
        ".mm-recipes-structured-ingredients__list-item",
        "ul.ingredients-section li",
        ".ingredients-item-name",
    ],
    instructions: &[
        ".mm-recipes-steps__content ol li p",
        "#recipe__steps-content_1-0 ol li p",
        ".recipe-directions__list--item",
    ],
    prep_time: &[".mm-recipes-details__item--prep-time .mm-recipes-details__value"],
    cook_time: &[".mm-recipes-details__item--cook-time .mm-recipes-details__value"],
    total_time: &[".mm-recipes-details__item--total-time .mm-recipes-details__value"],
    servings: &[".mm-recipes-details__item--servings .mm-recipes-details__value"],
    difficulty: &[],
};

const PHOTO_CREDIT: &str = "Dotdash Meredith Food Studios";

/// Step photos carry a studio credit that ends up in the step text.
fn strip_photo_credits(draft: &mut RecipeDraft) {
    for step in draft.instructions.iter_mut() {
        if let Some(stripped) = step.strip_suffix(PHOTO_CREDIT) {
            *step = stripped.trim_end().to_string();
        }
    }
    draft.instructions.retain(|s| !s.is_empty());
}

pub struct AllRecipesScraper;

impl SiteScraper for AllRecipesScraper {
    fn name(&self) -> &'static str {
        "allrecipes"
    }

    fn can_handle(&self, hostname: &str) -> bool {
        host_matches(hostname, "allrecipes.com")
    }

    fn scrape(&self, context: &ParsingContext) -> ExtractionResult {
        scrape_in_stages(
            context,
            &StagePlan {
                selectors: &SELECTORS,
                selector_method: ExtractionMethod::SiteSpecific,
                publisher_tag: Some("allrecipes"),
                refine: strip_photo_credits,
            },
        )
    }
}
