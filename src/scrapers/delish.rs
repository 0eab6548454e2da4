use super::{host_matches, scrape_in_stages, ParsingContext, SelectorSet, SiteScraper, StagePlan};
use crate::model::{ExtractionMethod, ExtractionResult, RecipeDraft};

const SELECTORS: SelectorSet = SelectorSet {
    title: &["h1[data-testid='ContentHeaderHed']", "h1.content-hed", "h1"],
    description: &["[data-testid='ContentHeaderDek']", "meta[name='description']"],
    image: &["meta[property='og:image']"],
    ingredients: &[".ingredient-lists li", "ul.ingredient-lists li", ".ingredient-item"],
    instructions: &[".directions li", ".direction-lists li"],
    prep_time: &[".prep-time .time-amount"],
    cook_time: &[],
    total_time: &[".total-time .time-amount"],
    servings: &[".yields-amount", ".yield .value"],
    difficulty: &[],
};

const AD_MARKER: &str = "Advertisement - Continue Reading Below";

/// Inline ad slots inside the lists render this label as list items.
fn drop_ad_slots(draft: &mut RecipeDraft) {
    let is_ad = |s: &String| s.eq_ignore_ascii_case(AD_MARKER);
    draft.ingredients.retain(|s| !is_ad(s));
    draft.instructions.retain(|s| !is_ad(s));
}

pub struct DelishScraper;

impl SiteScraper for DelishScraper {
    fn name(&self) -> &'static str {
        "delish"
    }

    fn can_handle(&self, hostname: &str) -> bool {
        host_matches(hostname, "delish.com")
    }

    fn scrape(&self, context: &ParsingContext) -> ExtractionResult {
        scrape_in_stages(
            context,
            &StagePlan {
                selectors: &SELECTORS,
                selector_method: ExtractionMethod::SiteSpecific,
                publisher_tag: Some("delish"),
                refine: drop_ad_slots,
            },
        )
    }
}
