use regex::Regex;
use std::sync::LazyLock;

use super::{host_matches, scrape_in_stages, ParsingContext, SelectorSet, SiteScraper, StagePlan};
use crate::model::{ExtractionMethod, ExtractionResult, RecipeDraft};

static STEP_LABEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^step\s*\d+\s*[:.]?\s*").expect("Invalid step label regex"));

const SELECTORS: SelectorSet = SelectorSet {
    title: &["h1.heading-1", "h1"],
    description: &[".recipe__description", "meta[name='description']"],
    image: &["meta[property='og:image']", ".post-header__image-container img"],
    ingredients: &[
        ".recipe__ingredients li",
        "section.recipe__ingredients .list-item",
    ],
    instructions: &[
        ".recipe__method-steps li .editor-content",
        ".recipe__method-steps li",
    ],
    prep_time: &[".recipe__cook-and-prep li:nth-child(1) time"],
    cook_time: &[".recipe__cook-and-prep li:nth-child(2) time"],
    total_time: &[],
    servings: &[".recipe__cook-and-prep .icon-with-text__children"],
    difficulty: &[".post-header__skill-level", ".recipe__skill-level"],
};

/// Method steps are rendered as "STEP 1 ..."; the numbering is positional anyway.
fn strip_step_labels(draft: &mut RecipeDraft) {
    for step in draft.instructions.iter_mut() {
        let stripped = STEP_LABEL_REGEX.replace(step, "");
        if stripped.len() != step.len() {
            *step = stripped.into_owned();
        }
    }
    draft.instructions.retain(|s| !s.is_empty());
}

pub struct BbcGoodFoodScraper;

impl SiteScraper for BbcGoodFoodScraper {
    fn name(&self) -> &'static str {
        "bbc-good-food"
    }

    fn can_handle(&self, hostname: &str) -> bool {
        host_matches(hostname, "bbcgoodfood.com")
    }

    fn scrape(&self, context: &ParsingContext) -> ExtractionResult {
        scrape_in_stages(
            context,
            &StagePlan {
                selectors: &SELECTORS,
                selector_method: ExtractionMethod::SiteSpecific,
                publisher_tag: Some("bbc-good-food"),
                refine: strip_step_labels,
            },
        )
    }
}
