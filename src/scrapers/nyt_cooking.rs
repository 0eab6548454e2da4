use super::{
    no_refinement, scrape_in_stages, ParsingContext, SelectorSet, SiteScraper, StagePlan,
};
use crate::model::{ExtractionMethod, ExtractionResult};

const HOST: &str = "cooking.nytimes.com";

const SELECTORS: SelectorSet = SelectorSet {
    title: &["h1[class*='pantry--title']", "h1.recipe-title", "h1"],
    description: &["div[class*='topnote'] p", "meta[name='description']"],
    image: &["meta[property='og:image']", "img[class*='recipeheaderimage']"],
    ingredients: &[
        "li[class*='ingredient_ingredient']",
        ".recipe-ingredients li",
    ],
    instructions: &[
        "li[class*='preparation_step'] p",
        ".recipe-steps li",
    ],
    prep_time: &[],
    cook_time: &[],
    total_time: &["dl[class*='stats'] dd"],
    servings: &["div[class*='ingredients_recipeYield'] span:last-child", ".recipe-yield-value"],
    difficulty: &[],
};

pub struct NytCookingScraper;

impl SiteScraper for NytCookingScraper {
    fn name(&self) -> &'static str {
        "nyt-cooking"
    }

    // Only the cooking subdomain; nytimes.com articles are not recipes.
    fn can_handle(&self, hostname: &str) -> bool {
        hostname.eq_ignore_ascii_case(HOST)
    }

    fn scrape(&self, context: &ParsingContext) -> ExtractionResult {
        scrape_in_stages(
            context,
            &StagePlan {
                selectors: &SELECTORS,
                selector_method: ExtractionMethod::SiteSpecific,
                publisher_tag: Some("nyt-cooking"),
                refine: no_refinement,
            },
        )
    }
}
