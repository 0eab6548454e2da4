use super::{host_matches, scrape_in_stages, ParsingContext, SelectorSet, SiteScraper, StagePlan};
use crate::model::{ExtractionMethod, ExtractionResult, RecipeDraft};

const SELECTORS: SelectorSet = SelectorSet {
    title: &["h1.o-AssetTitle__a-Headline", "span.o-AssetTitle__a-HeadlineText", "h1"],
    description: &[".o-AssetDescription__a-Description", "meta[name='description']"],
    image: &["meta[property='og:image']", ".m-MediaBlock__a-Image"],
    ingredients: &[
        ".o-Ingredients__a-Ingredient--CheckboxLabel",
        ".o-Ingredients__a-Ingredient",
    ],
    instructions: &[".o-Method__m-Step", ".o-Method__m-Body p"],
    prep_time: &[".o-RecipeInfo__m-Time .o-RecipeInfo__a-Description"],
    cook_time: &[".o-RecipeInfo__a-Cook"],
    total_time: &[".o-RecipeInfo__m-Total .m-RecipeInfo__a-Description"],
    servings: &[".o-RecipeInfo__m-Yield .o-RecipeInfo__a-Description"],
    difficulty: &[".o-RecipeInfo__m-Level .o-RecipeInfo__a-Description"],
};

/// The ingredient checklist starts with a "Deselect All" control.
fn drop_checklist_controls(draft: &mut RecipeDraft) {
    draft
        .ingredients
        .retain(|i| !i.eq_ignore_ascii_case("deselect all"));
}

pub struct FoodNetworkScraper;

impl SiteScraper for FoodNetworkScraper {
    fn name(&self) -> &'static str {
        "food-network"
    }

    fn can_handle(&self, hostname: &str) -> bool {
        host_matches(hostname, "foodnetwork.com")
    }

    fn scrape(&self, context: &ParsingContext) -> ExtractionResult {
        scrape_in_stages(
            context,
            &StagePlan {
                selectors: &SELECTORS,
                selector_method: ExtractionMethod::SiteSpecific,
                publisher_tag: Some("food-network"),
                refine: drop_checklist_controls,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checklist_control_is_not_an_ingredient() {
        let html = r#"<html><body>
            <h1 class="o-AssetTitle__a-Headline"><span>Baked Macaroni and Cheese</span></h1>
            <span class="o-Ingredients__a-Ingredient--CheckboxLabel">Deselect All</span>
            <span class="o-Ingredients__a-Ingredient--CheckboxLabel">1/2 pound elbow macaroni</span>
            <span class="o-Ingredients__a-Ingredient--CheckboxLabel">3 tablespoons butter</span>
            <li class="o-Method__m-Step">Preheat oven to 350 degrees F.</li>
        </body></html>"#;
        let context = ParsingContext::new("https://www.foodnetwork.com/recipes/mac", html);
        let recipe = FoodNetworkScraper.scrape(&context).recipe.unwrap();

        assert_eq!(recipe.title, "Baked Macaroni and Cheese");
        assert_eq!(
            recipe.ingredients,
            vec!["1/2 pound elbow macaroni", "3 tablespoons butter"]
        );
    }
}
