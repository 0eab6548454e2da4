use log::debug;
use scraper::{ElementRef, Html};
use std::collections::HashMap;
use std::sync::LazyLock;

use super::{element_text, parse_selector, ParsingContext, SiteScraper};
use crate::error::ScraperError;
use crate::model::{ExtractionMethod, ExtractionResult, RecipeDraft};
use crate::scoring::calculate_confidence;
use crate::text::{normalize_duration, parse_servings};

/// Fuzzy matches longer than this are probably a whole page section.
const MAX_FUZZY_TEXT: usize = 5000;
const MIN_ITEM_CHARS: usize = 5;
const MAX_ITEM_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    Title,
    Description,
    Ingredients,
    Instructions,
    PrepTime,
    CookTime,
    TotalTime,
    Servings,
    Difficulty,
}

struct ClassMatchers {
    exact: HashMap<Field, Vec<&'static str>>,
    fuzzy: HashMap<Field, Vec<&'static str>>,
}

static MATCHERS: LazyLock<ClassMatchers> = LazyLock::new(ClassMatchers::new);

impl ClassMatchers {
    fn new() -> Self {
        let mut exact = HashMap::new();
        let mut fuzzy = HashMap::new();

        exact.insert(
            Field::Title,
            vec![
                "wprm-recipe-name",
                "tasty-recipes-title",
                "mv-create-title",
                "recipe-name",
                "recipe-title",
                "recipe-card-title",
                "recipe-header-title",
                "wpzoom-recipe-card-title",
                "recipe-card__title",
            ],
        );
        exact.insert(
            Field::Description,
            vec![
                "wprm-recipe-summary",
                "recipe-summary",
                "recipe-description",
                "mv-create-description",
                "tasty-recipes-description",
                "recipe-card-summary",
                "recipe-intro",
            ],
        );
        exact.insert(
            Field::Ingredients,
            vec![
                "wprm-recipe-ingredients-container",
                "tasty-recipes-ingredients",
                "mv-create-ingredients",
                "recipe-ingredients",
                "recipe-ingredient-list",
                "recipe-card-ingredients",
                "wpzoom-recipe-ingredients",
                "structured-ingredients",
                "ingredients",
            ],
        );
        exact.insert(
            Field::Instructions,
            vec![
                "wprm-recipe-instructions-container",
                "tasty-recipes-instructions",
                "mv-create-instructions",
                "recipe-instructions",
                "recipe-instruction-list",
                "recipe-card-instructions",
                "wpzoom-recipe-instructions",
                "structured-instructions",
                "recipe-directions",
                "directions",
                "instructions",
                "method",
            ],
        );
        exact.insert(
            Field::PrepTime,
            vec!["wprm-recipe-prep-time", "recipe-prep-time", "prep-time", "tasty-recipes-prep-time"],
        );
        exact.insert(
            Field::CookTime,
            vec!["wprm-recipe-cook-time", "recipe-cook-time", "cook-time", "tasty-recipes-cook-time"],
        );
        exact.insert(
            Field::TotalTime,
            vec!["wprm-recipe-total-time", "recipe-total-time", "total-time", "tasty-recipes-total-time"],
        );
        exact.insert(
            Field::Servings,
            vec![
                "wprm-recipe-servings",
                "recipe-yield",
                "recipe-servings",
                "tasty-recipes-yield",
                "mv-create-yield",
                "servings",
            ],
        );

        exact.insert(
            Field::Difficulty,
            vec![
                "wprm-recipe-difficulty",
                "tasty-recipes-difficulty",
                "mv-create-difficulty",
                "recipe-difficulty",
                "difficulty",
            ],
        );

        fuzzy.insert(Field::Title, vec!["recipe-title", "recipe-name"]);
        fuzzy.insert(Field::Description, vec!["summary", "description"]);
        fuzzy.insert(Field::Ingredients, vec!["ingredient"]);
        fuzzy.insert(Field::Instructions, vec!["instruction", "direction", "step"]);

        ClassMatchers { exact, fuzzy }
    }

    fn find_by_class(&self, document: &Html, field: Field) -> Result<Option<String>, ScraperError> {
        for class_name in self.exact.get(&field).into_iter().flatten() {
            let selector = parse_selector(&format!(".{class_name}"))?;
            if let Some(text) = document.select(&selector).map(element_text).find(|t| !t.is_empty()) {
                debug!("Found {:?} using exact class: {}", field, class_name);
                return Ok(Some(text));
            }
        }

        for pattern in self.fuzzy.get(&field).into_iter().flatten() {
            let selector = parse_selector(&format!("[class*='{pattern}']"))?;
            if let Some(text) = document
                .select(&selector)
                .map(element_text)
                .find(|t| !t.is_empty() && t.len() < MAX_FUZZY_TEXT)
            {
                debug!("Found {:?} using fuzzy class pattern: {}", field, pattern);
                return Ok(Some(text));
            }
        }

        Ok(None)
    }

    /// List entries inside the first matching container: `li` elements, or
    /// short `p`/`div`/`span` blocks when the container has no list.
    fn extract_list_items(&self, document: &Html, field: Field) -> Result<Vec<String>, ScraperError> {
        let li = parse_selector("li")?;
        let blocks = parse_selector("p, div, span")?;

        let exact = self
            .exact
            .get(&field)
            .into_iter()
            .flatten()
            .map(|class_name| format!(".{class_name}"));
        let fuzzy = self
            .fuzzy
            .get(&field)
            .into_iter()
            .flatten()
            .map(|pattern| format!("[class*='{pattern}']"));

        for selector_str in exact.chain(fuzzy) {
            let selector = parse_selector(&selector_str)?;
            let mut items = Vec::new();

            for container in document.select(&selector) {
                items.extend(items_in(container, &li, &blocks));
            }

            if !items.is_empty() {
                debug!("Found {} {:?} using selector: {}", items.len(), field, selector_str);
                return Ok(items);
            }
        }

        Ok(Vec::new())
    }
}

fn items_in(
    container: ElementRef,
    li: &scraper::Selector,
    blocks: &scraper::Selector,
) -> Vec<String> {
    let items: Vec<String> = container
        .select(li)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();
    if !items.is_empty() {
        return items;
    }
    container
        .select(blocks)
        // leaf blocks only, or nested wrappers would repeat their children
        .filter(|el| el.select(blocks).next().is_none())
        .map(element_text)
        .filter(|t| (MIN_ITEM_CHARS..MAX_ITEM_CHARS).contains(&t.len()))
        .collect()
}

/// Last-resort extractor keyed on the class names recipe plugins and themes
/// commonly use, with an `h1`/`h2` title fallback.
pub struct HtmlClassExtractor;

impl HtmlClassExtractor {
    fn extract(&self, context: &ParsingContext) -> Result<RecipeDraft, ScraperError> {
        let matchers = &*MATCHERS;
        let document = &context.document;

        let title = match matchers.find_by_class(document, Field::Title)? {
            Some(title) => title,
            None => {
                let headings = parse_selector("h1, h2")?;
                document
                    .select(&headings)
                    .map(element_text)
                    .find(|t| !t.is_empty())
                    .ok_or_else(|| ScraperError::NotFound("could not extract recipe title".to_string()))?
            }
        };

        let mut draft = RecipeDraft::new(title, &context.url);
        draft.description = matchers.find_by_class(document, Field::Description)?;
        draft.ingredients = matchers.extract_list_items(document, Field::Ingredients)?;
        draft.instructions = matchers.extract_list_items(document, Field::Instructions)?;

        if draft.ingredients.is_empty() && draft.instructions.is_empty() {
            return Err(ScraperError::NotFound("could not extract recipe content".to_string()));
        }

        let duration = |field| -> Result<Option<String>, ScraperError> {
            Ok(matchers
                .find_by_class(document, field)?
                .and_then(|t| normalize_duration(&t)))
        };
        draft.prep_time = duration(Field::PrepTime)?;
        draft.cook_time = duration(Field::CookTime)?;
        draft.total_time = duration(Field::TotalTime)?;
        draft.servings = matchers
            .find_by_class(document, Field::Servings)?
            .and_then(|s| parse_servings(&s));
        draft.difficulty = matchers.find_by_class(document, Field::Difficulty)?;

        Ok(draft)
    }
}

impl SiteScraper for HtmlClassExtractor {
    fn name(&self) -> &'static str {
        "html-class"
    }

    fn can_handle(&self, _hostname: &str) -> bool {
        true
    }

    fn scrape(&self, context: &ParsingContext) -> ExtractionResult {
        debug!("Attempting to extract recipe using HTML class matchers");
        match self.extract(context) {
            Ok(draft) => {
                debug!(
                    "Class matchers found {} ingredients and {} instructions",
                    draft.ingredients.len(),
                    draft.instructions.len()
                );
                let method = ExtractionMethod::CssSelectors;
                let confidence = calculate_confidence(&draft, &method, &context.hostname);
                ExtractionResult::found(draft, confidence, method)
            }
            Err(e) => ExtractionResult::not_found(ExtractionMethod::CssSelectors, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrape(html: &str) -> ExtractionResult {
        HtmlClassExtractor.scrape(&ParsingContext::new("https://example.com/recipe", html))
    }

    #[test]
    fn test_exact_classes() {
        let result = scrape(
            r#"<html><body>
                <h1>Site header</h1>
                <h2 class="tasty-recipes-title">Garlic Bread</h2>
                <div class="tasty-recipes-ingredients"><ul>
                    <li>1 baguette</li><li>4 cloves garlic</li><li>1/2 cup butter</li>
                </ul></div>
                <div class="tasty-recipes-instructions"><ol>
                    <li>Mix butter and garlic.</li><li>Spread and bake.</li>
                </ol></div>
                <span class="tasty-recipes-prep-time">10 minutes</span>
                <span class="tasty-recipes-yield">8</span>
                <span class="tasty-recipes-difficulty">Easy</span>
            </body></html>"#,
        );
        let recipe = result.recipe.as_ref().unwrap();
        assert_eq!(result.method, ExtractionMethod::CssSelectors);
        assert_eq!(recipe.title, "Garlic Bread");
        assert_eq!(recipe.ingredients.len(), 3);
        assert_eq!(recipe.instructions.len(), 2);
        assert_eq!(recipe.prep_time.as_deref(), Some("PT10M"));
        assert_eq!(recipe.servings, Some(8.0));
        assert_eq!(recipe.difficulty.as_deref(), Some("Easy"));
    }

    #[test]
    fn test_heading_fallback_and_paragraph_items() {
        let result = scrape(
            r#"<html><body>
                <h1>Grandma's Pie</h1>
                <section class="pie-ingredients-block">
                    <p>2 cups flour</p><p>1 cup cold butter</p>
                </section>
            </body></html>"#,
        );
        let recipe = result.recipe.unwrap();
        assert_eq!(recipe.title, "Grandma's Pie");
        assert_eq!(recipe.ingredients, vec!["2 cups flour", "1 cup cold butter"]);
        assert!(recipe.instructions.is_empty());
    }

    #[test]
    fn test_no_content() {
        let result = scrape("<html><body><h1>Contact</h1></body></html>");
        assert!(result.recipe.is_none());
        assert_eq!(result.issues.len(), 1);
    }
}
