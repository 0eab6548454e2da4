//! Narrowing a page down to what is worth sending to the model.

use scraper::{ElementRef, Html};

use crate::model::RecipeDraft;
use crate::scrapers::{absolutize, element_text, parse_selector};
use crate::text::{collapse_whitespace, normalize_duration, truncate_chars};

const FAST_MAX_INGREDIENTS: usize = 10;
const FAST_MAX_INSTRUCTIONS: usize = 8;
/// A container with less text than this is a card stub, not the recipe.
const MIN_CONTAINER_CHARS: usize = 200;

const RECIPE_CONTAINERS: &[&str] = &[
    "[itemtype*='schema.org/Recipe']",
    ".wprm-recipe-container",
    ".tasty-recipes",
    ".mv-create-card",
    ".recipe-card",
    "[class*='recipe-content']",
    ".recipe",
    "article",
    "main",
];

const FAST_INGREDIENTS: &[&str] = &[
    "[itemprop='recipeIngredient']",
    "[class*='ingredient'] li",
    ".ingredients li",
];

const FAST_INSTRUCTIONS: &[&str] = &[
    "[itemprop='recipeInstructions'] li",
    "[class*='instruction'] li",
    "[class*='direction'] li",
    "[class*='step'] li",
    ".method li",
];

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Text a reader would see: script, style and similar contents are skipped.
pub fn visible_text(element: ElementRef) -> String {
    let text: Vec<&str> = element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| SKIPPED_ELEMENTS.contains(&e.name()))
            });
            (!hidden).then_some(&**text)
        })
        .collect();
    collapse_whitespace(&text.join(" "))
}

fn list(document: &Html, selectors: &[&str], max: usize) -> Vec<String> {
    selectors
        .iter()
        .filter_map(|s| parse_selector(s).ok())
        .map(|selector| {
            document
                .select(&selector)
                .map(element_text)
                .filter(|t| !t.is_empty())
                .take(max)
                .collect::<Vec<_>>()
        })
        .find(|items| !items.is_empty())
        .unwrap_or_default()
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = parse_selector(selector).ok()?;
    document
        .select(&selector)
        .map(element_text)
        .find(|t| !t.is_empty())
}

/// Selector heuristics only, no model call. `None` when the page has
/// neither ingredients nor instructions in a recognizable list.
pub fn fast_extract(document: &Html, url: &str, hints: Option<&RecipeDraft>) -> Option<RecipeDraft> {
    let ingredients = list(document, FAST_INGREDIENTS, FAST_MAX_INGREDIENTS);
    let instructions = list(document, FAST_INSTRUCTIONS, FAST_MAX_INSTRUCTIONS);
    if ingredients.is_empty() && instructions.is_empty() {
        return None;
    }

    let title = hints
        .map(|h| h.title.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| first_text(document, "h1"))
        .or_else(|| first_text(document, "title"))?;

    let mut draft = RecipeDraft::new(title, url);
    draft.ingredients = ingredients;
    draft.instructions = instructions;
    Some(draft)
}

/// The first recipe-looking container with enough text, else the body.
pub fn detailed_content(document: &Html, budget: usize) -> String {
    let container = RECIPE_CONTAINERS
        .iter()
        .filter_map(|s| parse_selector(s).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .map(visible_text)
                .find(|t| t.chars().count() >= MIN_CONTAINER_CHARS)
        });

    let text = container.unwrap_or_else(|| page_text(document));
    truncate_chars(&text, budget).to_string()
}

pub fn page_text(document: &Html) -> String {
    match parse_selector("body")
        .ok()
        .and_then(|s| document.select(&s).next())
    {
        Some(body) => visible_text(body),
        None => visible_text(document.root_element()),
    }
}

/// Fields the aggressive level copies from page metadata when the model
/// left them out.
#[derive(Debug, Clone, Default)]
pub struct MetaBackfill {
    pub image: Option<String>,
    pub prep_time: Option<String>,
}

impl MetaBackfill {
    pub fn from_document(document: &Html, url: &str) -> Self {
        let attr = |selector: &str, attrs: &[&str]| -> Option<String> {
            let selector = parse_selector(selector).ok()?;
            document.select(&selector).find_map(|el| {
                attrs
                    .iter()
                    .filter_map(|a| el.value().attr(a))
                    .map(str::trim)
                    .find(|v| !v.is_empty())
                    .map(str::to_string)
            })
        };

        let image = attr("meta[property='og:image']", &["content"])
            .or_else(|| attr("meta[name='twitter:image']", &["content"]))
            .and_then(|src| absolutize(url, &src));
        let prep_time = attr("[itemprop='prepTime']", &["content", "datetime"])
            .and_then(|t| normalize_duration(&t));

        Self { image, prep_time }
    }

    pub fn apply(&self, draft: &mut RecipeDraft) {
        if draft.image.is_none() {
            draft.image = self.image.clone();
        }
        if draft.prep_time.is_none() {
            draft.prep_time = self.prep_time.clone();
        }
    }
}
