//! Second extraction stage: ordered CSS selector lists per field.

use log::debug;
use scraper::{ElementRef, Html};

use super::{absolutize, element_text, parse_selector, ParsingContext};
use crate::error::ScraperError;
use crate::model::RecipeDraft;
use crate::text::{normalize_duration, parse_servings};

/// Candidate selectors per field, tried in order. The first selector that
/// yields a non-empty value wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorSet {
    pub title: &'static [&'static str],
    pub description: &'static [&'static str],
    pub image: &'static [&'static str],
    pub ingredients: &'static [&'static str],
    pub instructions: &'static [&'static str],
    pub prep_time: &'static [&'static str],
    pub cook_time: &'static [&'static str],
    pub total_time: &'static [&'static str],
    pub servings: &'static [&'static str],
    pub difficulty: &'static [&'static str],
}

/// Text of an element, preferring machine-readable attributes.
fn field_value(element: ElementRef) -> String {
    let value = element.value();
    for attr in ["content", "datetime"] {
        if let Some(v) = value.attr(attr) {
            let v = crate::text::clean_text(v);
            if !v.is_empty() {
                return v;
            }
        }
    }
    element_text(element)
}

fn first_text(document: &Html, selectors: &[&str]) -> Result<Option<String>, ScraperError> {
    for selector in selectors {
        let parsed = parse_selector(selector)?;
        let found = document
            .select(&parsed)
            .map(field_value)
            .find(|text| !text.is_empty());
        if let Some(text) = found {
            debug!("Matched '{}'", selector);
            return Ok(Some(text));
        }
    }
    Ok(None)
}

fn all_texts(document: &Html, selectors: &[&str]) -> Result<Vec<String>, ScraperError> {
    for selector in selectors {
        let parsed = parse_selector(selector)?;
        let items: Vec<String> = document
            .select(&parsed)
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect();
        if !items.is_empty() {
            debug!("Matched {} items with '{}'", items.len(), selector);
            return Ok(items);
        }
    }
    Ok(Vec::new())
}

fn first_image(context: &ParsingContext, selectors: &[&str]) -> Result<Option<String>, ScraperError> {
    for selector in selectors {
        let parsed = parse_selector(selector)?;
        let found = context.document.select(&parsed).find_map(|el| {
            let value = el.value();
            ["content", "data-src", "data-lazy-src", "src", "href"]
                .iter()
                .filter_map(|attr| value.attr(attr))
                .find_map(|src| absolutize(&context.url, src))
        });
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

/// Build a draft from `selectors`. Fails when no title can be found.
pub fn run_selector_stage(
    context: &ParsingContext,
    selectors: &SelectorSet,
) -> Result<RecipeDraft, ScraperError> {
    let document = &context.document;

    let title = first_text(document, selectors.title)?
        .ok_or_else(|| ScraperError::NotFound("no title matched".to_string()))?;

    let mut draft = RecipeDraft::new(title, &context.url);
    draft.description = first_text(document, selectors.description)?;
    draft.image = first_image(context, selectors.image)?;
    draft.ingredients = all_texts(document, selectors.ingredients)?;
    draft.instructions = all_texts(document, selectors.instructions)?;
    draft.prep_time = first_text(document, selectors.prep_time)?.and_then(|t| normalize_duration(&t));
    draft.cook_time = first_text(document, selectors.cook_time)?.and_then(|t| normalize_duration(&t));
    draft.total_time =
        first_text(document, selectors.total_time)?.and_then(|t| normalize_duration(&t));
    draft.servings = first_text(document, selectors.servings)?.and_then(|s| parse_servings(&s));
    draft.difficulty = first_text(document, selectors.difficulty)?;

    Ok(draft)
}
