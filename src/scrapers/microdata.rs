use log::debug;
use scraper::{ElementRef, Html};

use super::{absolutize, element_text, parse_selector, ParsingContext};
use crate::error::ScraperError;
use crate::model::RecipeDraft;
use crate::text::{clean_text, normalize_duration, parse_servings};

/// The first element whose itemtype is a schema.org Recipe.
fn find_recipe_container(document: &Html) -> Result<Option<ElementRef<'_>>, ScraperError> {
    let selector = parse_selector("[itemscope][itemtype]")?;
    Ok(document.select(&selector).find(|element| {
        element.value().attr("itemtype").is_some_and(|t| {
            t.contains("schema.org/Recipe") || t.contains("data-vocabulary.org/Recipe")
        })
    }))
}

/// Value of an itemprop: machine-readable attributes first, then text.
fn prop_value(element: ElementRef) -> String {
    let value = element.value();
    for attr in ["content", "datetime"] {
        if let Some(v) = value.attr(attr) {
            let v = clean_text(v);
            if !v.is_empty() {
                return v;
            }
        }
    }
    element_text(element)
}

fn get_itemprop(root: ElementRef, prop: &str) -> Result<Option<String>, ScraperError> {
    let selector = parse_selector(&format!("[itemprop='{prop}']"))?;
    Ok(root.select(&selector).map(prop_value).find(|v| !v.is_empty()))
}

fn get_itemprop_list(root: ElementRef, prop: &str) -> Result<Vec<String>, ScraperError> {
    let selector = parse_selector(&format!("[itemprop='{prop}']"))?;
    Ok(root
        .select(&selector)
        .map(prop_value)
        .filter(|v| !v.is_empty())
        .collect())
}

/// Read a schema.org Recipe declared with microdata attributes.
///
/// Properties are only read inside the Recipe container; page-wide
/// `itemprop="name"` matches are usually the site or the author.
pub fn extract_microdata(context: &ParsingContext) -> Result<RecipeDraft, ScraperError> {
    let container = find_recipe_container(&context.document)?
        .ok_or_else(|| ScraperError::NotFound("no microdata Recipe container".to_string()))?;
    debug!("Found microdata Recipe container on {}", context.url);

    let name = get_itemprop(container, "name")?
        .ok_or_else(|| ScraperError::StructuredData("microdata Recipe has no name".to_string()))?;
    let mut draft = RecipeDraft::new(name, &context.url);

    draft.description = get_itemprop(container, "description")?;

    let image_selector = parse_selector("[itemprop='image']")?;
    draft.image = container.select(&image_selector).find_map(|el| {
        let value = el.value();
        ["src", "content", "href"]
            .iter()
            .filter_map(|attr| value.attr(attr))
            .find_map(|src| absolutize(&context.url, src))
    });

    draft.prep_time = get_itemprop(container, "prepTime")?.and_then(|t| normalize_duration(&t));
    draft.cook_time = get_itemprop(container, "cookTime")?.and_then(|t| normalize_duration(&t));
    draft.total_time = get_itemprop(container, "totalTime")?.and_then(|t| normalize_duration(&t));
    draft.servings = get_itemprop(container, "recipeYield")?.and_then(|y| parse_servings(&y));
    draft.difficulty = get_itemprop(container, "difficulty")?;

    draft.ingredients = get_itemprop_list(container, "recipeIngredient")?;
    if draft.ingredients.is_empty() {
        draft.ingredients = get_itemprop_list(container, "ingredients")?;
    }

    // recipeInstructions is either one element per step or a single block
    let steps = get_itemprop_list(container, "recipeInstructions")?;
    draft.instructions = if steps.len() == 1 {
        let block_selector = parse_selector("[itemprop='recipeInstructions'] li")?;
        let items: Vec<String> = container
            .select(&block_selector)
            .map(element_text)
            .filter(|s| !s.is_empty())
            .collect();
        if items.is_empty() {
            steps
        } else {
            items
        }
    } else {
        steps
    };

    for prop in ["keywords", "recipeCategory", "recipeCuisine"] {
        if let Some(value) = get_itemprop(container, prop)? {
            for tag in value.split(',') {
                draft.add_tag(tag);
            }
        }
    }

    Ok(draft)
}
