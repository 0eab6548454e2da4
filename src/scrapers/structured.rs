//! First extraction stage: schema.org Recipe nodes embedded as JSON-LD.

use log::debug;
use regex::Regex;
use scraper::Html;
use serde_json::Value;
use std::sync::LazyLock;

use super::{absolutize, parse_selector, ParsingContext};
use crate::error::ScraperError;
use crate::model::RecipeDraft;
use crate::normalizer::JsonLdNormalizer;
use crate::text::{clean_text, normalize_duration, parse_servings};

const MAX_DEPTH: usize = 16;

static TRAILING_COMMA_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("Invalid trailing comma regex"));

static BLOCK_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*(?:br|/p|/li|/div)\s*/?\s*>").expect("Invalid block tag regex")
});

/// Strip the wrapping some CMSes put around JSON-LD payloads.
fn sanitize_json(json_str: &str) -> String {
    let mut cleaned = json_str
        .trim()
        .replace("<!--", "")
        .replace("-->", "")
        .replace("<![CDATA[", "")
        .replace("]]>", "");

    if !cleaned.starts_with('{') && !cleaned.starts_with('[') {
        if let Some(start) = cleaned.find(['{', '[']) {
            cleaned = cleaned[start..].to_string();
        }
    }

    TRAILING_COMMA_REGEX.replace_all(&cleaned, "$1").into_owned()
}

fn parse_block(raw: &str) -> Option<Value> {
    serde_json::from_str::<Value>(raw)
        .or_else(|_| serde_json::from_str::<Value>(&sanitize_json(raw)))
        .ok()
}

fn is_recipe_type(value: &Value) -> bool {
    let is_recipe = |t: &str| {
        let t = t.rsplit(['/', ':']).next().unwrap_or(t);
        t.eq_ignore_ascii_case("recipe")
    };
    match value.get("@type") {
        Some(Value::String(t)) => is_recipe(t),
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).any(is_recipe),
        _ => false,
    }
}

/// Depth-first search for the first Recipe node, looking through `@graph`,
/// arrays and nested properties such as `mainEntity`.
pub fn find_recipe_node(value: &Value) -> Option<&Value> {
    fn search(value: &Value, depth: usize) -> Option<&Value> {
        if depth > MAX_DEPTH {
            return None;
        }
        match value {
            Value::Object(map) => {
                if is_recipe_type(value) {
                    return Some(value);
                }
                for key in ["@graph", "mainEntity", "mainEntityOfPage"] {
                    if let Some(found) = map.get(key).and_then(|v| search(v, depth + 1)) {
                        return Some(found);
                    }
                }
                map.iter()
                    .filter(|(k, _)| !matches!(k.as_str(), "@graph" | "mainEntity" | "mainEntityOfPage"))
                    .find_map(|(_, v)| search(v, depth + 1))
            }
            Value::Array(items) => items.iter().find_map(|v| search(v, depth + 1)),
            _ => None,
        }
    }
    search(value, 0)
}

/// The first Recipe node across all JSON-LD blocks of the page.
pub fn find_json_ld_recipe(document: &Html) -> Result<Option<Value>, ScraperError> {
    let selector = parse_selector("script[type='application/ld+json']")?;

    for (index, script) in document.select(&selector).enumerate() {
        let raw = script.inner_html();
        let Some(block) = parse_block(&raw) else {
            debug!("JSON-LD block {} could not be parsed", index);
            continue;
        };
        if let Some(recipe) = find_recipe_node(&block) {
            debug!("Found Recipe node in JSON-LD block {}", index);
            return Ok(Some(recipe.clone()));
        }
    }

    Ok(None)
}

/// Locate, repair and convert the page's JSON-LD recipe.
///
/// Returns the draft together with the normalizer's issues.
pub fn run_json_ld_stage(
    context: &ParsingContext,
) -> Result<Option<(RecipeDraft, Vec<String>)>, ScraperError> {
    let Some(node) = find_json_ld_recipe(&context.document)? else {
        return Ok(None);
    };
    let normalized = JsonLdNormalizer::normalize(&node, &context.hostname);
    let draft = recipe_from_json_ld(&normalized.recipe, &context.url);
    Ok(Some((draft, normalized.issues)))
}

fn string_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => clean_text(s),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => return items.iter().find_map(string_value),
        Value::Object(map) => {
            return ["@value", "text", "name"]
                .iter()
                .find_map(|k| map.get(*k).and_then(string_value))
        }
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn image_value(value: &Value, page_url: &str) -> Option<String> {
    match value {
        Value::String(s) => absolutize(page_url, s),
        Value::Array(items) => items.iter().find_map(|v| image_value(v, page_url)),
        Value::Object(map) => ["url", "contentUrl", "@id"]
            .iter()
            .find_map(|k| map.get(*k).and_then(|v| image_value(v, page_url))),
        _ => None,
    }
}

fn lines_of(text: &str) -> Vec<String> {
    let with_breaks = BLOCK_TAG_REGEX.replace_all(text, "\n");
    with_breaks
        .lines()
        .map(clean_text)
        .filter(|line| !line.is_empty())
        .collect()
}

fn ingredient_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => lines_of(s),
        Value::Array(items) => items.iter().filter_map(string_value).collect(),
        other => string_value(other).into_iter().collect(),
    }
}

fn collect_instructions(value: &Value, out: &mut Vec<String>, depth: usize) {
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::String(s) => out.extend(lines_of(s)),
        Value::Array(items) => {
            for item in items {
                collect_instructions(item, out, depth + 1);
            }
        }
        Value::Object(map) => {
            if let Some(children) = map.get("itemListElement") {
                collect_instructions(children, out, depth + 1);
            } else if let Some(text) = ["text", "name", "description"]
                .iter()
                .find_map(|k| map.get(*k).and_then(string_value))
            {
                out.push(text);
            }
        }
        _ => {}
    }
}

fn servings_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|s| *s > 0.0),
        Value::String(s) => parse_servings(s),
        Value::Array(items) => items.iter().find_map(servings_value),
        _ => None,
    }
}

fn tag_values(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s.split(',').map(clean_text).collect(),
        Value::Array(items) => items.iter().flat_map(tag_values).collect(),
        _ => Vec::new(),
    }
}

/// Convert a (repaired) schema.org Recipe node into a draft.
pub fn recipe_from_json_ld(node: &Value, page_url: &str) -> RecipeDraft {
    let field = |key: &str| node.get(key).and_then(string_value);
    let duration = |key: &str| field(key).and_then(|d| normalize_duration(&d));

    let mut draft = RecipeDraft::new(
        field("name").or_else(|| field("headline")).unwrap_or_default(),
        page_url,
    );
    draft.description = field("description");
    draft.image = node.get("image").and_then(|v| image_value(v, page_url));
    draft.prep_time = duration("prepTime");
    draft.cook_time = duration("cookTime");
    draft.total_time = duration("totalTime");
    draft.servings = node.get("recipeYield").and_then(servings_value);
    draft.difficulty = field("difficulty").or_else(|| field("educationalLevel"));

    draft.ingredients = node
        .get("recipeIngredient")
        .or_else(|| node.get("ingredients"))
        .map(ingredient_list)
        .unwrap_or_default();

    if let Some(instructions) = node.get("recipeInstructions") {
        collect_instructions(instructions, &mut draft.instructions, 0);
    }

    for key in ["keywords", "recipeCategory", "recipeCuisine"] {
        if let Some(value) = node.get(key) {
            for tag in tag_values(value) {
                draft.add_tag(&tag);
            }
        }
    }

    draft
}
