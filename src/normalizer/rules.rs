use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::error::NormalizationError;
use crate::scrapers::host_matches;
use crate::text::{collapse_whitespace, minutes_to_iso, parse_free_text_duration, parse_iso_duration};

const INSTRUCTIONS: &str = "recipeInstructions";
const INGREDIENTS: &str = "recipeIngredient";
const DURATION_FIELDS: [&str; 3] = ["prepTime", "cookTime", "totalTime"];

/// Repairs that only some publishers need.
///
/// Variant order is application order: structural rules run before text
/// rules so the text rules see the flattened steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RepairRule {
    FlattenInstructionSections,
    UnwrapIngredientObjects,
    StripEditorialTips,
    StripCommunityAsides,
    TranslateRegionalTerms,
}

/// Publisher domain to the rules it needs. Subdomains match, substrings do not.
const HOST_RULES: &[(&str, &[RepairRule])] = &[
    (
        "allrecipes.com",
        &[
            RepairRule::FlattenInstructionSections,
            RepairRule::UnwrapIngredientObjects,
        ],
    ),
    (
        "seriouseats.com",
        &[
            RepairRule::FlattenInstructionSections,
            RepairRule::StripEditorialTips,
        ],
    ),
    ("simplyrecipes.com", &[RepairRule::FlattenInstructionSections]),
    (
        "foodnetwork.com",
        &[
            RepairRule::UnwrapIngredientObjects,
            RepairRule::StripEditorialTips,
        ],
    ),
    (
        "delish.com",
        &[
            RepairRule::UnwrapIngredientObjects,
            RepairRule::StripEditorialTips,
        ],
    ),
    (
        "tasteofhome.com",
        &[
            RepairRule::FlattenInstructionSections,
            RepairRule::StripCommunityAsides,
        ],
    ),
    ("food.com", &[RepairRule::StripCommunityAsides]),
    (
        "bbcgoodfood.com",
        &[
            RepairRule::FlattenInstructionSections,
            RepairRule::TranslateRegionalTerms,
        ],
    ),
    ("bbc.co.uk", &[RepairRule::TranslateRegionalTerms]),
    ("jamieoliver.com", &[RepairRule::TranslateRegionalTerms]),
    ("nigella.com", &[RepairRule::TranslateRegionalTerms]),
];

/// Regional ingredient names and their US equivalents.
const REGIONAL_TERMS: &[(&str, &str)] = &[
    ("caster sugar", "superfine sugar"),
    ("icing sugar", "powdered sugar"),
    ("plain flour", "all-purpose flour"),
    ("self-raising flour", "self-rising flour"),
    ("bicarbonate of soda", "baking soda"),
    ("double cream", "heavy cream"),
    ("single cream", "light cream"),
    ("cornflour", "cornstarch"),
    ("courgettes", "zucchini"),
    ("courgette", "zucchini"),
    ("aubergines", "eggplants"),
    ("aubergine", "eggplant"),
    ("spring onions", "scallions"),
    ("spring onion", "scallion"),
    ("beef mince", "ground beef"),
    ("prawns", "shrimp"),
    ("streaky bacon", "bacon"),
];

static REGIONAL_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    REGIONAL_TERMS
        .iter()
        .map(|(from, to)| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(from));
            (Regex::new(&pattern).expect("Invalid regional term regex"), *to)
        })
        .collect()
});

static EDITORIAL_TIP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:tips?|notes?|variations?|cook'?s notes?|chef'?s tips?|make[- ]ahead|storage|serving suggestion)\s*:",
    )
    .expect("Invalid editorial tip regex")
});

static COMMUNITY_ASIDE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s*\((?:this is what i do|i (?:always|usually|like to|prefer|use|find)[^()]*|my (?:family|kids|husband|wife|favorite)[^()]*|trust me[^()]*|optional,? but[^()]*|you can thank me later)\)",
    )
    .expect("Invalid community aside regex")
});

static SENTENCE_END_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+(?:\s+|$)").expect("Invalid sentence regex"));

static SPACE_BEFORE_PUNCT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([.,;:!?])").expect("Invalid punctuation regex"));

impl RepairRule {
    pub fn name(self) -> &'static str {
        match self {
            RepairRule::FlattenInstructionSections => "flatten-instruction-sections",
            RepairRule::UnwrapIngredientObjects => "unwrap-ingredient-objects",
            RepairRule::StripEditorialTips => "strip-editorial-tips",
            RepairRule::StripCommunityAsides => "strip-community-asides",
            RepairRule::TranslateRegionalTerms => "translate-regional-terms",
        }
    }

    /// Apply the rule in place, reporting whether anything changed.
    pub fn apply(self, recipe: &mut Map<String, Value>) -> Result<bool, NormalizationError> {
        match self {
            RepairRule::FlattenInstructionSections => flatten_instruction_sections(recipe),
            RepairRule::UnwrapIngredientObjects => unwrap_ingredient_objects(recipe),
            RepairRule::StripEditorialTips => strip_editorial_tips(recipe),
            RepairRule::StripCommunityAsides => Ok(rewrite_instruction_texts(recipe, |text| {
                let stripped = COMMUNITY_ASIDE_REGEX.replace_all(text, "");
                if stripped == text {
                    return None;
                }
                let tidied = SPACE_BEFORE_PUNCT_REGEX.replace_all(&stripped, "$1");
                Some(collapse_whitespace(&tidied))
            })),
            RepairRule::TranslateRegionalTerms => Ok(translate_regional_terms(recipe)),
        }
    }
}

/// Rules for a hostname, deduplicated, in application order.
pub fn rules_for_host(hostname: &str) -> Vec<RepairRule> {
    let mut rules = Vec::new();
    for (domain, host_rules) in HOST_RULES {
        if host_matches(hostname, domain) {
            for rule in host_rules.iter() {
                if !rules.contains(rule) {
                    rules.push(*rule);
                }
            }
        }
    }
    rules.sort();
    rules
}

fn type_matches(value: &Value, wanted: &[&str]) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => wanted.iter().any(|w| t.eq_ignore_ascii_case(w)),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| wanted.iter().any(|w| t.eq_ignore_ascii_case(w))),
        _ => false,
    }
}

fn is_step_container(value: &Value) -> bool {
    if !value.is_object() || value.get("itemListElement").is_none() {
        return false;
    }
    type_matches(value, &["HowToSection", "ItemList"])
        || value.get("text").and_then(Value::as_str).is_none()
}

fn collect_steps(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_steps(item, out)),
        v if is_step_container(v) => {
            if let Some(children) = v.get("itemListElement") {
                collect_steps(children, out);
            }
        }
        other => out.push(other.clone()),
    }
}

fn flatten_instruction_sections(recipe: &mut Map<String, Value>) -> Result<bool, NormalizationError> {
    let Some(instructions) = recipe.get(INSTRUCTIONS) else {
        return Ok(false);
    };
    match instructions {
        Value::String(_) | Value::Null => return Ok(false),
        Value::Array(_) | Value::Object(_) => {}
        other => {
            return Err(NormalizationError::Rule {
                rule: RepairRule::FlattenInstructionSections.name(),
                reason: format!("unexpected instruction value {other}"),
            })
        }
    }

    let mut steps = Vec::new();
    collect_steps(instructions, &mut steps);
    let flattened = Value::Array(steps);
    if &flattened == instructions {
        return Ok(false);
    }
    recipe.insert(INSTRUCTIONS.to_string(), flattened);
    Ok(true)
}

fn ingredient_text(object: &Map<String, Value>) -> Option<String> {
    let text_of = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    if let Some(text) = text_of("text") {
        return Some(text.to_string());
    }
    let name = text_of("name").or_else(|| text_of("description"))?;
    let amount = object
        .get("amount")
        .and_then(|a| match a {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty());
    Some(match amount {
        Some(amount) => format!("{amount} {name}"),
        None => name.to_string(),
    })
}

fn collect_ingredients(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_ingredients(item, out)),
        Value::Object(object) => {
            if let Some(text) = ingredient_text(object) {
                out.push(Value::String(text));
            } else if let Some(nested) = object.get("itemListElement") {
                collect_ingredients(nested, out);
            }
        }
        Value::Number(n) => out.push(Value::String(n.to_string())),
        Value::String(_) => out.push(value.clone()),
        _ => {}
    }
}

fn unwrap_ingredient_objects(recipe: &mut Map<String, Value>) -> Result<bool, NormalizationError> {
    let Some(ingredients) = recipe.get(INGREDIENTS) else {
        return Ok(false);
    };
    match ingredients {
        Value::Array(_) => {}
        Value::String(_) | Value::Null => return Ok(false),
        other => {
            return Err(NormalizationError::Rule {
                rule: RepairRule::UnwrapIngredientObjects.name(),
                reason: format!("unexpected ingredient value {other}"),
            })
        }
    }

    let mut flat = Vec::new();
    collect_ingredients(ingredients, &mut flat);
    let flat = Value::Array(flat);
    if &flat == ingredients {
        return Ok(false);
    }
    recipe.insert(INGREDIENTS.to_string(), flat);
    Ok(true)
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END_REGEX.find_iter(text) {
        sentences.push(text[start..m.end()].trim());
        start = m.end();
    }
    if start < text.len() {
        sentences.push(text[start..].trim());
    }
    sentences.retain(|s| !s.is_empty());
    sentences
}

fn strip_editorial_tips(recipe: &mut Map<String, Value>) -> Result<bool, NormalizationError> {
    let mut changed = false;
    if let Some(Value::Array(steps)) = recipe.get_mut(INSTRUCTIONS) {
        let before = steps.len();
        steps.retain(|step| !type_matches(step, &["HowToTip"]));
        changed |= steps.len() != before;
    }

    changed |= rewrite_instruction_texts(recipe, |text| {
        let sentences = split_sentences(text);
        let kept: Vec<&str> = sentences
            .iter()
            .copied()
            .filter(|s| !EDITORIAL_TIP_REGEX.is_match(s))
            .collect();
        (kept.len() != sentences.len()).then(|| kept.join(" "))
    });
    Ok(changed)
}

/// Rewrite each instruction text (plain string or step `text`).
/// Entries rewritten to an empty string are removed.
fn rewrite_instruction_texts(
    recipe: &mut Map<String, Value>,
    mut rewrite: impl FnMut(&str) -> Option<String>,
) -> bool {
    let Some(instructions) = recipe.get_mut(INSTRUCTIONS) else {
        return false;
    };

    let mut changed = false;
    match instructions {
        Value::String(text) => {
            if let Some(new_text) = rewrite(text) {
                *text = new_text;
                changed = true;
            }
        }
        Value::Array(steps) => {
            let mut kept = Vec::with_capacity(steps.len());
            for mut step in steps.drain(..) {
                let slot = match &mut step {
                    Value::String(text) => Some(text),
                    Value::Object(object) => match object.get_mut("text") {
                        Some(Value::String(text)) => Some(text),
                        _ => None,
                    },
                    _ => None,
                };
                if let Some(text) = slot {
                    if let Some(new_text) = rewrite(text) {
                        changed = true;
                        if new_text.trim().is_empty() {
                            continue;
                        }
                        *text = new_text;
                    }
                }
                kept.push(step);
            }
            *steps = kept;
        }
        _ => {}
    }
    changed
}

fn translate(text: &str) -> Option<String> {
    let mut current = text.to_string();
    let mut changed = false;
    for (pattern, replacement) in REGIONAL_PATTERNS.iter() {
        if pattern.is_match(&current) {
            current = pattern.replace_all(&current, *replacement).into_owned();
            changed = true;
        }
    }
    changed.then_some(current)
}

fn translate_regional_terms(recipe: &mut Map<String, Value>) -> bool {
    let mut changed = false;
    if let Some(Value::Array(ingredients)) = recipe.get_mut(INGREDIENTS) {
        for ingredient in ingredients.iter_mut() {
            if let Value::String(text) = ingredient {
                if let Some(new_text) = translate(text) {
                    *text = new_text;
                    changed = true;
                }
            }
        }
    }
    changed |= rewrite_instruction_texts(recipe, translate);
    changed
}

/// Always-on repairs: drop blank entries, convert free-text durations to ISO-8601.
pub fn apply_generic_rules(recipe: &mut Map<String, Value>, issues: &mut Vec<String>) -> bool {
    let mut changed = false;

    if let Some(Value::Array(ingredients)) = recipe.get_mut(INGREDIENTS) {
        let before = ingredients.len();
        ingredients.retain(|i| !is_blank_entry(i));
        let dropped = before - ingredients.len();
        if dropped > 0 {
            issues.push(format!("Dropped {dropped} empty ingredient entries"));
            changed = true;
        }
    }

    if let Some(Value::Array(steps)) = recipe.get_mut(INSTRUCTIONS) {
        let before = steps.len();
        steps.retain(|s| !is_blank_entry(s));
        let dropped = before - steps.len();
        if dropped > 0 {
            issues.push(format!("Dropped {dropped} empty instruction entries"));
            changed = true;
        }
    }

    for field in DURATION_FIELDS {
        if let Some(Value::String(value)) = recipe.get_mut(field) {
            if parse_iso_duration(value).is_some() {
                continue;
            }
            if let Some(minutes) = parse_free_text_duration(value) {
                let iso = minutes_to_iso(minutes);
                issues.push(format!("Converted {field} '{value}' to {iso}"));
                *value = iso;
                changed = true;
            }
        }
    }

    changed
}

fn is_blank_entry(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Object(object) => {
            let has_text = ["text", "name"].iter().any(|k| {
                object
                    .get(*k)
                    .and_then(Value::as_str)
                    .is_some_and(|s| !s.trim().is_empty())
            });
            !has_text && object.get("itemListElement").is_none() && object.get("url").is_none()
        }
        Value::Array(items) => items.iter().all(is_blank_entry),
        _ => false,
    }
}
