//! Confidence scoring and cross-strategy merging.
//!
//! The numbers below are tuned against real publisher pages. Bases are kept
//! low so completeness bonuses decide the final ordering.

use crate::model::{ExtractionMethod, ExtractionResult, RecipeDraft};

pub const BASE_JSON_LD: f64 = 0.70;
pub const BASE_SITE_SPECIFIC: f64 = 0.65;
pub const BASE_MICRODATA: f64 = 0.60;
pub const BASE_CSS_SELECTORS: f64 = 0.50;
pub const BASE_OTHER: f64 = 0.40;

pub const TITLE_BONUS: f64 = 0.08;
pub const TITLE_MIN_CHARS: usize = 3;
pub const PER_INGREDIENT_BONUS: f64 = 0.02;
pub const MAX_INGREDIENT_BONUS: f64 = 0.12;
pub const PER_INSTRUCTION_BONUS: f64 = 0.02;
pub const MAX_INSTRUCTION_BONUS: f64 = 0.10;
pub const IMAGE_BONUS: f64 = 0.03;
pub const DESCRIPTION_BONUS: f64 = 0.03;
pub const DESCRIPTION_MIN_CHARS: usize = 20;
pub const TIME_BONUS: f64 = 0.02;
pub const SERVINGS_BONUS: f64 = 0.02;
pub const HIGH_QUALITY_DOMAIN_BONUS: f64 = 0.03;

pub const MERGE_BASE: f64 = 0.70;
pub const TITLE_AGREEMENT_BONUS: f64 = 0.02;
pub const INGREDIENT_AGREEMENT_BONUS: f64 = 0.03;
pub const MIN_AGREEING_SOURCES: usize = 2;

/// Bonus awarded by the enhance pass per recovered list.
pub const ENHANCE_LIST_BONUS: f64 = 0.15;
/// Bonus awarded by the enhance pass for a recovered image.
pub const ENHANCE_IMAGE_BONUS: f64 = 0.03;

/// Publishers whose structured data is consistently complete.
pub const HIGH_QUALITY_DOMAINS: &[&str] = &[
    "allrecipes.com",
    "foodnetwork.com",
    "seriouseats.com",
    "bbcgoodfood.com",
    "cooking.nytimes.com",
    "simplyrecipes.com",
    "bonappetit.com",
    "epicurious.com",
    "kingarthurbaking.com",
    "tasteofhome.com",
];

pub fn is_high_quality_domain(hostname: &str) -> bool {
    let host = hostname.to_lowercase();
    HIGH_QUALITY_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

pub fn base_confidence(method: &ExtractionMethod) -> f64 {
    match method {
        ExtractionMethod::JsonLd => BASE_JSON_LD,
        ExtractionMethod::SiteSpecific => BASE_SITE_SPECIFIC,
        ExtractionMethod::Microdata => BASE_MICRODATA,
        ExtractionMethod::CssSelectors => BASE_CSS_SELECTORS,
        ExtractionMethod::Merged(_) => MERGE_BASE,
        _ => BASE_OTHER,
    }
}

/// Additive bonuses for how complete a draft is.
pub fn completeness_bonus(recipe: &RecipeDraft, hostname: &str) -> f64 {
    let mut bonus = 0.0;

    if recipe.title.trim().chars().count() > TITLE_MIN_CHARS {
        bonus += TITLE_BONUS;
    }
    bonus += (recipe.ingredients.len() as f64 * PER_INGREDIENT_BONUS).min(MAX_INGREDIENT_BONUS);
    bonus += (recipe.instructions.len() as f64 * PER_INSTRUCTION_BONUS).min(MAX_INSTRUCTION_BONUS);
    if recipe.image.as_deref().is_some_and(|i| !i.trim().is_empty()) {
        bonus += IMAGE_BONUS;
    }
    if recipe
        .description
        .as_deref()
        .is_some_and(|d| d.trim().chars().count() > DESCRIPTION_MIN_CHARS)
    {
        bonus += DESCRIPTION_BONUS;
    }
    if recipe.has_time() {
        bonus += TIME_BONUS;
    }
    if recipe.servings.is_some_and(|s| s > 0.0) {
        bonus += SERVINGS_BONUS;
    }
    if is_high_quality_domain(hostname) {
        bonus += HIGH_QUALITY_DOMAIN_BONUS;
    }

    bonus
}

/// Confidence in [0, 1] for a draft produced by `method`.
pub fn calculate_confidence(recipe: &RecipeDraft, method: &ExtractionMethod, hostname: &str) -> f64 {
    (base_confidence(method) + completeness_bonus(recipe, hostname)).clamp(0.0, 1.0)
}

/// Combine the fields of several results into one.
///
/// Returns `None` with fewer than two recipes, or when the combination has no
/// title or no ingredients.
pub fn merge_results(results: &[ExtractionResult], hostname: &str) -> Option<ExtractionResult> {
    let mut ranked: Vec<(&ExtractionResult, &RecipeDraft)> = results
        .iter()
        .filter_map(|r| r.recipe.as_ref().map(|recipe| (r, recipe)))
        .collect();
    if ranked.len() < MIN_AGREEING_SOURCES {
        return None;
    }
    ranked.sort_by(|a, b| b.0.confidence.total_cmp(&a.0.confidence));

    let (best_result, best) = ranked[0];

    let title = ranked
        .iter()
        .map(|(_, r)| r.title.trim())
        .find(|t| !t.is_empty())?
        .to_string();

    let description = ranked
        .iter()
        .filter_map(|(_, r)| r.description.as_deref())
        .filter(|d| !d.trim().is_empty())
        .max_by_key(|d| d.chars().count())
        .map(str::to_string);

    let image = ranked
        .iter()
        .filter(|(result, _)| result.method.is_structured())
        .chain(ranked.iter())
        .filter_map(|(_, r)| r.image.as_deref())
        .find(|i| !i.trim().is_empty())
        .map(str::to_string);

    let ingredients = longest(&ranked, |r| &r.ingredients);
    if ingredients.is_empty() {
        return None;
    }
    let instructions = longest(&ranked, |r| &r.instructions);

    let mut tags = Vec::new();
    for (_, recipe) in &ranked {
        for tag in &recipe.tags {
            if !tags.iter().any(|t: &String| t.eq_ignore_ascii_case(tag)) {
                tags.push(tag.clone());
            }
        }
    }

    let merged = RecipeDraft {
        title,
        description,
        image,
        prep_time: best.prep_time.clone(),
        cook_time: best.cook_time.clone(),
        total_time: best.total_time.clone(),
        servings: best.servings,
        difficulty: best.difficulty.clone(),
        ingredients,
        instructions,
        tags,
        source_url: best.source_url.clone(),
    };

    let titles_found = ranked.iter().filter(|(_, r)| !r.title.trim().is_empty()).count();
    let ingredient_sources = ranked.iter().filter(|(_, r)| !r.ingredients.is_empty()).count();

    let mut confidence = MERGE_BASE + completeness_bonus(&merged, hostname);
    if titles_found >= MIN_AGREEING_SOURCES {
        confidence += TITLE_AGREEMENT_BONUS;
    }
    if ingredient_sources >= MIN_AGREEING_SOURCES {
        confidence += INGREDIENT_AGREEMENT_BONUS;
    }

    let mut result = ExtractionResult::found(
        merged,
        confidence.min(1.0),
        ExtractionMethod::merged(&best_result.method),
    );
    result
        .issues
        .push(format!("Merged fields from {} strategies", ranked.len()));
    Some(result)
}

fn longest<'a>(
    ranked: &[(&'a ExtractionResult, &'a RecipeDraft)],
    field: impl Fn(&'a RecipeDraft) -> &'a Vec<String>,
) -> Vec<String> {
    let mut best: &Vec<String> = field(ranked[0].1);
    for (_, recipe) in ranked.iter().skip(1) {
        let candidate = field(recipe);
        if candidate.len() > best.len() {
            best = candidate;
        }
    }
    best.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, ingredients: usize, instructions: usize) -> RecipeDraft {
        RecipeDraft {
            title: title.to_string(),
            ingredients: (0..ingredients).map(|i| format!("{i} cups flour")).collect(),
            instructions: (0..instructions).map(|i| format!("Do step {i}.")).collect(),
            source_url: "https://example.com/r".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_confidence_stays_in_range_for_extreme_inputs() {
        let mut huge = draft("An extremely long recipe title", 10_000, 10_000);
        huge.image = Some("https://example.com/a.jpg".to_string());
        huge.description = Some("d".repeat(10_000));
        huge.prep_time = Some("PT10M".to_string());
        huge.servings = Some(1e12);

        for method in [
            ExtractionMethod::JsonLd,
            ExtractionMethod::merged(&ExtractionMethod::JsonLd),
            ExtractionMethod::CssSelectors,
            ExtractionMethod::AiAggressive,
        ] {
            let c = calculate_confidence(&huge, &method, "www.allrecipes.com");
            assert!((0.0..=1.0).contains(&c), "{method}: {c}");
            let c = calculate_confidence(&RecipeDraft::default(), &method, "");
            assert!((0.0..=1.0).contains(&c), "{method}: {c}");
        }
    }

    #[test]
    fn test_json_ld_scenario_confidence() {
        let recipe = draft("Caesar Salad", 6, 4);
        let c = calculate_confidence(&recipe, &ExtractionMethod::JsonLd, "example.com");
        assert!((c - 0.98).abs() < 1e-9, "{c}");
    }

    #[test]
    fn test_bonuses_are_capped() {
        let few = draft("Toast", 6, 5);
        let many = draft("Toast", 60, 50);
        assert_eq!(
            calculate_confidence(&few, &ExtractionMethod::CssSelectors, "x.com"),
            calculate_confidence(&many, &ExtractionMethod::CssSelectors, "x.com"),
        );
    }

    #[test]
    fn test_high_quality_domain_matching() {
        assert!(is_high_quality_domain("www.seriouseats.com"));
        assert!(is_high_quality_domain("cooking.nytimes.com"));
        assert!(!is_high_quality_domain("www.nytimes.com"));
        assert!(!is_high_quality_domain("notallrecipes.com"));
    }

    #[test]
    fn test_merge_requires_two_recipes() {
        let only = ExtractionResult::found(draft("Stew", 3, 3), 0.8, ExtractionMethod::JsonLd);
        assert!(merge_results(&[only], "x.com").is_none());
    }

    #[test]
    fn test_merge_combines_fields() {
        let mut structured = draft("Stew", 3, 2);
        structured.prep_time = Some("PT15M".to_string());
        structured.image = Some("https://x.com/stew.jpg".to_string());
        let mut scraped = draft("Beef Stew (Best Ever)", 5, 6);
        scraped.description = Some("A long hearty description of stew".to_string());
        scraped.image = Some("https://x.com/ad.jpg".to_string());

        let results = vec![
            ExtractionResult::found(scraped, 0.55, ExtractionMethod::CssSelectors),
            ExtractionResult::found(structured, 0.85, ExtractionMethod::JsonLd),
        ];
        let merged = merge_results(&results, "x.com").unwrap();
        let recipe = merged.recipe.as_ref().unwrap();

        assert_eq!(recipe.title, "Stew");
        assert_eq!(recipe.ingredients.len(), 5);
        assert_eq!(recipe.instructions.len(), 6);
        assert_eq!(recipe.image.as_deref(), Some("https://x.com/stew.jpg"));
        assert_eq!(recipe.prep_time.as_deref(), Some("PT15M"));
        assert!(recipe.description.is_some());
        assert_eq!(merged.method.to_string(), "merged-json-ld");
    }

    #[test]
    fn test_merge_without_ingredients_is_discarded() {
        let results = vec![
            ExtractionResult::found(draft("Tea", 0, 2), 0.7, ExtractionMethod::JsonLd),
            ExtractionResult::found(draft("Tea", 0, 3), 0.6, ExtractionMethod::CssSelectors),
        ];
        assert!(merge_results(&results, "x.com").is_none());
    }

    #[test]
    fn test_merge_never_loses_to_best_when_fields_match() {
        for method in [
            ExtractionMethod::JsonLd,
            ExtractionMethod::SiteSpecific,
            ExtractionMethod::Microdata,
            ExtractionMethod::CssSelectors,
        ] {
            for (ingredients, instructions) in [(1, 0), (3, 2), (6, 5), (20, 20)] {
                let best = draft("Pancakes", ingredients, instructions);
                let weaker = RecipeDraft {
                    ingredients: best.ingredients[..1].to_vec(),
                    instructions: Vec::new(),
                    ..best.clone()
                };
                let best_confidence = calculate_confidence(&best, &method, "x.com");
                let results = vec![
                    ExtractionResult::found(best.clone(), best_confidence, method.clone()),
                    ExtractionResult::found(weaker, 0.1, ExtractionMethod::CssSelectors),
                ];
                let merged = merge_results(&results, "x.com").unwrap();
                assert_eq!(merged.recipe.as_ref().unwrap().ingredients, best.ingredients);
                assert!(merged.confidence >= best_confidence);
            }
        }
    }
}
