use proptest::prelude::*;
use proptest::test_runner::Config;
use recipe_extract::scoring::{calculate_confidence, merge_results};
use recipe_extract::{ExtractionMethod, ExtractionResult, RecipeDraft};

fn any_method() -> impl Strategy<Value = ExtractionMethod> {
    prop_oneof![
        Just(ExtractionMethod::JsonLd),
        Just(ExtractionMethod::Microdata),
        Just(ExtractionMethod::SiteSpecific),
        Just(ExtractionMethod::CssSelectors),
        Just(ExtractionMethod::merged(&ExtractionMethod::JsonLd)),
        Just(ExtractionMethod::AiFast),
        Just(ExtractionMethod::AiDetailed),
        Just(ExtractionMethod::AiAggressive),
        Just(ExtractionMethod::AiMinimal),
        Just(ExtractionMethod::Cache),
        Just(ExtractionMethod::Error),
    ]
}

/// Methods whose base confidence does not exceed the merge base.
fn scraper_method() -> impl Strategy<Value = ExtractionMethod> {
    prop_oneof![
        Just(ExtractionMethod::JsonLd),
        Just(ExtractionMethod::Microdata),
        Just(ExtractionMethod::SiteSpecific),
        Just(ExtractionMethod::CssSelectors),
    ]
}

fn lines(prefix: &'static str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix} {i}")).collect()
}

prop_compose! {
    fn any_draft()(
        title in "\\PC{0,60}",
        description in proptest::option::of("\\PC{0,200}"),
        image in proptest::option::of("https://[a-z]{1,10}\\.com/[a-z]{1,10}\\.jpg"),
        prep_time in proptest::option::of("PT[0-9]{1,3}M"),
        servings in proptest::option::of(any::<f64>()),
        ingredients in 0usize..5_000,
        instructions in 0usize..5_000,
    ) -> RecipeDraft {
        RecipeDraft {
            title,
            description,
            image,
            prep_time,
            servings,
            ingredients: lines("1 cup", ingredients),
            instructions: lines("Step", instructions),
            source_url: "https://example.com/recipe".to_string(),
            ..Default::default()
        }
    }
}

prop_compose! {
    fn complete_draft()(
        title in "[A-Za-z][A-Za-z ]{0,30}",
        description in proptest::option::of("[a-z ]{0,60}"),
        image in proptest::option::of("https://example\\.com/[a-z]{1,10}\\.jpg"),
        cook_time in proptest::option::of("PT[1-9][0-9]?M"),
        servings in proptest::option::of(0.5f64..24.0),
        ingredients in 1usize..40,
        instructions in 0usize..30,
    ) -> RecipeDraft {
        RecipeDraft {
            title,
            description,
            image,
            cook_time,
            servings,
            ingredients: lines("2 tbsp", ingredients),
            instructions: lines("Stir", instructions),
            source_url: "https://example.com/recipe".to_string(),
            ..Default::default()
        }
    }
}

/// A result that only repeats part of the best draft, with nothing the best lacks.
fn weaker_than(best: &RecipeDraft) -> impl Strategy<Value = (RecipeDraft, f64, ExtractionMethod)> {
    let best = best.clone();
    (
        0..=best.ingredients.len(),
        0..=best.instructions.len(),
        any::<bool>(),
        0.0f64..0.45,
        any_method(),
    )
        .prop_map(move |(ingredients, instructions, keep_title, confidence, method)| {
            let draft = RecipeDraft {
                title: if keep_title { best.title.clone() } else { String::new() },
                ingredients: best.ingredients[..ingredients].to_vec(),
                instructions: best.instructions[..instructions].to_vec(),
                source_url: best.source_url.clone(),
                ..Default::default()
            };
            (draft, confidence, method)
        })
}

fn merge_case() -> impl Strategy<Value = (RecipeDraft, ExtractionMethod, Vec<(RecipeDraft, f64, ExtractionMethod)>)> {
    (complete_draft(), scraper_method()).prop_flat_map(|(best, method)| {
        let others = proptest::collection::vec(weaker_than(&best), 1..4);
        (Just(best), Just(method), others)
    })
}

proptest! {
    #![proptest_config(Config::with_cases(128))]
    #[test]
    fn confidence_is_bounded_for_any_draft(
        draft in any_draft(),
        method in any_method(),
        hostname in prop_oneof![Just("www.allrecipes.com".to_string()), "[a-z]{0,12}\\.[a-z]{2,3}"],
    ) {
        let confidence = calculate_confidence(&draft, &method, &hostname);
        prop_assert!((0.0..=1.0).contains(&confidence), "{} gave {}", method, confidence);
    }

    #[test]
    fn merge_keeping_the_best_fields_never_scores_lower(
        (best, method, others) in merge_case(),
        hostname in prop_oneof![Just("www.seriouseats.com"), Just("example.com")],
    ) {
        let best_confidence = calculate_confidence(&best, &method, hostname);
        let mut results = vec![ExtractionResult::found(best.clone(), best_confidence, method)];
        results.extend(
            others
                .into_iter()
                .map(|(draft, confidence, method)| ExtractionResult::found(draft, confidence, method)),
        );

        let merged = merge_results(&results, hostname).expect("best draft has ingredients");
        let recipe = merged.recipe.as_ref().expect("merge carries a recipe");
        prop_assert_eq!(&recipe.ingredients, &best.ingredients);
        prop_assert_eq!(&recipe.instructions, &best.instructions);
        prop_assert_eq!(&recipe.image, &best.image);
        prop_assert!(
            merged.confidence >= best_confidence,
            "merged {} < best {}",
            merged.confidence,
            best_confidence
        );
    }
}
