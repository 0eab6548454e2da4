use proptest::prelude::*;
use proptest::sample::select;
use proptest::test_runner::Config;
use recipe_extract::normalizer::normalize;
use serde_json::{json, Value};

const HOSTS: &[&str] = &[
    "www.allrecipes.com",
    "www.seriouseats.com",
    "www.simplyrecipes.com",
    "www.foodnetwork.com",
    "www.delish.com",
    "www.tasteofhome.com",
    "www.food.com",
    "www.bbcgoodfood.com",
    "www.bbc.co.uk",
    "www.jamieoliver.com",
    "www.nigella.com",
    "example.com",
];

const INGREDIENTS: &[&str] = &[
    "200g caster sugar",
    "250g plain flour",
    "1 courgette",
    "300ml double cream",
    "12 prawns",
    "2 spring onions",
    "1 tsp bicarbonate of soda",
    "3 eggs",
    "100g butter",
];

const ASIDES: &[&str] = &[
    "",
    " (this is what I do)",
    " (I always use salted butter)",
    " (my kids love this part)",
    " (trust me on this)",
];

const TIPS: &[&str] = &[
    "",
    " Tip: sift it first.",
    " Note: keeps for three days.",
    " Variation: add lemon zest.",
];

const VERBS: &[&str] = &["Whisk", "Fold in", "Fry", "Dust with"];
const FINISHES: &[&str] = &["until smooth", "for 5 minutes", "gently"];
const CONTAINERS: &[&str] = &["HowToSection", "ItemList"];
const PREP_TIMES: &[&str] = &["20 mins", "1 hr 5 mins", "45 minutes", "PT30M"];
const COOK_TIMES: &[&str] = &["2 hours 10 minutes", "15 mins", "PT1H"];

fn step_text() -> impl Strategy<Value = String> {
    (
        select(VERBS),
        select(INGREDIENTS),
        select(ASIDES),
        select(FINISHES),
        select(TIPS),
    )
        .prop_map(|(verb, ingredient, aside, finish, tip)| {
            format!("{verb} the {ingredient}{aside} {finish}.{tip}")
        })
}

fn instruction_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        step_text().prop_map(Value::String),
        step_text().prop_map(|text| json!({"@type": "HowToStep", "text": text})),
        select(TIPS).prop_map(|tip| json!({"@type": "HowToTip", "text": tip.trim()})),
        Just(json!("   ")),
        Just(json!({"@type": "HowToStep", "text": ""})),
    ]
}

/// Steps nested inside sections and item lists up to three levels deep.
fn instruction_tree() -> impl Strategy<Value = Value> {
    instruction_leaf().prop_recursive(3, 32, 4, |inner| {
        (
            select(CONTAINERS),
            proptest::collection::vec(inner, 0..4),
        )
            .prop_map(|(kind, children)| {
                json!({"@type": kind, "name": "Part", "itemListElement": children})
            })
    })
}

fn ingredient_entry() -> impl Strategy<Value = Value> {
    prop_oneof![
        select(INGREDIENTS).prop_map(|i| json!(i)),
        select(INGREDIENTS).prop_map(|i| json!({"text": i})),
        select(INGREDIENTS).prop_map(|i| json!({"name": i, "amount": 2})),
        proptest::collection::vec(select(INGREDIENTS).prop_map(|i| json!(i)), 0..3)
            .prop_map(Value::Array),
        Just(json!("")),
    ]
}

fn recipe_node() -> impl Strategy<Value = Value> {
    (
        proptest::collection::vec(ingredient_entry(), 0..8),
        prop_oneof![
            proptest::collection::vec(instruction_tree(), 0..6).prop_map(Value::Array),
            step_text().prop_map(Value::String),
        ],
        proptest::option::of(select(PREP_TIMES)),
        proptest::option::of(select(COOK_TIMES)),
    )
        .prop_map(|(ingredients, instructions, prep, cook)| {
            let mut node = json!({
                "@type": "Recipe",
                "name": "Victoria Sponge",
                "recipeIngredient": ingredients,
                "recipeInstructions": instructions,
            });
            if let Some(prep) = prep {
                node["prepTime"] = json!(prep);
            }
            if let Some(cook) = cook {
                node["cookTime"] = json!(cook);
            }
            node
        })
}

proptest! {
    #![proptest_config(Config::with_cases(256))]
    #[test]
    fn normalize_is_idempotent_for_every_host(node in recipe_node(), host in select(HOSTS)) {
        let snapshot = node.clone();
        let first = normalize(&node, host);
        prop_assert_eq!(&node, &snapshot);

        let second = normalize(&first.recipe, host);
        prop_assert!(!second.improved, "second pass on {} fired: {:?}", host, second.issues);
        prop_assert_eq!(second.recipe, first.recipe);
    }
}
