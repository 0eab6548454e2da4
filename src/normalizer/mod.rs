//! Publisher-specific repair of JSON-LD Recipe nodes.
//!
//! Many publishers emit Recipe nodes that are valid JSON but stray from the
//! schema.org shape: steps nested inside sections, ingredients as objects,
//! editorial tips mixed into the steps. The normalizer fixes these on a copy
//! before the generic parser sees the node.

mod rules;

pub use rules::{rules_for_host, RepairRule};

use log::{debug, warn};
use serde_json::Value;

use crate::model::NormalizationResult;

pub struct JsonLdNormalizer;

impl JsonLdNormalizer {
    /// Repair `recipe` for `hostname`. The input is never modified.
    ///
    /// Normalizing an already-normalized node reports `improved = false`.
    pub fn normalize(recipe: &Value, hostname: &str) -> NormalizationResult {
        let Value::Object(original) = recipe else {
            return NormalizationResult {
                recipe: recipe.clone(),
                improved: false,
                issues: vec!["Recipe node is not a JSON object".to_string()],
            };
        };

        let mut working = original.clone();
        let mut improved = false;
        let mut issues = Vec::new();

        for rule in rules_for_host(hostname) {
            let mut scratch = working.clone();
            match rule.apply(&mut scratch) {
                Ok(true) => {
                    debug!("Normalizer rule '{}' fired for {}", rule.name(), hostname);
                    issues.push(format!("Applied {} for {}", rule.name(), hostname));
                    working = scratch;
                    improved = true;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("Normalizer rule '{}' failed for {}: {}", rule.name(), hostname, e);
                    issues.push(e.to_string());
                }
            }
        }

        if rules::apply_generic_rules(&mut working, &mut issues) {
            improved = true;
        }

        NormalizationResult {
            recipe: Value::Object(working),
            improved,
            issues,
        }
    }
}

/// Convenience wrapper around [`JsonLdNormalizer::normalize`].
pub fn normalize(recipe: &Value, hostname: &str) -> NormalizationResult {
    JsonLdNormalizer::normalize(recipe, hostname)
}
