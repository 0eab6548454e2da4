use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A recipe as extracted from a page, before any downstream validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source_url: String,
}

impl RecipeDraft {
    pub fn new(title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source_url: source_url.into(),
            ..Default::default()
        }
    }

    /// A draft with neither ingredients nor instructions is not a recipe.
    pub fn is_usable(&self) -> bool {
        !self.title.trim().is_empty()
            && (!self.ingredients.is_empty() || !self.instructions.is_empty())
    }

    pub fn has_time(&self) -> bool {
        self.prep_time.is_some() || self.cook_time.is_some() || self.total_time.is_some()
    }

    /// Adds a tag unless an equal one (ignoring case) is already present.
    pub fn add_tag(&mut self, tag: &str) {
        let tag = tag.trim();
        if tag.is_empty() {
            return;
        }
        if !self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            self.tags.push(tag.to_string());
        }
    }
}

/// Label of the strategy that produced an [`ExtractionResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionMethod {
    JsonLd,
    Microdata,
    SiteSpecific,
    CssSelectors,
    Merged(Box<ExtractionMethod>),
    AiFast,
    AiDetailed,
    AiAggressive,
    AiMinimal,
    Cache,
    Error,
}

impl ExtractionMethod {
    pub fn merged(base: &ExtractionMethod) -> Self {
        match base {
            // never nest merged-merged-...
            ExtractionMethod::Merged(inner) => ExtractionMethod::Merged(inner.clone()),
            other => ExtractionMethod::Merged(Box::new(other.clone())),
        }
    }

    pub fn is_ai(&self) -> bool {
        matches!(
            self,
            ExtractionMethod::AiFast
                | ExtractionMethod::AiDetailed
                | ExtractionMethod::AiAggressive
                | ExtractionMethod::AiMinimal
        )
    }

    /// Methods backed by publisher-declared data rather than layout guesses.
    pub fn is_structured(&self) -> bool {
        matches!(self, ExtractionMethod::JsonLd | ExtractionMethod::SiteSpecific)
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::JsonLd => write!(f, "json-ld"),
            ExtractionMethod::Microdata => write!(f, "microdata"),
            ExtractionMethod::SiteSpecific => write!(f, "site-specific"),
            ExtractionMethod::CssSelectors => write!(f, "css-selectors"),
            ExtractionMethod::Merged(base) => write!(f, "merged-{base}"),
            ExtractionMethod::AiFast => write!(f, "ai-fast"),
            ExtractionMethod::AiDetailed => write!(f, "ai-detailed"),
            ExtractionMethod::AiAggressive => write!(f, "ai-aggressive"),
            ExtractionMethod::AiMinimal => write!(f, "ai-minimal"),
            ExtractionMethod::Cache => write!(f, "cache"),
            ExtractionMethod::Error => write!(f, "error"),
        }
    }
}

impl FromStr for ExtractionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(base) = s.strip_prefix("merged-") {
            return Ok(ExtractionMethod::Merged(Box::new(base.parse()?)));
        }
        match s {
            "json-ld" => Ok(ExtractionMethod::JsonLd),
            "microdata" => Ok(ExtractionMethod::Microdata),
            "site-specific" => Ok(ExtractionMethod::SiteSpecific),
            "css-selectors" => Ok(ExtractionMethod::CssSelectors),
            "ai-fast" => Ok(ExtractionMethod::AiFast),
            "ai-detailed" => Ok(ExtractionMethod::AiDetailed),
            "ai-aggressive" => Ok(ExtractionMethod::AiAggressive),
            "ai-minimal" => Ok(ExtractionMethod::AiMinimal),
            "cache" => Ok(ExtractionMethod::Cache),
            "error" => Ok(ExtractionMethod::Error),
            other => Err(format!("Unknown extraction method: {other}")),
        }
    }
}

impl Serialize for ExtractionMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ExtractionMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Outcome of a single extraction strategy. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub recipe: Option<RecipeDraft>,
    pub confidence: f64,
    pub method: ExtractionMethod,
    pub issues: Vec<String>,
}

impl ExtractionResult {
    pub fn found(recipe: RecipeDraft, confidence: f64, method: ExtractionMethod) -> Self {
        Self {
            recipe: Some(recipe),
            confidence: confidence.clamp(0.0, 1.0),
            method,
            issues: Vec::new(),
        }
    }

    /// A zero-confidence result that still records what was attempted.
    pub fn not_found(method: ExtractionMethod, issue: impl Into<String>) -> Self {
        Self {
            recipe: None,
            confidence: 0.0,
            method,
            issues: vec![issue.into()],
        }
    }

    pub fn failed(issue: impl Into<String>) -> Self {
        Self::not_found(ExtractionMethod::Error, issue)
    }

    pub fn with_issues(mut self, issues: impl IntoIterator<Item = String>) -> Self {
        self.issues.extend(issues);
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.recipe
            .as_ref()
            .map(|r| r.title.as_str())
            .filter(|t| !t.trim().is_empty())
    }
}

/// Repaired copy of a JSON-LD Recipe node.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationResult {
    pub recipe: Value,
    pub improved: bool,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageCandidate {
    pub url: String,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub data: String,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub attempts: u32,
    pub final_user_agent: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_round_trips_through_strings() {
        for label in ["json-ld", "merged-site-specific", "ai-aggressive", "cache"] {
            let method: ExtractionMethod = label.parse().unwrap();
            assert_eq!(method.to_string(), label);
        }
    }

    #[test]
    fn test_merged_does_not_nest() {
        let once = ExtractionMethod::merged(&ExtractionMethod::JsonLd);
        let twice = ExtractionMethod::merged(&once);
        assert_eq!(twice.to_string(), "merged-json-ld");
    }

    #[test]
    fn test_usable_requires_content() {
        let mut draft = RecipeDraft::new("Soup", "https://example.com");
        assert!(!draft.is_usable());
        draft.instructions.push("Simmer everything.".to_string());
        assert!(draft.is_usable());
    }

    #[test]
    fn test_add_tag_dedupes_case_insensitively() {
        let mut draft = RecipeDraft::default();
        draft.add_tag("Dinner");
        draft.add_tag("dinner");
        draft.add_tag("  ");
        assert_eq!(draft.tags, vec!["Dinner"]);
    }

    #[test]
    fn test_result_serializes_method_as_label() {
        let result = ExtractionResult::not_found(ExtractionMethod::CssSelectors, "nothing");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["method"], "css-selectors");
        assert_eq!(json["confidence"], 0.0);
    }
}
