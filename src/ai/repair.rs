//! Turning a model's free-form answer into JSON.
//!
//! Models wrap JSON in code fences, add commentary, leave trailing commas
//! and forget to quote keys. Each tier below is tried in order; every failure
//! is logged and the next tier gets the original text.

use log::{debug, warn};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::error::AiResponseParseError;

const TIERS: usize = 4;

static FENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)\s*```").expect("Invalid code fence regex")
});

/// Parse a model response, repairing it as needed.
pub fn parse_ai_response(text: &str) -> Result<Value, AiResponseParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AiResponseParseError::Empty);
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => attempt_failed(1, &e),
    }

    let cleaned = repair_json(&strip_code_fences(trimmed));
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => return Ok(value),
        Err(e) => attempt_failed(2, &e),
    }

    match outer_object(trimmed) {
        Some(sliced) => match serde_json::from_str::<Value>(&repair_json(sliced)) {
            Ok(value) => return Ok(value),
            Err(e) => attempt_failed(3, &e),
        },
        None => attempt_failed(3, &"no braces in response"),
    }

    let candidates = balanced_objects(trimmed);
    for (index, candidate) in candidates.iter().enumerate() {
        match serde_json::from_str::<Value>(candidate)
            .or_else(|_| serde_json::from_str::<Value>(&repair_json(candidate)))
        {
            Ok(value) => return Ok(value),
            Err(e) => debug!("Balanced block {}/{} failed: {}", index + 1, candidates.len(), e),
        }
    }
    attempt_failed(4, &format!("none of {} balanced blocks parsed", candidates.len()));

    Err(AiResponseParseError::AllAttemptsFailed { attempts: TIERS })
}

fn attempt_failed(attempt: usize, error: &dyn std::fmt::Display) {
    warn!("JSON repair attempt {}/{} failed: {}", attempt, TIERS, error);
}

fn strip_code_fences(text: &str) -> String {
    match FENCE_REGEX.captures(text) {
        Some(caps) => caps[1].to_string(),
        None => text.to_string(),
    }
}

/// From the first `{` to the last `}`.
fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Every brace-balanced `{...}` span, in order of its opening brace.
fn balanced_objects(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    for (start, _) in text.match_indices('{') {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        for (offset, c) in text[start..].char_indices() {
            if in_string {
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match c {
                '"' => in_string = true,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        spans.push(&text[start..start + offset + 1]);
                        break;
                    }
                }
                _ => {}
            }
        }
    }
    spans
}

fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars[from.min(chars.len())..]
        .iter()
        .copied()
        .find(|c| !c.is_whitespace())
}

fn expects_key(out: &str) -> bool {
    matches!(out.trim_end().chars().last(), Some('{') | Some(','))
}

/// String-aware cleanup: drop comments, trailing and doubled commas, and
/// quote bare object keys.
fn repair_json(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
                continue;
            }
            ',' => {
                if !matches!(next_significant(&chars, i + 1), Some('}' | ']' | ',') | None) {
                    out.push(',');
                }
            }
            c if (c.is_ascii_alphabetic() || c == '_') && expects_key(&out) => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                if next_significant(&chars, i) == Some(':') {
                    out.push('"');
                    out.push_str(&ident);
                    out.push('"');
                } else {
                    out.push_str(&ident);
                }
                continue;
            }
            _ => out.push(c),
        }
        i += 1;
    }

    out
}
