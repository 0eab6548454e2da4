//! Small text helpers shared by the normalizer, the scrapers and the AI fallback.

use html_escape::decode_html_entities;
use regex::Regex;
use std::sync::LazyLock;

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("Invalid tag regex"));

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

static ISO_DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^P(?:(\d+)D)?(?:T(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .expect("Invalid ISO duration regex")
});

static FREE_TEXT_DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(\d+(?:\.\d+)?)\s*(?:hours?|hrs?|h)\.?)?(?:\s*(?:,|and)?\s*)?(?:(\d+)\s*(?:minutes?|mins?|m)\.?)?$",
    )
    .expect("Invalid free-text duration regex")
});

static SERVINGS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<lo>\d+)\s*(?:-|–|to)\s*(?P<hi>\d+)|(?P<whole>\d+)\s+(?P<mn>\d+)/(?P<md>\d+)|(?P<n>\d+)/(?P<d>\d+)|(?P<num>\d+(?:\.\d+)?)",
    )
    .expect("Invalid servings regex")
});

/// Decode HTML entities; some publishers double-escape, so decode twice.
pub fn decode_html_symbols(text: &str) -> String {
    decode_html_entities(&decode_html_entities(text)).into_owned()
}

/// Decode entities, drop tags and collapse whitespace.
pub fn clean_text(text: &str) -> String {
    let decoded = decode_html_symbols(text);
    let stripped = TAG_REGEX.replace_all(&decoded, " ");
    collapse_whitespace(&stripped)
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text, " ").trim().to_string()
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Total minutes of an ISO-8601 duration such as `PT1H30M` or `P0DT45M`.
pub fn parse_iso_duration(value: &str) -> Option<u32> {
    let caps = ISO_DURATION_REGEX.captures(value.trim())?;
    if caps.iter().skip(1).all(|c| c.is_none()) {
        return None;
    }
    let number = |i: usize| -> f64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    let minutes = number(1) * 24.0 * 60.0 + number(2) * 60.0 + number(3) + number(4) / 60.0;
    Some(minutes.round() as u32)
}

/// Total minutes of free text such as "1 hour 30 minutes", "2 hrs" or "45 mins".
pub fn parse_free_text_duration(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let caps = FREE_TEXT_DURATION_REGEX.captures(trimmed)?;
    let hours = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok());
    let minutes = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
    if hours.is_none() && minutes.is_none() {
        return None;
    }
    let total = hours.unwrap_or(0.0) * 60.0 + f64::from(minutes.unwrap_or(0));
    Some(total.round() as u32)
}

/// Format minutes as `PTxHyM`, omitting zero components.
pub fn minutes_to_iso(minutes: u32) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    match (hours, rest) {
        (0, m) => format!("PT{m}M"),
        (h, 0) => format!("PT{h}H"),
        (h, m) => format!("PT{h}H{m}M"),
    }
}

/// Canonical duration for a recipe draft: ISO-8601 when the input can be
/// understood, the trimmed input otherwise.
pub fn normalize_duration(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let minutes = parse_iso_duration(trimmed).or_else(|| parse_free_text_duration(trimmed));
    match minutes {
        Some(m) => Some(minutes_to_iso(m)),
        None => Some(trimmed.to_string()),
    }
}

/// First number in a yield string: integers, fractions, mixed numbers,
/// and ranges (averaged).
pub fn parse_servings(value: &str) -> Option<f64> {
    let caps = SERVINGS_REGEX.captures(value)?;
    let num = |name: &str| caps.name(name).and_then(|m| m.as_str().parse::<f64>().ok());

    let servings = if let (Some(lo), Some(hi)) = (num("lo"), num("hi")) {
        (lo + hi) / 2.0
    } else if let (Some(whole), Some(n), Some(d)) = (num("whole"), num("mn"), num("md")) {
        if d == 0.0 {
            whole
        } else {
            whole + n / d
        }
    } else if let (Some(n), Some(d)) = (num("n"), num("d")) {
        if d == 0.0 {
            return None;
        }
        n / d
    } else {
        num("num")?
    };

    (servings > 0.0).then_some(servings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_durations() {
        assert_eq!(parse_iso_duration("PT30M"), Some(30));
        assert_eq!(parse_iso_duration("PT1H30M"), Some(90));
        assert_eq!(parse_iso_duration("P0DT2H"), Some(120));
        assert_eq!(parse_iso_duration("PT5400.0S"), Some(90));
        assert_eq!(parse_iso_duration("PT"), None);
        assert_eq!(parse_iso_duration("30 minutes"), None);
    }

    #[test]
    fn test_free_text_durations() {
        assert_eq!(parse_free_text_duration("1 hour 30 minutes"), Some(90));
        assert_eq!(parse_free_text_duration("2 hrs"), Some(120));
        assert_eq!(parse_free_text_duration("45 mins"), Some(45));
        assert_eq!(parse_free_text_duration("1 hr, 15 min"), Some(75));
        assert_eq!(parse_free_text_duration("1.5 hours"), Some(90));
        assert_eq!(parse_free_text_duration("overnight"), None);
        assert_eq!(parse_free_text_duration(""), None);
    }

    #[test]
    fn test_normalize_duration_is_canonical_iso() {
        assert_eq!(normalize_duration("PT90M").unwrap(), "PT1H30M");
        assert_eq!(normalize_duration("2 hours").unwrap(), "PT2H");
        assert_eq!(normalize_duration("10 minutes").unwrap(), "PT10M");
        assert_eq!(normalize_duration("overnight").unwrap(), "overnight");
        assert_eq!(normalize_duration("  "), None);
    }

    #[test]
    fn test_servings() {
        assert_eq!(parse_servings("4"), Some(4.0));
        assert_eq!(parse_servings("Serves 4-6"), Some(5.0));
        assert_eq!(parse_servings("6 to 8 people"), Some(7.0));
        assert_eq!(parse_servings("1 1/2 loaves"), Some(1.5));
        assert_eq!(parse_servings("1/2 cake"), Some(0.5));
        assert_eq!(parse_servings("Makes 24 cookies"), Some(24.0));
        assert_eq!(parse_servings("a crowd"), None);
        assert_eq!(parse_servings("0"), None);
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(
            clean_text("Mix <b>flour</b> &amp;amp; sugar\n\n  well"),
            "Mix flour & sugar well"
        );
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("crème brûlée", 5), "crème");
        assert_eq!(truncate_chars("short", 50), "short");
    }
}
