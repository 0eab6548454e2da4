/// Instructions and answer schema shared by every prompt level.
///
/// Loaded from `extraction_prompt.txt` at compile time.
pub const EXTRACTION_PROMPT: &str = include_str!("extraction_prompt.txt");

const AGGRESSIVE_NOTE: &str = "The content below is an unfiltered page dump. Ignore navigation, advertisements, comments, newsletter sign-ups and related-recipe links; the recipe may be anywhere in it.";

const MINIMAL_PROMPT: &str = "Return the recipe in this text as JSON with keys title, ingredients (array of strings) and instructions (array of strings). If there is no recipe, return {\"error\": \"no recipe\"}. JSON only.";

/// Prompt for content already narrowed to the recipe container.
pub fn detailed_prompt(url: &str, content: &str) -> String {
    format!("{EXTRACTION_PROMPT}\nPage URL: {url}\n\nContent:\n{content}")
}

/// Prompt for the whole page text when nothing recipe-shaped was found.
pub fn aggressive_prompt(url: &str, content: &str) -> String {
    format!("{EXTRACTION_PROMPT}\n{AGGRESSIVE_NOTE}\n\nPage URL: {url}\n\nContent:\n{content}")
}

/// Short prompt for a small budget.
pub fn minimal_prompt(content: &str) -> String {
    format!("{MINIMAL_PROMPT}\n\n{content}")
}
