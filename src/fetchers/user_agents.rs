use serde::Deserialize;

/// Browser family whose user agent and headers are imitated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserClass {
    Chrome,
    Firefox,
    Safari,
}

const ROTATION: [BrowserClass; 3] = [
    BrowserClass::Chrome,
    BrowserClass::Firefox,
    BrowserClass::Safari,
];

const CHROME_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
];

const FIREFOX_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.2; rv:121.0) Gecko/20100101 Firefox/121.0",
];

const SAFARI_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
];

impl BrowserClass {
    fn pool(self) -> &'static [&'static str] {
        match self {
            BrowserClass::Chrome => CHROME_AGENTS,
            BrowserClass::Firefox => FIREFOX_AGENTS,
            BrowserClass::Safari => SAFARI_AGENTS,
        }
    }
}

/// Pick the user agent for an attempt.
///
/// Without a pinned class the family cycles chrome, firefox, safari by
/// attempt index; each lap of the cycle moves to the next string in the pool.
pub fn select_user_agent(attempt: u32, class: Option<BrowserClass>) -> (&'static str, BrowserClass) {
    let attempt = attempt as usize;
    match class {
        Some(class) => {
            let pool = class.pool();
            (pool[attempt % pool.len()], class)
        }
        None => {
            let class = ROTATION[attempt % ROTATION.len()];
            let pool = class.pool();
            (pool[(attempt / ROTATION.len()) % pool.len()], class)
        }
    }
}

/// Statuses that bot-protection layers answer with.
const BLOCKED_STATUSES: &[u16] = &[403, 429, 503, 1020];

/// Bodies shorter than this are checked against the broad phrase list.
const SHORT_BODY_LEN: usize = 500;

/// Phrases that only signal a block on a near-empty page.
const SHORT_BODY_PHRASES: &[&str] = &[
    "captcha",
    "access denied",
    "ray id",
    "just a moment",
    "request blocked",
    "unusual traffic",
];

/// Phrases that signal an interstitial regardless of page size.
const INTERSTITIAL_PHRASES: &[&str] = &[
    "checking your browser",
    "cf-browser-verification",
    "cf_chl_opt",
    "please verify you are a human",
    "captcha-delivery.com",
    "enable javascript and cookies to continue",
];

/// Return a reason when a response looks like a bot-detection page.
pub fn classify_response(status: u16, body: &str) -> Option<String> {
    if BLOCKED_STATUSES.contains(&status) {
        return Some(format!("status {status}"));
    }

    let lower = body.to_lowercase();
    if body.len() < SHORT_BODY_LEN {
        if let Some(phrase) = SHORT_BODY_PHRASES.iter().find(|p| lower.contains(**p)) {
            return Some(format!("short body mentions '{phrase}'"));
        }
    }

    INTERSTITIAL_PHRASES
        .iter()
        .find(|p| lower.contains(**p))
        .map(|phrase| format!("body mentions '{phrase}'"))
}
