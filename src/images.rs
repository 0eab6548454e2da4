//! Picks the recipe's hero image from everything a page offers.
//!
//! Candidates come from structured data, social meta tags, `<picture>`
//! sources and finally every `<img>` on the page. They are probed one at a
//! time with a HEAD request and the first real image of a useful size wins.

use log::{debug, info, warn};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Client;
use scraper::{ElementRef, Html};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ImageConfig;
use crate::error::ImageValidationError;
use crate::fetchers::{FetchOptions, RequestFetcher};
use crate::model::ImageCandidate;
use crate::scrapers::{absolutize, find_json_ld_recipe, parse_selector};

const JSON_LD_SCORE: f64 = 1000.0;
const OG_IMAGE_SCORE: f64 = 900.0;
const TWITTER_IMAGE_SCORE: f64 = 850.0;
const SOCIAL_IMAGE_SCORE: f64 = 800.0;
const LINK_IMAGE_SRC_SCORE: f64 = 750.0;
const PICTURE_SOURCE_SCORE: f64 = 700.0;

const IMG_BASE_SCORE: f64 = 300.0;
const IMG_MAX_SCORE: f64 = 600.0;
const IMG_WIDE_BONUS: f64 = 100.0;
const IMG_ASPECT_BONUS: f64 = 50.0;
const IMG_CONTAINER_BONUS: f64 = 50.0;
const IMG_HERO_BONUS: f64 = 100.0;
const IMG_CHROME_PENALTY: f64 = 200.0;
/// Declared dimensions below this are icons or tracking pixels.
const IMG_MIN_DIMENSION: u32 = 100;
const PREFERRED_ASPECT: std::ops::RangeInclusive<f64> = 1.2..=2.2;

const BAD_EXTENSIONS: &[&str] = &[".svg", ".ico"];
const BAD_TOKENS: &[&str] = &[
    "logo",
    "icon",
    "icons",
    "sprite",
    "avatar",
    "banner",
    "placeholder",
    "pixel",
    "spacer",
    "ad",
    "ads",
];

const HERO_HINTS: &[&str] = &["recipe", "hero"];
const CHROME_HINTS: &[&str] = &["nav", "footer", "sidebar", "comment", "header", "related"];
const CONTENT_CONTAINERS: &[&str] = &["article", "main"];

const SOCIAL_META: &[&str] = &[
    "meta[property='instagram:image']",
    "meta[name='pinterest:media']",
    "meta[property='pinterest:image']",
    "meta[name='pinterest-image']",
];

/// True for URLs that are almost never a recipe photo.
///
/// Tokens are matched whole, split on anything that is not a letter or
/// digit, so `pad-thai.jpg` is kept while `ad-banner.jpg` is not.
pub fn is_bad_image(url: &str) -> bool {
    let lower = url.to_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or_default();
    if BAD_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return true;
    }
    lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| BAD_TOKENS.contains(&token))
}

fn first_srcset_entry(srcset: &str) -> Option<&str> {
    srcset
        .split(',')
        .next()
        .and_then(|entry| entry.split_whitespace().next())
}

fn dimension(value: Option<&str>) -> Option<u32> {
    let digits: String = value?
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Image URLs and declared widths from a JSON-LD `image` value.
fn json_ld_images(image: &Value, out: &mut Vec<(String, Option<u32>)>) {
    match image {
        Value::String(url) => out.push((url.clone(), None)),
        Value::Array(items) => items.iter().for_each(|item| json_ld_images(item, out)),
        Value::Object(map) => {
            let url = ["url", "contentUrl", "@id"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str));
            if let Some(url) = url {
                let width = match map.get("width") {
                    Some(Value::Number(n)) => n.as_u64().and_then(|w| u32::try_from(w).ok()),
                    Some(Value::String(s)) => dimension(Some(s.as_str())),
                    Some(Value::Object(q)) => q
                        .get("value")
                        .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
                        .and_then(|w| u32::try_from(w).ok()),
                    _ => None,
                };
                out.push((url.to_string(), width));
            }
        }
        _ => {}
    }
}

fn meta_content(document: &Html, selector: &str) -> Vec<String> {
    match parse_selector(selector) {
        Ok(selector) => document
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(str::to_string)
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn class_hints(element: &ElementRef) -> String {
    let value = element.value();
    format!(
        "{} {}",
        value.attr("class").unwrap_or_default(),
        value.attr("id").unwrap_or_default()
    )
    .to_lowercase()
}

fn score_img(img: ElementRef, min_width: u32) -> Option<f64> {
    let width = dimension(img.value().attr("width"));
    let height = dimension(img.value().attr("height"));
    if width.is_some_and(|w| w < IMG_MIN_DIMENSION) || height.is_some_and(|h| h < IMG_MIN_DIMENSION) {
        return None;
    }

    let mut score = IMG_BASE_SCORE;
    if width.is_some_and(|w| w >= min_width) {
        score += IMG_WIDE_BONUS;
    }
    if let (Some(w), Some(h)) = (width, height) {
        if PREFERRED_ASPECT.contains(&(f64::from(w) / f64::from(h))) {
            score += IMG_ASPECT_BONUS;
        }
    }

    let mut in_container = false;
    let mut hero = false;
    let mut chrome = false;
    for ancestor in img.ancestors().filter_map(ElementRef::wrap) {
        let name = ancestor.value().name();
        let hints = class_hints(&ancestor);
        in_container |= CONTENT_CONTAINERS.contains(&name) || hints.contains("recipe");
        hero |= HERO_HINTS.iter().any(|h| hints.contains(h));
        chrome |= matches!(name, "nav" | "footer" | "aside" | "header")
            || CHROME_HINTS.iter().any(|h| hints.contains(h));
    }
    if in_container {
        score += IMG_CONTAINER_BONUS;
    }
    if hero {
        score += IMG_HERO_BONUS;
    }
    if chrome {
        score -= IMG_CHROME_PENALTY;
    }

    (score > 0.0).then_some(score.min(IMG_MAX_SCORE))
}

/// Every plausible image on the page, best first. URLs are absolute,
/// deduplicated and free of known non-photo patterns.
pub fn collect_candidates(html: &str, page_url: &str, min_width: u32) -> Vec<ImageCandidate> {
    let document = Html::parse_document(html);
    let mut raw: Vec<(String, f64)> = Vec::new();

    if let Ok(Some(recipe)) = find_json_ld_recipe(&document) {
        let mut images = Vec::new();
        if let Some(image) = recipe.get("image") {
            json_ld_images(image, &mut images);
        }
        for (url, width) in images {
            match width {
                Some(w) if w < min_width => debug!("Skipping narrow JSON-LD image {} ({}px)", url, w),
                Some(w) => raw.push((url, JSON_LD_SCORE + f64::from(w.min(4000)) / 10.0)),
                None => raw.push((url, JSON_LD_SCORE)),
            }
        }
    }

    for url in meta_content(&document, "meta[property='og:image'], meta[property='og:image:url']") {
        raw.push((url, OG_IMAGE_SCORE));
    }
    for url in meta_content(&document, "meta[name='twitter:image'], meta[name='twitter:image:src']") {
        raw.push((url, TWITTER_IMAGE_SCORE));
    }
    for selector in SOCIAL_META {
        for url in meta_content(&document, selector) {
            raw.push((url, SOCIAL_IMAGE_SCORE));
        }
    }

    if let Ok(selector) = parse_selector("link[rel='image_src']") {
        for link in document.select(&selector) {
            if let Some(href) = link.value().attr("href") {
                raw.push((href.to_string(), LINK_IMAGE_SRC_SCORE));
            }
        }
    }

    if let Ok(selector) = parse_selector("picture source[srcset], picture img[srcset]") {
        for source in document.select(&selector) {
            if let Some(url) = source.value().attr("srcset").and_then(first_srcset_entry) {
                raw.push((url.to_string(), PICTURE_SOURCE_SCORE));
            }
        }
    }

    if let Ok(selector) = parse_selector("img") {
        for img in document.select(&selector) {
            let value = img.value();
            let src = ["data-src", "data-lazy-src", "src"]
                .iter()
                .find_map(|attr| value.attr(attr).filter(|s| !s.trim().is_empty()))
                .or_else(|| value.attr("srcset").and_then(first_srcset_entry));
            if let (Some(src), Some(score)) = (src, score_img(img, min_width)) {
                raw.push((src.to_string(), score));
            }
        }
    }

    let mut seen = HashSet::new();
    let mut candidates: Vec<ImageCandidate> = raw
        .into_iter()
        .filter_map(|(url, score)| absolutize(page_url, &url).map(|url| (url, score)))
        .filter(|(url, _)| !is_bad_image(url))
        .filter(|(url, _)| seen.insert(url.clone()))
        .map(|(url, score)| ImageCandidate { url, score })
        .collect();
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates
}

pub struct ImageResolver {
    fetcher: Arc<RequestFetcher>,
    config: ImageConfig,
}

impl ImageResolver {
    pub fn new(fetcher: Arc<RequestFetcher>, config: ImageConfig) -> Self {
        Self { fetcher, config }
    }

    fn client(&self) -> &Client {
        self.fetcher.client()
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.fetch_timeout_secs)
    }

    /// Best validated image for the page, or `None` if nothing passes.
    ///
    /// The page is fetched again for the freshest markup; `fallback_html`
    /// is used when that fetch fails.
    pub async fn resolve_image(&self, url: &str, fallback_html: Option<&str>) -> Option<String> {
        if !self.config.enabled {
            return None;
        }

        let options = FetchOptions {
            timeout: self.timeout(),
            retries: self.config.fetch_retries,
            ..self.fetcher.defaults().clone()
        };
        let html = match self.fetcher.fetch_with(url, &options).await {
            Ok(page) => page.data,
            Err(e) => {
                warn!("Image lookup could not refetch {}: {}", url, e);
                fallback_html?.to_string()
            }
        };

        let candidates = collect_candidates(&html, url, self.config.min_width);
        debug!("{} image candidates for {}", candidates.len(), url);

        for candidate in candidates {
            match self.validate(&candidate.url).await {
                Ok(()) => {
                    info!("Selected image {} (score {:.0})", candidate.url, candidate.score);
                    return Some(candidate.url);
                }
                Err(e) => debug!("Rejected image {}: {}", candidate.url, e),
            }
        }
        None
    }

    /// HEAD probe: the URL must serve an image of at least `min_bytes`.
    /// A missing `Content-Length` is accepted.
    pub async fn validate(&self, image_url: &str) -> Result<(), ImageValidationError> {
        let response = self
            .client()
            .head(image_url)
            .timeout(self.timeout())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageValidationError::Status(status.as_u16()));
        }

        let headers = response.headers();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();
        if !content_type.starts_with("image/") {
            return Err(ImageValidationError::NotAnImage(content_type));
        }

        let size = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        match size {
            Some(size) if size < self.config.min_bytes => Err(ImageValidationError::TooSmall {
                size,
                min: self.config.min_bytes,
            }),
            _ => Ok(()),
        }
    }

    pub async fn is_valid(&self, image_url: &str) -> bool {
        match self.validate(image_url).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Image {} failed validation: {}", image_url, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::fetchers::RateLimiter;

    #[test]
    fn test_bad_image_filter() {
        assert!(is_bad_image("https://site.com/logo.png"));
        assert!(is_bad_image("https://site.com/ad-banner.jpg"));
        assert!(is_bad_image("https://site.com/static/favicon.ico"));
        assert!(is_bad_image("https://site.com/img/chef.svg?v=2"));
        assert!(!is_bad_image("https://site.com/pad-thai-hero.jpg"));
        assert!(!is_bad_image("https://site.com/iconic-burger.jpg"));
    }

    #[test]
    fn test_candidates_follow_priority_order() {
        let html = r#"<html><head>
            <script type="application/ld+json">
              {"@type": "Recipe", "name": "Tart",
               "image": [{"url": "/tart-small.jpg", "width": 200}, {"url": "/tart-1200.jpg", "width": 1200}]}
            </script>
            <meta property="og:image" content="https://cdn.example.com/tart-og.jpg">
            <meta name="twitter:image" content="https://cdn.example.com/tart-og.jpg">
            <link rel="image_src" href="/tart-link.jpg">
          </head><body>
            <nav><img src="/nav-photo.jpg"></nav>
            <img src="/site-logo.png" width="300" height="100">
            <article class="recipe-card"><img src="/tart-body.jpg" width="800" height="500"></article>
          </body></html>"#;

        let candidates = collect_candidates(html, "https://example.com/tart", 400);
        let urls: Vec<&str> = candidates.iter().map(|c| c.url.as_str()).collect();

        assert_eq!(
            urls,
            vec![
                "https://example.com/tart-1200.jpg",
                "https://cdn.example.com/tart-og.jpg",
                "https://example.com/tart-link.jpg",
                "https://example.com/tart-body.jpg",
                "https://example.com/nav-photo.jpg",
            ]
        );
    }

    #[test]
    fn test_img_heuristics() {
        let html = r#"<body>
            <div class="hero"><img src="/a.jpg" width="1200" height="700"></div>
            <img src="/b.jpg">
            <img src="/pixel-1.gif" width="1" height="1">
            <footer><img src="/c.jpg"></footer>
        </body>"#;
        let candidates = collect_candidates(html, "https://example.com/", 400);

        assert_eq!(candidates[0].url, "https://example.com/a.jpg");
        assert_eq!(candidates[0].score, IMG_BASE_SCORE + 100.0 + 50.0 + 100.0);
        assert_eq!(candidates[1].url, "https://example.com/b.jpg");
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[2].score, IMG_BASE_SCORE - IMG_CHROME_PENALTY);
    }

    fn resolver(config: ImageConfig) -> ImageResolver {
        let fetch = FetchConfig {
            retries: 1,
            ..FetchConfig::default()
        };
        let fetcher = RequestFetcher::with_rate_limiter(&fetch, Arc::new(RateLimiter::new(Duration::ZERO)));
        ImageResolver::new(Arc::new(fetcher), config)
    }

    #[tokio::test]
    async fn test_validate_checks_type_and_size() {
        let mut server = mockito::Server::new_async().await;
        let big = server
            .mock("HEAD", "/big.jpg")
            .with_header("content-type", "image/jpeg")
            .with_header("content-length", "20000")
            .create_async()
            .await;
        server
            .mock("HEAD", "/small.jpg")
            .with_header("content-type", "image/jpeg")
            .with_header("content-length", "2000")
            .create_async()
            .await;
        server
            .mock("HEAD", "/page.jpg")
            .with_header("content-type", "text/html")
            .create_async()
            .await;
        server.mock("HEAD", "/gone.jpg").with_status(404).create_async().await;

        let resolver = resolver(ImageConfig::default());
        let url = |path: &str| format!("{}{}", server.url(), path);

        assert!(resolver.validate(&url("/big.jpg")).await.is_ok());
        assert!(matches!(
            resolver.validate(&url("/small.jpg")).await,
            Err(ImageValidationError::TooSmall { size: 2000, .. })
        ));
        assert!(matches!(
            resolver.validate(&url("/page.jpg")).await,
            Err(ImageValidationError::NotAnImage(_))
        ));
        assert!(matches!(
            resolver.validate(&url("/gone.jpg")).await,
            Err(ImageValidationError::Status(404))
        ));
        big.assert_async().await;
    }

    #[tokio::test]
    async fn test_validate_accepts_missing_length() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/chunked.jpg")
            .with_header("content-type", "image/webp")
            .create_async()
            .await;

        let resolver = resolver(ImageConfig::default());
        let url = format!("{}/chunked.jpg", server.url());
        assert!(resolver.validate(&url).await.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_uses_fallback_html_and_skips_rejected() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/recipe").with_status(500).create_async().await;
        server
            .mock("HEAD", "/og.jpg")
            .with_header("content-type", "text/html")
            .create_async()
            .await;
        server
            .mock("HEAD", "/twitter.jpg")
            .with_header("content-type", "image/webp")
            .with_header("content-length", "16000")
            .create_async()
            .await;

        let page = format!("{}/recipe", server.url());
        let html = format!(
            r#"<meta property="og:image" content="{0}/og.jpg"><meta name="twitter:image" content="{0}/twitter.jpg">"#,
            server.url()
        );

        let resolver = resolver(ImageConfig {
            fetch_retries: 1,
            ..ImageConfig::default()
        });
        assert_eq!(
            resolver.resolve_image(&page, Some(&html)).await,
            Some(format!("{}/twitter.jpg", server.url()))
        );
        assert_eq!(resolver.resolve_image(&page, None).await, None);
    }

    #[tokio::test]
    async fn test_disabled_resolver_does_nothing() {
        let resolver = resolver(ImageConfig {
            enabled: false,
            ..ImageConfig::default()
        });
        assert_eq!(
            resolver
                .resolve_image("https://example.com/", Some("<meta property='og:image' content='/a.jpg'>"))
                .await,
            None
        );
    }
}
