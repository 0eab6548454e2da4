use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

use super::rate_limiter::RateLimiter;
use super::user_agents::{classify_response, select_user_agent, BrowserClass};
use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::model::FetchResult;

/// Per-call fetch parameters.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub retries: u32,
    pub delay: Duration,
    pub user_agent_class: Option<BrowserClass>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for FetchOptions {
    fn from(config: &FetchConfig) -> Self {
        Self {
            timeout: config.timeout(),
            retries: config.retries,
            delay: config.retry_delay(),
            user_agent_class: config.user_agent_class,
        }
    }
}

/// HTTP GET with retries, rotating browser identities and block detection.
pub struct RequestFetcher {
    client: Client,
    limiter: Arc<RateLimiter>,
    defaults: FetchOptions,
}

impl RequestFetcher {
    /// Create a fetcher sharing the process-wide rate limiter.
    pub fn new(config: &FetchConfig) -> Self {
        let limiter = RateLimiter::global(config.min_request_interval());
        Self::with_rate_limiter(config, limiter)
    }

    pub fn with_rate_limiter(config: &FetchConfig, limiter: Arc<RateLimiter>) -> Self {
        let client = Client::builder()
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            limiter,
            defaults: FetchOptions::from(config),
        }
    }

    pub fn defaults(&self) -> &FetchOptions {
        &self.defaults
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetch with this fetcher's configured options.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        let options = self.defaults.clone();
        self.fetch_with(url, &options).await
    }

    pub async fn fetch_with(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<FetchResult, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
        let max_attempts = options.retries.max(1);
        let mut attempt: u32 = 0;

        loop {
            self.limiter.wait().await;

            let (agent, class) = select_user_agent(attempt, options.user_agent_class);
            debug!(
                "Fetching {} (attempt {}/{}) as {:?}",
                url,
                attempt + 1,
                max_attempts,
                class
            );

            match self.attempt(&parsed, attempt, agent, class, options).await {
                Ok(mut result) => {
                    result.attempts = attempt + 1;
                    info!(
                        "Fetched {} with status {} after {} attempt(s)",
                        url, result.status, result.attempts
                    );
                    return Ok(result);
                }
                Err(e) => {
                    attempt += 1;
                    warn!(
                        "Fetch attempt {}/{} for {} failed: {}",
                        attempt, max_attempts, url, e
                    );
                    if attempt >= max_attempts {
                        return Err(FetchError::Exhausted {
                            attempts: attempt,
                            last: Box::new(e),
                        });
                    }
                    // Linear backoff
                    let backoff = options.delay * attempt;
                    debug!("Waiting {:?} before retry", backoff);
                    sleep(backoff).await;
                }
            }
        }
    }

    async fn attempt(
        &self,
        url: &Url,
        attempt: u32,
        agent: &'static str,
        class: BrowserClass,
        options: &FetchOptions,
    ) -> Result<FetchResult, FetchError> {
        let headers = build_headers(url, attempt, agent, class)?;

        let response = self
            .client
            .get(url.as_str())
            .headers(headers)
            .timeout(options.timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response.text().await?;

        if let Some(reason) = classify_response(status, &body) {
            return Err(FetchError::Blocked { status, reason });
        }
        if !(200..300).contains(&status) {
            return Err(FetchError::Status(status));
        }

        Ok(FetchResult {
            data: body,
            status,
            headers,
            attempts: attempt + 1,
            final_user_agent: agent.to_string(),
        })
    }
}

/// Referer used on retries: alternate between a search engine and the site itself.
fn synthetic_referer(url: &Url, attempt: u32) -> Option<String> {
    if attempt == 0 {
        return None;
    }
    if attempt % 2 == 1 {
        let query: String = url
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            .unwrap_or("recipe")
            .replace(['-', '_'], "+");
        Some(format!("https://www.google.com/search?q={query}"))
    } else {
        Some(format!("{}/", url.origin().ascii_serialization()))
    }
}

fn build_headers(
    url: &Url,
    attempt: u32,
    agent: &str,
    class: BrowserClass,
) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_str(agent)?);
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    let referer = synthetic_referer(url, attempt);
    if let Some(referer) = &referer {
        headers.insert(REFERER, HeaderValue::from_str(referer)?);
    }

    if class == BrowserClass::Chrome {
        let platform = if agent.contains("Macintosh") {
            "\"macOS\""
        } else if agent.contains("Linux") {
            "\"Linux\""
        } else {
            "\"Windows\""
        };
        let fetch_site = match &referer {
            None => "none",
            Some(r) if r.starts_with("https://www.google.com") => "cross-site",
            Some(_) => "same-origin",
        };

        headers.insert(
            "sec-ch-ua",
            HeaderValue::from_static(
                "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\"",
            ),
        );
        headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
        headers.insert("sec-ch-ua-platform", HeaderValue::from_static(platform));
        headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
        headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
        headers.insert("Sec-Fetch-Site", HeaderValue::from_static(fetch_site));
        headers.insert("Sec-Fetch-User", HeaderValue::from_static("?1"));
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn test_fetcher(retries: u32) -> RequestFetcher {
        let config = FetchConfig {
            retries,
            retry_delay_ms: 5,
            min_request_interval_ms: 0,
            ..FetchConfig::default()
        };
        RequestFetcher::with_rate_limiter(&config, Arc::new(RateLimiter::new(Duration::ZERO)))
    }

    #[test]
    fn test_first_attempt_has_no_referer() {
        let url = Url::parse("https://example.com/recipes/pad-thai").unwrap();
        assert_eq!(synthetic_referer(&url, 0), None);
        assert_eq!(
            synthetic_referer(&url, 1).unwrap(),
            "https://www.google.com/search?q=pad+thai"
        );
        assert_eq!(synthetic_referer(&url, 2).unwrap(), "https://example.com/");
    }

    #[test]
    fn test_chrome_headers_include_client_hints() {
        let url = Url::parse("https://example.com/").unwrap();
        let (agent, class) = select_user_agent(0, None);
        let headers = build_headers(&url, 0, agent, class).unwrap();
        assert!(headers.contains_key("sec-ch-ua"));
        assert_eq!(headers.get("Sec-Fetch-Site").unwrap(), "none");

        let (agent, class) = select_user_agent(1, None);
        let headers = build_headers(&url, 1, agent, class).unwrap();
        assert!(!headers.contains_key("sec-ch-ua"));
        assert!(headers.contains_key(REFERER));
    }

    #[tokio::test]
    async fn test_fetch_success_first_try() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/recipe")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(format!("<html><body>{}</body></html>", "recipe ".repeat(100)))
            .create_async()
            .await;

        let fetcher = test_fetcher(3);
        let result = fetcher
            .fetch(&format!("{}/recipe", server.url()))
            .await
            .unwrap();

        assert_eq!(result.status, 200);
        assert_eq!(result.attempts, 1);
        assert!(result.final_user_agent.contains("Chrome"));
        assert_eq!(result.headers.get("content-type").unwrap(), "text/html");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_exhausts_retries() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/blocked")
            .with_status(429)
            .with_body("Too many requests")
            .expect(2)
            .create_async()
            .await;

        let fetcher = test_fetcher(2);
        let err = fetcher
            .fetch(&format!("{}/blocked", server.url()))
            .await
            .unwrap_err();

        match &err {
            FetchError::Exhausted { attempts, .. } => assert_eq!(*attempts, 2),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_blocked());
        assert!(err.to_string().contains("2 attempts"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_retries_not_found() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("x".repeat(600))
            .expect(2)
            .create_async()
            .await;

        let fetcher = test_fetcher(2);
        let err = fetcher
            .fetch(&format!("{}/missing", server.url()))
            .await
            .unwrap_err();
        assert!(!err.is_blocked());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_url_is_not_retried() {
        let fetcher = test_fetcher(3);
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_retry_sends_referer() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/page")
            .match_header("referer", Matcher::Missing)
            .with_status(503)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/page")
            .match_header("referer", Matcher::Regex("google".to_string()))
            .with_status(200)
            .with_body("<html>".to_string() + &"ok ".repeat(300) + "</html>")
            .create_async()
            .await;

        let fetcher = test_fetcher(3);
        let result = fetcher
            .fetch(&format!("{}/page", server.url()))
            .await
            .unwrap();

        assert_eq!(result.attempts, 2);
        assert!(result.final_user_agent.contains("Firefox"));
        first.assert_async().await;
        second.assert_async().await;
    }
}
