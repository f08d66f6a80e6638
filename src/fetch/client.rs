// src/fetch/client.rs
use std::collections::HashMap;
use std::time::Duration;

use reqwest::header;

use crate::utils::error::FetchError;

const USER_AGENT: &str = concat!("faq_extractor/", env!("CARGO_PKG_VERSION"));
/// Politeness delay before every HTTP request.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 150;
pub const REQUEST_DELAY_ENV: &str = "FAQ_REQUEST_DELAY_MS";

/// CLI value first, then `FAQ_REQUEST_DELAY_MS`, then the default.
pub fn request_delay(cli: Option<u64>) -> Duration {
    let millis = cli
        .or_else(|| {
            std::env::var(REQUEST_DELAY_ENV).ok().and_then(|v| match v.trim().parse() {
                Ok(ms) => Some(ms),
                Err(_) => {
                    tracing::warn!("Ignoring unparseable {}={}", REQUEST_DELAY_ENV, v);
                    None
                }
            })
        })
        .unwrap_or(DEFAULT_REQUEST_DELAY_MS);
    Duration::from_millis(millis)
}

fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()
}

fn is_remote(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Downloads one page after sleeping for `delay`.
pub async fn download_page(url: &str, delay: Duration) -> Result<String, FetchError> {
    let client = build_client()?;

    tracing::info!("Downloading page from: {}", url);
    tracing::debug!("Using User-Agent: {}", USER_AGENT);

    tokio::time::sleep(delay).await;

    let response = client
        .get(url)
        .header(header::ACCEPT, "text/html,application/xhtml+xml,*/*")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        tracing::error!("HTTP error status: {} for URL: {}", status, url);
        if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Received {} - slow down with --request-delay-ms.", status);
            return Err(FetchError::RateLimited(url.to_string()));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::PageNotFound(url.to_string()));
        }
        return Err(FetchError::Http { status, url: url.to_string() });
    }

    let body = response.text().await?;
    tracing::debug!("Successfully downloaded {} bytes from {}", body.len(), url);
    Ok(body)
}

/// Loads `location` over HTTP(S), or from disk for anything else.
/// Local reads skip the politeness delay.
pub async fn load_page(location: &str, delay: Duration) -> Result<String, FetchError> {
    if is_remote(location) {
        return download_page(location, delay).await;
    }

    let path = location.strip_prefix("file://").unwrap_or(location);
    let body = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FetchError::LocalRead { path: path.to_string(), source })?;
    tracing::debug!("Read {} bytes from {}", body.len(), path);
    Ok(body)
}

/// Raw page bodies keyed by location, so topics sharing a page load it once.
/// The fragment is ignored: `faq.html#travel` and `faq.html#masks` are one page.
#[derive(Debug, Default)]
pub struct PageCache {
    pages: HashMap<String, String>,
    delay: Duration,
}

impl PageCache {
    pub fn new(delay: Duration) -> Self {
        Self { pages: HashMap::new(), delay }
    }

    pub async fn get(&mut self, location: &str) -> Result<&str, FetchError> {
        let key = location.split('#').next().unwrap_or(location).to_string();
        if !self.pages.contains_key(&key) {
            let body = load_page(&key, self.delay).await?;
            self.pages.insert(key.clone(), body);
        } else {
            tracing::debug!("Page cache hit for {}", key);
        }
        Ok(self.pages.get(&key).map(String::as_str).unwrap_or_default())
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
