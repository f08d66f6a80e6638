// src/extractors/links.rs
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

use crate::extractors::dom::{self, ResolveHref};
use crate::utils::error::ExtractError;

// Any `scheme:` prefix, so mailto:, tel: and javascript: pass through untouched
static SCHEME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("Failed to compile SCHEME_RE")
});

// Bare URLs in text count as well as anchor markup
static URL_HINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)https?").expect("Failed to compile URL_HINT_RE")
});

static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a[href]").expect("Failed to compile ANCHOR_SELECTOR")
});

/// Resolves hrefs found in a source's pages against that source's base URL.
#[derive(Debug, Clone)]
pub struct LinkNormalizer {
    base: Url,
}

impl LinkNormalizer {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    pub fn parse(base: &str) -> Result<Self, ExtractError> {
        Url::parse(base)
            .map(Self::new)
            .map_err(|_| ExtractError::InvalidBaseUrl(base.to_string()))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Absolute form of `href`. References that already carry a scheme come
    /// back unchanged; anything unresolvable is returned as given. Resolution
    /// follows `Url::join`, so `../x` and `x` depend on the base's path.
    pub fn normalize(&self, href: &str) -> String {
        let href = href.trim();
        if href.is_empty() || SCHEME_RE.is_match(href) {
            return href.to_string();
        }
        match self.base.join(href) {
            Ok(resolved) => resolved.to_string(),
            Err(e) => {
                tracing::debug!("Leaving unresolvable href '{}' as-is: {}", href, e);
                href.to_string()
            }
        }
    }
}

impl ResolveHref for LinkNormalizer {
    fn resolve(&self, href: &str) -> String {
        self.normalize(href)
    }
}

/// Lexical check for `http`/`https` anywhere in `text`, case-insensitive.
pub fn contains_url(text: &str) -> bool {
    URL_HINT_RE.is_match(text)
}

/// One entry of a landing page's topic list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicLink {
    pub title: String,
    pub url: String,
}

/// Collects the topic links under every container matched by `index`.
/// Anchors without text are skipped; a repeated title keeps its first URL.
pub fn discover_topics(
    root: ElementRef<'_>,
    index: &Selector,
    normalizer: &LinkNormalizer,
) -> Vec<TopicLink> {
    let mut topics: Vec<TopicLink> = Vec::new();

    for container in dom::find_all(root, index) {
        for anchor in container.select(&ANCHOR_SELECTOR) {
            let title = dom::plain_text(anchor);
            if title.is_empty() || topics.iter().any(|t| t.title == title) {
                continue;
            }
            let href = anchor.value().attr("href").unwrap_or_default();
            let url = normalizer.normalize(href);
            tracing::debug!("Discovered topic '{}' at {}", title, url);
            topics.push(TopicLink { title, url });
        }
    }

    if topics.is_empty() {
        tracing::warn!("Topic index matched no links");
    }
    topics
}
