// src/config/mod.rs
//! Per-source configuration: where the pages live, which layout each topic
//! uses, and the literal phrases that end an answer.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::utils::error::ConfigError;

/// Top-level description of one FAQ source.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SourceConfig {
    pub source_name: String,
    /// Base for relative links in answers. Links resolve by RFC 3986 `Url::join`,
    /// so an origin-only base behaves as an origin prefix.
    pub base_url: String,
    /// Landing page carrying the "last reviewed" date, the authority and the topic index.
    pub page_url: String,
    #[serde(default)]
    pub response_authority: String,
    #[serde(default)]
    pub authority_selector: Option<String>,
    #[serde(default)]
    pub last_updated: Option<DateSource>,
    #[serde(default = "default_education_level")]
    pub target_education_level: String,
    #[serde(default)]
    pub target_location: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub truncate_at: Vec<String>,
    #[serde(default)]
    pub topic_index: Option<TopicIndex>,
    #[serde(default)]
    pub topics: Vec<TopicConfig>,
}

/// Where to read the page's "last reviewed" date and how it is written.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DateSource {
    pub selector: String,
    #[serde(default = "default_date_format")]
    pub format: String,
}

/// Link lists on the landing page that enumerate the source's topics.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TopicIndex {
    pub selector: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TopicConfig {
    pub topic: String,
    /// Page holding the topic; relative to `base_url`. Defaults to `page_url`.
    #[serde(default)]
    pub url: Option<String>,
    pub layout: Layout,
}

/// The four supported page shapes.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layout {
    Accordion(AccordionLayout),
    HeaderBlock(HeaderBlockLayout),
    MixedInline(MixedInlineLayout),
    Subtopic(SubtopicLayout),
}

impl Layout {
    pub fn kind(&self) -> &'static str {
        match self {
            Layout::Accordion(_) => "accordion",
            Layout::HeaderBlock(_) => "header_block",
            Layout::MixedInline(_) => "mixed_inline",
            Layout::Subtopic(_) => "subtopic",
        }
    }
}

/// `div#accordion-{id}` with header cards zipped against body cards.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AccordionLayout {
    pub id: u32,
    #[serde(default = "default_header_class")]
    pub header_class: String,
    #[serde(default = "default_body_class")]
    pub body_class: String,
    /// Stored in every record's extra data under `referenceURL`.
    #[serde(default)]
    pub reference_url: Option<String>,
}

/// Headings of one tag, each answered by the siblings up to the next one.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HeaderBlockLayout {
    pub container: String,
    pub heading: String,
    #[serde(default)]
    pub skip_linked_headings: bool,
    #[serde(default)]
    pub answer_tags: Option<Vec<String>>,
    #[serde(default)]
    pub stop_marker: Option<String>,
    #[serde(default)]
    pub strip_tags: Vec<String>,
    #[serde(default)]
    pub topic_heading: Option<String>,
}

/// Paragraphs carrying emphasized questions and `Q:` / `A:` markers.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MixedInlineLayout {
    pub container: String,
    #[serde(default)]
    pub heading: Option<String>,
}

/// Outer headings grouping sub-headings that follow the inline marker rule.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SubtopicLayout {
    pub container: String,
    pub heading: String,
    pub subheading: String,
}

fn default_education_level() -> String {
    "NA".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_date_format() -> String {
    "%B %d, %Y".to_string()
}

fn default_header_class() -> String {
    "card-header".to_string()
}

fn default_body_class() -> String {
    "card-body".to_string()
}

impl SourceConfig {
    /// Reads and validates a JSON source file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_label = path.display().to_string();
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path_label.clone(), source })?;
        let config = Self::from_json(&raw).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse { path: path_label.clone(), source },
            other => other,
        })?;
        tracing::info!("Loaded config for '{}' with {} topic(s) from {}", config.source_name, config.topics.len(), path_label);
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: SourceConfig = serde_json::from_str(raw)
            .map_err(|source| ConfigError::Parse { path: "<inline>".to_string(), source })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.source_name.trim().is_empty() {
            return Err(invalid("source_name", "must not be empty"));
        }
        for (field, value) in [("base_url", &self.base_url), ("page_url", &self.page_url)] {
            Url::parse(value).map_err(|e| invalid(field, &e.to_string()))?;
        }

        let mut seen = HashSet::new();
        for topic in &self.topics {
            if !seen.insert(topic.topic.as_str()) {
                return Err(invalid("topics", &format!("topic '{}' is configured twice", topic.topic)));
            }
        }
        Ok(())
    }

    /// Absolute page URL for a topic.
    pub fn topic_url(&self, topic: &TopicConfig) -> String {
        match &topic.url {
            Some(url) => Url::parse(&self.base_url)
                .and_then(|base| base.join(url))
                .map(|u| u.to_string())
                .unwrap_or_else(|_| url.clone()),
            None => self.page_url.clone(),
        }
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.to_string(), reason: reason.to_string() }
}
