// src/extractors/dispatch.rs
use std::collections::HashMap;

use scraper::Html;

use crate::config::{SourceConfig, TopicConfig};
use crate::extractors::layouts::ExtractionStrategy;
use crate::extractors::links::LinkNormalizer;
use crate::extractors::qa::{ExtractContext, ExtractedPair};
use crate::extractors::truncate::TruncationFilter;
use crate::utils::error::ExtractError;

/// Topic name to compiled layout strategy, plus the per-source link and
/// truncation settings every strategy shares.
pub struct StrategyDispatcher {
    strategies: HashMap<String, Box<dyn ExtractionStrategy>>,
    links: LinkNormalizer,
    truncation: TruncationFilter,
}

impl StrategyDispatcher {
    pub fn new(
        topics: &[TopicConfig],
        links: LinkNormalizer,
        truncation: TruncationFilter,
    ) -> Result<Self, ExtractError> {
        let mut strategies = HashMap::with_capacity(topics.len());
        for topic in topics {
            let strategy = topic.layout.strategy()?;
            tracing::debug!("Topic '{}' uses the {} layout", topic.topic, strategy.name());
            strategies.insert(topic.topic.clone(), strategy);
        }
        Ok(Self { strategies, links, truncation })
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self, ExtractError> {
        Self::new(
            &config.topics,
            LinkNormalizer::parse(&config.base_url)?,
            TruncationFilter::new(config.truncate_at.iter().cloned()),
        )
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        self.strategies.contains_key(topic)
    }

    pub fn links(&self) -> &LinkNormalizer {
        &self.links
    }

    /// Runs the topic's layout over `document`.
    ///
    /// A topic without a configured layout is an error; a document that
    /// doesn't match its layout just yields no pairs.
    pub fn extract(&self, topic: &str, document: &Html) -> Result<Vec<ExtractedPair>, ExtractError> {
        let strategy = self
            .strategies
            .get(topic)
            .ok_or_else(|| ExtractError::UnknownTopic(topic.to_string()))?;

        let cx = ExtractContext { topic, links: &self.links, truncation: &self.truncation };
        let pairs = strategy.extract(document, &cx);
        tracing::info!("Topic '{}' ({}): {} pair(s)", topic, strategy.name(), pairs.len());
        Ok(pairs)
    }
}
