// src/lib.rs
//! Turns public health FAQ pages into canonical question/answer records.
//!
//! The engine under [`extractors`] and [`record`] works on an already parsed
//! [`scraper::Html`] tree and never touches the network or the disk; the
//! [`fetch`] and [`storage`] modules are the collaborators the CLI wires
//! around it.

pub mod config;
pub mod extractors;
pub mod fetch;
pub mod record;
pub mod storage;
pub mod utils;

use scraper::Html;

use crate::config::SourceConfig;
use crate::extractors::links::TopicLink;
use crate::extractors::StrategyDispatcher;
use crate::record::{CanonicalRecord, RecordBuilder, SourceContext};
use crate::utils::error::ExtractError;

/// Records for one topic plus how many of them came out of the fallback
/// or malformed-marker paths.
#[derive(Debug, Default)]
pub struct TopicExtraction {
    pub records: Vec<CanonicalRecord>,
    pub needs_review: usize,
}

/// Page to load for every topic, configured topics first.
///
/// A configured topic without its own `url` takes the link the landing
/// page's index gives it, else the landing page. Index entries with no
/// configuration are appended so they surface as unknown topics.
pub fn topic_pages(config: &SourceConfig, discovered: Vec<TopicLink>) -> Vec<TopicLink> {
    let mut pages: Vec<TopicLink> = config
        .topics
        .iter()
        .map(|topic| {
            let indexed = discovered.iter().find(|link| link.title == topic.topic);
            let url = match (&topic.url, indexed) {
                (None, Some(link)) => link.url.clone(),
                _ => config.topic_url(topic),
            };
            TopicLink { title: topic.topic.clone(), url }
        })
        .collect();

    for link in discovered {
        if !pages.iter().any(|page| page.title == link.title) {
            tracing::debug!("Topic '{}' found only in the index", link.title);
            pages.push(link);
        }
    }
    pages
}

/// Runs the topic's layout over `document` and stamps every pair.
pub fn extract_records(
    dispatcher: &StrategyDispatcher,
    topic: &str,
    document: &Html,
    context: &SourceContext,
) -> Result<TopicExtraction, ExtractError> {
    let pairs = dispatcher.extract(topic, document)?;
    let needs_review = pairs.iter().filter(|p| p.needs_review).count();
    if needs_review > 0 {
        tracing::warn!("Topic '{}': {} pair(s) need manual review", topic, needs_review);
    }

    let records = RecordBuilder::new(context).build_all(topic, pairs);
    Ok(TopicExtraction { records, needs_review })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "source_name": "CDC",
        "base_url": "https://www.cdc.gov",
        "page_url": "https://www.cdc.gov/coronavirus/2019-ncov/faq.html",
        "topics": [
            { "topic": "Travel", "layout": { "kind": "accordion", "id": 1 } },
            { "topic": "Laboratory Biosafety",
              "layout": { "kind": "mixed_inline", "container": "div.col-md-12" } }
        ]
    }"#;

    #[test]
    fn accordion_page_to_records() {
        let config = SourceConfig::from_json(CONFIG).unwrap();
        let dispatcher = StrategyDispatcher::from_config(&config).unwrap();
        let context = SourceContext::new(&config).unwrap();
        let html = Html::parse_document(
            r#"<div id="accordion-1">
                 <div class="card-header">Can I travel?</div>
                 <div class="card-body"><p>See <a href="/travel">travel notices</a>.</p></div>
               </div>"#,
        );

        let out = extract_records(&dispatcher, "Travel", &html, &context).unwrap();
        assert_eq!(out.needs_review, 0);
        assert_eq!(out.records.len(), 1);

        let record = &out.records[0];
        assert_eq!(record.topic, "Travel");
        assert_eq!(record.question_text, "Can I travel?");
        assert!(record.contains_urls);
        assert!(record.has_answer);
        assert_eq!(record.extra_data.get("travel notices").map(String::as_str), Some("https://www.cdc.gov/travel"));
    }

    #[test]
    fn orphan_answer_is_counted_for_review() {
        let config = SourceConfig::from_json(CONFIG).unwrap();
        let dispatcher = StrategyDispatcher::from_config(&config).unwrap();
        let context = SourceContext::new(&config).unwrap();
        let html = Html::parse_document(r#"<div class="col-md-12"><p>A: Stray answer.</p></div>"#);

        let out = extract_records(&dispatcher, "Laboratory Biosafety", &html, &context).unwrap();
        assert_eq!(out.needs_review, 1);
        assert_eq!(out.records[0].question_text, "");
        assert_eq!(out.records[0].answer_text, "Stray answer.");
    }

    #[test]
    fn unknown_topic_propagates() {
        let config = SourceConfig::from_json(CONFIG).unwrap();
        let dispatcher = StrategyDispatcher::from_config(&config).unwrap();
        let context = SourceContext::new(&config).unwrap();
        let html = Html::parse_document("<p></p>");
        assert!(matches!(
            extract_records(&dispatcher, "Pets", &html, &context),
            Err(ExtractError::UnknownTopic(_))
        ));
    }

    #[test]
    fn topic_pages_prefer_explicit_then_indexed_urls() {
        let config = SourceConfig::from_json(
            r#"{ "source_name": "CDC", "base_url": "https://www.cdc.gov",
                 "page_url": "https://www.cdc.gov/coronavirus/2019-ncov/faq.html",
                 "topics": [
                   { "topic": "Travel", "layout": { "kind": "accordion", "id": 1 } },
                   { "topic": "Water Transmission", "url": "/water.html",
                     "layout": { "kind": "header_block", "container": "div.card-body", "heading": "h4" } },
                   { "topic": "Basics", "layout": { "kind": "accordion", "id": 2 } }
                 ] }"#,
        )
        .unwrap();
        let discovered = vec![
            TopicLink { title: "Travel".into(), url: "https://www.cdc.gov/travel/faqs.html".into() },
            TopicLink { title: "Water Transmission".into(), url: "https://www.cdc.gov/other.html".into() },
            TopicLink { title: "Pets".into(), url: "https://www.cdc.gov/pets.html".into() },
        ];

        let pages = topic_pages(&config, discovered);
        let urls: Vec<(&str, &str)> = pages.iter().map(|p| (p.title.as_str(), p.url.as_str())).collect();
        assert_eq!(
            urls,
            vec![
                ("Travel", "https://www.cdc.gov/travel/faqs.html"),
                ("Water Transmission", "https://www.cdc.gov/water.html"),
                ("Basics", "https://www.cdc.gov/coronavirus/2019-ncov/faq.html"),
                ("Pets", "https://www.cdc.gov/pets.html"),
            ]
        );
    }
}
