// src/record/mod.rs
//! Canonical question/answer records and the crawl-level context they are
//! stamped with.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use scraper::Html;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::config::SourceConfig;
use crate::extractors::dom;
use crate::extractors::layouts::compile_selector;
use crate::extractors::qa::ExtractedPair;
use crate::utils::error::ExtractError;

pub const TYPE_OF_INFO: &str = "QA";

/// Constants shared by every record of one crawl.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub source_name: String,
    pub crawled_at: DateTime<Utc>,
    /// Epoch seconds of the source's own date.
    pub source_date: f64,
    /// Epoch seconds of the source's "last reviewed/updated" date.
    pub last_update_time: f64,
    pub response_authority: String,
    pub base_url: Url,
    pub target_education_level: String,
    pub target_location: String,
    pub language: String,
    /// Node id for version-1 UUIDs, random per crawl.
    pub node_id: [u8; 6],
}

impl SourceContext {
    /// Context with both source dates set to the crawl time.
    pub fn new(config: &SourceConfig) -> Result<Self, ExtractError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|_| ExtractError::InvalidBaseUrl(config.base_url.clone()))?;
        let crawled_at = Utc::now();
        let now = crawled_at.timestamp() as f64;

        Ok(Self {
            source_name: config.source_name.clone(),
            crawled_at,
            source_date: now,
            last_update_time: now,
            response_authority: config.response_authority.clone(),
            base_url,
            target_education_level: config.target_education_level.clone(),
            target_location: config.target_location.clone(),
            language: config.language.clone(),
            node_id: random_node_id(),
        })
    }

    pub fn with_source_date(mut self, date: DateTime<Utc>) -> Self {
        let secs = date.timestamp() as f64;
        self.source_date = secs;
        self.last_update_time = secs;
        self
    }

    /// Context for a source whose landing page carries the review date and
    /// the answering authority.
    pub fn from_document(config: &SourceConfig, landing: &Html) -> Result<Self, ExtractError> {
        let mut context = Self::new(config)?;

        if let Some(source) = &config.last_updated {
            let selector = compile_selector(&source.selector)?;
            match landing.select(&selector).next().map(dom::plain_text) {
                Some(text) => match parse_source_date(&text, &source.format) {
                    Some(date) => {
                        tracing::info!("Source '{}' last reviewed {}", config.source_name, date.date_naive());
                        context = context.with_source_date(date);
                    }
                    None => tracing::warn!(
                        "Could not parse '{}' with format '{}', using crawl time",
                        text,
                        source.format
                    ),
                },
                None => tracing::warn!("No '{}' element for the review date, using crawl time", source.selector),
            }
        }

        if let Some(css) = &config.authority_selector {
            let selector = compile_selector(css)?;
            match landing.select(&selector).next().map(dom::plain_text) {
                Some(text) if !text.is_empty() => context.response_authority = text,
                _ => tracing::warn!(
                    "No authority found at '{}', keeping '{}'",
                    css,
                    context.response_authority
                ),
            }
        }

        Ok(context)
    }
}

/// Parses a page date such as `March 19, 2020` to midnight UTC.
pub fn parse_source_date(text: &str, format: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(text.trim(), format)
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
}

fn random_node_id() -> [u8; 6] {
    let mut node = [0u8; 6];
    node.copy_from_slice(&Uuid::new_v4().as_bytes()[..6]);
    node[0] |= 0x01; // multicast bit marks a node id that isn't a real MAC
    node
}

/// The output schema. Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    /// Kept for grouping and logging; not part of the serialized record.
    #[serde(skip)]
    pub topic: String,
    pub source_name: String,
    pub type_of_info: String,
    pub date_scraped: f64,
    pub source_date: f64,
    pub last_update_time: f64,
    pub need_update: bool,
    #[serde(rename = "containsURLs")]
    pub contains_urls: bool,
    pub is_annotated: bool,
    pub response_authority: String,
    #[serde(rename = "questionUUID")]
    pub question_uuid: Uuid,
    #[serde(rename = "answerUUID")]
    pub answer_uuid: Uuid,
    #[serde(rename = "exampleUUID")]
    pub example_uuid: Uuid,
    pub question_text: String,
    pub answer_text: String,
    pub has_answer: bool,
    pub target_education_level: String,
    pub extra_data: BTreeMap<String, String>,
    pub target_location: String,
    pub language: String,
}

/// Stamps extracted pairs with identifiers and crawl metadata.
pub struct RecordBuilder<'c> {
    context: &'c SourceContext,
}

impl<'c> RecordBuilder<'c> {
    pub fn new(context: &'c SourceContext) -> Self {
        Self { context }
    }

    pub fn build(&self, topic: &str, pair: ExtractedPair) -> CanonicalRecord {
        let cx = self.context;
        let has_answer = !pair.answer.trim().is_empty();

        CanonicalRecord {
            topic: pair.topic_label.unwrap_or_else(|| topic.to_string()),
            source_name: cx.source_name.clone(),
            type_of_info: TYPE_OF_INFO.to_string(),
            date_scraped: Utc::now().timestamp() as f64,
            source_date: cx.source_date,
            last_update_time: cx.last_update_time,
            need_update: true,
            contains_urls: pair.contains_url,
            is_annotated: false,
            response_authority: cx.response_authority.clone(),
            question_uuid: Uuid::now_v1(&cx.node_id),
            answer_uuid: Uuid::now_v1(&cx.node_id),
            example_uuid: Uuid::now_v1(&cx.node_id),
            question_text: pair.question,
            answer_text: pair.answer,
            has_answer,
            target_education_level: cx.target_education_level.clone(),
            extra_data: pair.extra_data,
            target_location: cx.target_location.clone(),
            language: cx.language.clone(),
        }
    }

    pub fn build_all(&self, topic: &str, pairs: Vec<ExtractedPair>) -> Vec<CanonicalRecord> {
        pairs.into_iter().map(|pair| self.build(topic, pair)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn config() -> SourceConfig {
        SourceConfig::from_json(
            r#"{ "source_name": "CDC", "base_url": "https://www.cdc.gov",
                 "page_url": "https://www.cdc.gov/coronavirus/2019-ncov/faq.html",
                 "response_authority": "CDC",
                 "authority_selector": "div.content-source",
                 "last_updated": { "selector": "span#last-reviewed-date" },
                 "target_location": "United States" }"#,
        )
        .unwrap()
    }

    fn pair(question: &str, answer: &str) -> ExtractedPair {
        ExtractedPair { question: question.into(), answer: answer.into(), ..ExtractedPair::default() }
    }

    #[test]
    fn landing_page_supplies_date_and_authority() {
        let landing = Html::parse_document(
            r#"<div class="content-source">Centers for Disease Control and Prevention</div>
               <span id="last-reviewed-date">March 19, 2020</span>"#,
        );
        let context = SourceContext::from_document(&config(), &landing).unwrap();

        assert_eq!(context.source_date, 1_584_576_000.0);
        assert_eq!(context.last_update_time, context.source_date);
        assert_eq!(context.response_authority, "Centers for Disease Control and Prevention");
    }

    #[test]
    fn missing_landing_fields_fall_back() {
        let landing = Html::parse_document("<p>no metadata</p>");
        let context = SourceContext::from_document(&config(), &landing).unwrap();

        assert_eq!(context.response_authority, "CDC");
        assert_eq!(context.source_date, context.crawled_at.timestamp() as f64);
    }

    #[test]
    fn record_defaults_and_fresh_ids() {
        let context = SourceContext::new(&config()).unwrap();
        let builder = RecordBuilder::new(&context);
        let records = builder.build_all(
            "Basics",
            vec![pair("What is COVID-19?", "A disease."), pair("Empty?", "  \n ")],
        );

        let first = &records[0];
        assert_eq!(first.topic, "Basics");
        assert_eq!(first.type_of_info, "QA");
        assert!(first.need_update);
        assert!(!first.is_annotated);
        assert!(first.has_answer);
        assert_eq!(first.target_location, "United States");
        assert_eq!(first.question_uuid.get_version_num(), 1);
        assert!(!records[1].has_answer);

        let ids: HashSet<Uuid> = records
            .iter()
            .flat_map(|r| [r.question_uuid, r.answer_uuid, r.example_uuid])
            .collect();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn topic_label_overrides_topic() {
        let context = SourceContext::new(&config()).unwrap();
        let mut labelled = pair("What is an N95?", "A respirator.");
        labelled.topic_label = Some("Respirators".into());
        let record = RecordBuilder::new(&context).build("Personal Protective Equipment", labelled);
        assert_eq!(record.topic, "Respirators");
    }

    #[test]
    fn serializes_exactly_the_output_fields() {
        let context = SourceContext::new(&config()).unwrap();
        let mut p = pair("Q?", "See <a href=\"https://www.cdc.gov/x\">x</a>");
        p.contains_url = true;
        p.extra_data.insert("x".into(), "https://www.cdc.gov/x".into());
        let record = RecordBuilder::new(&context).build("Basics", p);

        let value = serde_json::to_value(&record).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        let mut expected = vec![
            "sourceName", "typeOfInfo", "dateScraped", "sourceDate", "lastUpdateTime", "needUpdate",
            "containsURLs", "isAnnotated", "responseAuthority", "questionUUID", "answerUUID",
            "exampleUUID", "questionText", "answerText", "hasAnswer", "targetEducationLevel",
            "extraData", "targetLocation", "language",
        ];
        expected.sort_unstable();
        assert_eq!(keys, expected);
        assert_eq!(value["containsURLs"], true);
        assert!(value["dateScraped"].is_f64());
        assert_eq!(value["extraData"]["x"], "https://www.cdc.gov/x");
    }
}
