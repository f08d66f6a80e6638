// src/extractors/layouts.rs
//! One `ExtractionStrategy` per supported page shape.
//!
//! Strategies never fail on the document: a page whose shape doesn't match
//! yields no pairs (and a warning). Only building a strategy can fail, when
//! its configured selectors don't parse.

// --- Imports ---
use scraper::{Html, Selector};

use crate::config::{AccordionLayout, HeaderBlockLayout, Layout, MixedInlineLayout, SubtopicLayout};
use crate::extractors::dom;
use crate::extractors::qa::{self, ExtractContext, ExtractedPair, PairBuilder, Scope};
use crate::extractors::segment::{self, Boundary};
use crate::utils::error::ExtractError;

/// Turns one parsed page into ordered question/answer pairs.
pub trait ExtractionStrategy {
    fn name(&self) -> &'static str;
    fn extract(&self, document: &Html, cx: &ExtractContext<'_>) -> Vec<ExtractedPair>;
}

pub fn compile_selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::InvalidSelector {
        selector: css.to_string(),
        reason: format!("{:?}", e),
    })
}

/// `card-body bg-quaternary` -> `.card-body.bg-quaternary`
fn class_selector(classes: &str) -> Result<Selector, ExtractError> {
    let css: String = classes.split_whitespace().map(|c| format!(".{}", c)).collect();
    compile_selector(&css)
}

impl Layout {
    /// Compiles this layout's selectors into a ready strategy.
    pub fn strategy(&self) -> Result<Box<dyn ExtractionStrategy>, ExtractError> {
        Ok(match self {
            Layout::Accordion(l) => Box::new(AccordionStrategy::new(l)?),
            Layout::HeaderBlock(l) => Box::new(HeaderBlockStrategy::new(l)?),
            Layout::MixedInline(l) => Box::new(MixedInlineStrategy::new(l)?),
            Layout::Subtopic(l) => Box::new(SubtopicStrategy::new(l)?),
        })
    }
}

// --- Accordion ---

pub struct AccordionStrategy {
    container: Selector,
    header: Selector,
    body: Selector,
    reference_url: Option<String>,
}

impl AccordionStrategy {
    pub fn new(layout: &AccordionLayout) -> Result<Self, ExtractError> {
        Ok(Self {
            container: compile_selector(&format!("div#accordion-{}", layout.id))?,
            header: class_selector(&layout.header_class)?,
            body: class_selector(&layout.body_class)?,
            reference_url: layout.reference_url.clone(),
        })
    }
}

impl ExtractionStrategy for AccordionStrategy {
    fn name(&self) -> &'static str {
        "accordion"
    }

    fn extract(&self, document: &Html, cx: &ExtractContext<'_>) -> Vec<ExtractedPair> {
        let containers: Vec<_> = document.select(&self.container).collect();
        if containers.is_empty() {
            tracing::warn!("Topic '{}': accordion container not found", cx.topic);
            return Vec::new();
        }

        let mut pairs = Vec::new();
        for container in containers {
            let headers = dom::find_all(container, &self.header);
            let bodies = dom::find_all(container, &self.body);
            if headers.len() != bodies.len() {
                tracing::debug!(
                    "Topic '{}': {} header(s) vs {} body(ies), extra ones ignored",
                    cx.topic,
                    headers.len(),
                    bodies.len()
                );
            }

            for (header, body) in headers.into_iter().zip(bodies) {
                let mut builder = PairBuilder::new(dom::plain_text(header));
                builder.push_node(body);
                if let Some(reference) = &self.reference_url {
                    builder.extra("referenceURL", reference.as_str());
                }
                pairs.push(builder.finish(cx));
            }
        }
        pairs
    }
}

// --- Header block ---

pub struct HeaderBlockStrategy {
    container: Selector,
    layout: HeaderBlockLayout,
    boundary: Boundary,
}

impl HeaderBlockStrategy {
    pub fn new(layout: &HeaderBlockLayout) -> Result<Self, ExtractError> {
        let mut boundary = Boundary::same_tag(layout.heading.as_str());
        if let Some(tags) = &layout.answer_tags {
            boundary = boundary.or(Boundary::not_tag_in(tags.iter().cloned()));
        }
        if let Some(marker) = &layout.stop_marker {
            boundary = boundary.or(Boundary::contains_marker(marker.as_str()));
        }
        Ok(Self {
            container: compile_selector(&layout.container)?,
            layout: layout.clone(),
            boundary,
        })
    }

    fn is_question_heading(&self, heading: scraper::ElementRef<'_>) -> bool {
        if !self.layout.skip_linked_headings {
            return true;
        }
        // Linked or empty headings are navigation, not questions
        dom::find_all_tag(heading, "a").is_empty() && !dom::plain_text(heading).is_empty()
    }
}

impl ExtractionStrategy for HeaderBlockStrategy {
    fn name(&self) -> &'static str {
        "header_block"
    }

    fn extract(&self, document: &Html, cx: &ExtractContext<'_>) -> Vec<ExtractedPair> {
        let mut pairs = Vec::new();
        let mut headings_seen = 0;

        for container in document.select(&self.container) {
            for heading in dom::find_all_tag(container, &self.layout.heading) {
                headings_seen += 1;
                if !self.is_question_heading(heading) {
                    tracing::trace!("Skipping non-question heading '{}'", dom::plain_text(heading));
                    continue;
                }

                let nodes = segment::segment(heading, &self.boundary);
                if nodes.is_empty() {
                    tracing::debug!("Heading '{}' has no content before the next boundary", dom::plain_text(heading));
                    continue;
                }

                let label = self
                    .layout
                    .topic_heading
                    .as_deref()
                    .and_then(|tag| dom::find_previous_sibling(heading, tag))
                    .map(dom::plain_text);
                let mut builder = PairBuilder::new(dom::plain_text(heading))
                    .label(label)
                    .strip_tags(&self.layout.strip_tags);
                for node in nodes {
                    builder.push_node(node);
                }
                pairs.push(builder.finish(cx));
            }
        }

        if headings_seen == 0 {
            tracing::warn!(
                "Topic '{}': no <{}> headings inside '{}'",
                cx.topic,
                self.layout.heading,
                self.layout.container
            );
        }
        pairs
    }
}

// --- Mixed inline ---

pub struct MixedInlineStrategy {
    container: Selector,
    heading: Option<String>,
}

impl MixedInlineStrategy {
    pub fn new(layout: &MixedInlineLayout) -> Result<Self, ExtractError> {
        Ok(Self {
            container: compile_selector(&layout.container)?,
            heading: layout.heading.clone(),
        })
    }
}

impl ExtractionStrategy for MixedInlineStrategy {
    fn name(&self) -> &'static str {
        "mixed_inline"
    }

    fn extract(&self, document: &Html, cx: &ExtractContext<'_>) -> Vec<ExtractedPair> {
        let mut pairs = Vec::new();
        let mut containers = 0;

        for container in document.select(&self.container) {
            containers += 1;
            match &self.heading {
                Some(tag) => {
                    let boundary = Boundary::same_tag(tag.as_str());
                    let headings = dom::find_all_tag(container, tag);
                    for (i, &heading) in headings.iter().enumerate() {
                        let range = segment::segment(heading, &boundary);
                        let scope = Scope::new(container).until(headings.get(i + 1).copied());
                        pairs.extend(qa::mixed_pairs(&range, scope, None, cx));
                    }
                }
                None => {
                    let range: Vec<_> = dom::element_children(container).collect();
                    pairs.extend(qa::mixed_pairs(&range, Scope::new(container), None, cx));
                }
            }
        }

        if containers == 0 {
            tracing::warn!("Topic '{}': no mixed Q/A container found", cx.topic);
        }
        pairs
    }
}

// --- Subtopic ---

pub struct SubtopicStrategy {
    container: Selector,
    titled_links: Selector,
    layout: SubtopicLayout,
}

impl SubtopicStrategy {
    pub fn new(layout: &SubtopicLayout) -> Result<Self, ExtractError> {
        Ok(Self {
            container: compile_selector(&layout.container)?,
            titled_links: compile_selector("a[title]")?,
            layout: layout.clone(),
        })
    }
}

impl ExtractionStrategy for SubtopicStrategy {
    fn name(&self) -> &'static str {
        "subtopic"
    }

    fn extract(&self, document: &Html, cx: &ExtractContext<'_>) -> Vec<ExtractedPair> {
        let mut pairs = Vec::new();
        let outer_boundary = Boundary::same_tag(self.layout.heading.as_str());

        for container in document.select(&self.container) {
            let outers = dom::find_all_tag(container, &self.layout.heading);
            if outers.is_empty() {
                continue;
            }

            let titles: Vec<String> = container
                .select(&self.titled_links)
                .filter_map(|a| a.value().attr("title"))
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();

            for (i, &outer) in outers.iter().enumerate() {
                let label = titles.get(i).cloned().unwrap_or_else(|| dom::plain_text(outer));

                let mut inner = Vec::new();
                for node in segment::segment(outer, &outer_boundary) {
                    if dom::has_tag(node, &self.layout.subheading) {
                        inner.push(node);
                    } else {
                        inner.extend(dom::find_all_tag(node, &self.layout.subheading));
                    }
                }
                tracing::debug!("Subtopic '{}': {} <{}> node(s)", label, inner.len(), self.layout.subheading);

                let scope = Scope::new(container).until(outers.get(i + 1).copied());
                pairs.extend(qa::mixed_pairs(&inner, scope, Some(label.as_str()), cx));
            }
        }

        if pairs.is_empty() {
            tracing::warn!("Topic '{}': no subtopic pairs found", cx.topic);
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::links::LinkNormalizer;
    use crate::extractors::truncate::TruncationFilter;

    fn run(layout: Layout, html: &str, truncate: &[&str]) -> Vec<ExtractedPair> {
        let document = Html::parse_document(html);
        let links = LinkNormalizer::parse("https://www.cdc.gov").unwrap();
        let truncation = TruncationFilter::new(truncate.iter().copied());
        let cx = ExtractContext { topic: "Test", links: &links, truncation: &truncation };
        layout.strategy().unwrap().extract(&document, &cx)
    }

    fn header_block(container: &str, heading: &str) -> HeaderBlockLayout {
        HeaderBlockLayout {
            container: container.to_string(),
            heading: heading.to_string(),
            skip_linked_headings: false,
            answer_tags: None,
            stop_marker: None,
            strip_tags: Vec::new(),
            topic_heading: None,
        }
    }

    fn accordion(id: u32) -> Layout {
        Layout::Accordion(AccordionLayout {
            id,
            header_class: "card-header".into(),
            body_class: "card-body".into(),
            reference_url: None,
        })
    }

    const ACCORDION: &str = r#"
        <div id="accordion-3" class="accordion">
          <div class="card"><div class="card-header"><span>What is a novel coronavirus?</span></div>
            <div class="collapse"><div class="card-body"><p>A novel coronavirus is a new coronavirus.</p>
            <p>Not the same as <a href="/coronavirus/types.html">common coronaviruses</a>.</p></div></div></div>
          <div class="card"><div class="card-header">Why is it called COVID-19?</div>
            <div class="collapse"><div class="card-body"><p>CO for corona.</p></div></div></div>
          <div class="card"><div class="card-header">Dangling header?</div></div>
        </div>
        <div id="accordion-4"><div class="card-header">Other?</div><div class="card-body">Other.</div></div>"#;

    #[test]
    fn accordion_zips_headers_with_bodies() {
        let pairs = run(accordion(3), ACCORDION, &[]);

        assert_eq!(pairs.len(), 2); // min(3 headers, 2 bodies)
        assert_eq!(pairs[0].question, "What is a novel coronavirus?");
        assert_eq!(
            pairs[0].answer,
            "A novel coronavirus is a new coronavirus. Not the same as <a href=\"https://www.cdc.gov/coronavirus/types.html\">common coronaviruses</a>."
        );
        assert!(pairs[0].contains_url);
        assert_eq!(pairs[1].question, "Why is it called COVID-19?");
        assert_eq!(pairs[1].answer, "CO for corona.");
        assert!(!pairs[1].contains_url);
    }

    #[test]
    fn accordion_missing_container_is_empty_and_reference_url_is_kept() {
        assert!(run(accordion(9), ACCORDION, &[]).is_empty());

        let layout = Layout::Accordion(AccordionLayout {
            id: 4,
            header_class: "card-header".into(),
            body_class: "card-body".into(),
            reference_url: Some("https://www.cdc.gov/coronavirus/2019-ncov/hcp/faq.html".into()),
        });
        let pairs = run(layout, ACCORDION, &[]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(
            pairs[0].extra_data.get("referenceURL").map(String::as_str),
            Some("https://www.cdc.gov/coronavirus/2019-ncov/hcp/faq.html")
        );
    }

    #[test]
    fn header_block_collects_paragraphs_until_next_heading() {
        let html = r#"<div class="card-body">
            <h4>What is X?</h4><p>X is a thing.</p><p>It is common.</p>
            <h4>What is Y?</h4></div>"#;
        let pairs = run(Layout::HeaderBlock(header_block("div.card-body", "h4")), html, &[]);

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question, "What is X?");
        assert_eq!(pairs[0].answer, "X is a thing.\nIt is common.");
    }

    #[test]
    fn header_block_never_crosses_the_next_heading() {
        let html = r#"<div class="col-md-12">
            <h4>Can the virus spread in pools?</h4><p>No evidence.</p>
            <h4>Is tap water safe?</h4><p>Yes, it is treated.</p></div>"#;
        let pairs = run(Layout::HeaderBlock(header_block("div.col-md-12", "h4")), html, &[]);

        assert_eq!(pairs.len(), 2);
        assert!(!pairs[0].answer.contains("Yes, it is treated."));
        assert!(!pairs[0].answer.contains("tap water"));
        assert_eq!(pairs[1].answer, "Yes, it is treated.");
    }

    #[test]
    fn header_block_article_options() {
        let html = r#"<div property="schema:text">
            <h2>Transmission</h2>
            <h3><a href="/x">Related</a></h3>
            <h3>How long does the virus survive?</h3>
            <p>Hours to days. <em>Photo: CDC</em></p>
            <ul><li>On plastic, longer.</li></ul>
            <div class="ad">Subscribe</div>
            <p>Unreachable.</p>
            <h3>Should I stock up?</h3>
            <p>Modestly. Eric Toner, MD is a senior scholar.</p>
            <p>dkerecm1</p>
        </div>"#;
        let layout = HeaderBlockLayout {
            container: r#"div[property="schema:text"]"#.into(),
            heading: "h3".into(),
            skip_linked_headings: true,
            answer_tags: Some(vec!["p".into(), "ul".into()]),
            stop_marker: Some("dkerecm1".into()),
            strip_tags: vec!["em".into()],
            topic_heading: Some("h2".into()),
        };
        let pairs = run(Layout::HeaderBlock(layout), html, &["Eric Toner, MD"]);

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].question, "How long does the virus survive?");
        assert_eq!(pairs[0].answer, "Hours to days.\nOn plastic, longer.");
        assert_eq!(pairs[0].topic_label.as_deref(), Some("Transmission"));
        assert_eq!(pairs[1].answer, "Modestly. ");
    }

    #[test]
    fn mixed_inline_without_heading_uses_container_children() {
        let html = r#"<div class="faq"><p><strong>Q: Is it safe?</strong> A: Yes, it is.</p></div>"#;
        let layout = Layout::MixedInline(MixedInlineLayout { container: "div.faq".into(), heading: None });
        let pairs = run(layout, html, &[]);

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question, "Is it safe?");
        assert_eq!(pairs[0].answer, "Yes, it is.");
    }

    #[test]
    fn mixed_inline_ranges_are_bounded_by_headings() {
        let html = r#"<div class="col-md-12">
            <h2>Biosafety</h2>
            <p><strong>Q: Which BSL is needed?</strong></p><p>A: BSL-2.</p>
            <h2>Shipping</h2>
            <p><strong>Q: How to ship?</strong> A: As category B.</p>
        </div>"#;
        let layout = Layout::MixedInline(MixedInlineLayout {
            container: "div.col-md-12".into(),
            heading: Some("h2".into()),
        });
        let pairs = run(layout, html, &[]);

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].answer, "BSL-2.");
        assert_eq!(pairs[1].question, "How to ship?");
        assert_eq!(pairs[1].answer, "As category B.");
    }

    #[test]
    fn subtopic_groups_use_anchor_titles() {
        let html = r##"<div class="col-md-12">
            <p><a href="#resp" title="Respirators">Respirators</a> <a href="#gowns" title="Gowns">Gowns</a></p>
            <h2>N95 devices</h2>
            <ul>
              <li><strong>Q: What is an N95?</strong> A: A filtering respirator.</li>
              <li><strong>Q: Can it be reused?</strong> A: In shortages.</li>
            </ul>
            <h2>Isolation gowns</h2>
            <ul><li><strong>Q: Are gowns required?</strong> A: For some procedures.</li></ul>
        </div>"##;
        let layout = Layout::Subtopic(SubtopicLayout {
            container: "div.col-md-12".into(),
            heading: "h2".into(),
            subheading: "li".into(),
        });
        let pairs = run(layout, html, &[]);

        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].topic_label.as_deref(), Some("Respirators"));
        assert_eq!(pairs[1].question, "Can it be reused?");
        assert_eq!(pairs[1].answer, "In shortages.");
        assert_eq!(pairs[2].topic_label.as_deref(), Some("Gowns"));
        assert_eq!(pairs[2].answer, "For some procedures.");
    }

    #[test]
    fn subtopic_falls_back_to_heading_text() {
        let html = r#"<div class="c"><h2>Masks</h2><ul><li>Q: Cloth? A: Yes.</li></ul></div>"#;
        let layout = Layout::Subtopic(SubtopicLayout {
            container: "div.c".into(),
            heading: "h2".into(),
            subheading: "li".into(),
        });
        let pairs = run(layout, html, &[]);
        assert_eq!(pairs[0].topic_label.as_deref(), Some("Masks"));
        assert_eq!(pairs[0].question, "Cloth?");
    }

    #[test]
    fn invalid_selector_is_a_config_error() {
        let layout = Layout::HeaderBlock(header_block("div[[", "h4"));
        assert!(matches!(layout.strategy(), Err(ExtractError::InvalidSelector { .. })));
    }
}
