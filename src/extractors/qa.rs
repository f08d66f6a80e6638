// src/extractors/qa.rs
//! Question/answer pairs and the inline `Q:` / `A:` marker rule shared by the
//! mixed-inline and subtopic layouts.

// --- Imports ---
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;

use crate::extractors::dom::{self, RenderOptions, Rendered};
use crate::extractors::links::{self, LinkNormalizer};
use crate::extractors::segment::{self, Boundary};
use crate::extractors::truncate::TruncationFilter;

// --- Constants ---
pub const QUESTION_MARKER: &str = "Q:";
pub const ANSWER_MARKER: &str = "A:";

const EMPHASIS_TAGS: &[&str] = &["strong", "b", "em"];

// Markers count only as whole tokens, so `FAQ:` and `FDA:` are plain text
static QUESTION_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bQ:").expect("Failed to compile QUESTION_MARKER_RE")
});

static ANSWER_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bA:").expect("Failed to compile ANSWER_MARKER_RE")
});

/// Part of the document a question's answer may come from: inside `root`
/// and before `stop` in document order.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub root: ElementRef<'a>,
    pub stop: Option<ElementRef<'a>>,
}

impl<'a> Scope<'a> {
    pub fn new(root: ElementRef<'a>) -> Self {
        Self { root, stop: None }
    }

    pub fn until(mut self, stop: Option<ElementRef<'a>>) -> Self {
        self.stop = stop;
        self
    }

    pub fn contains(&self, node: ElementRef<'a>) -> bool {
        for descendant in self.root.descendants() {
            if self.stop.map_or(false, |stop| stop.id() == descendant.id()) {
                return false;
            }
            if descendant.id() == node.id() {
                return true;
            }
        }
        false
    }
}

/// Per-topic inputs every layout needs while turning nodes into pairs.
pub struct ExtractContext<'c> {
    pub topic: &'c str,
    pub links: &'c LinkNormalizer,
    pub truncation: &'c TruncationFilter,
}

/// One question with its final answer text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedPair {
    /// Overrides the configured topic (subtopic groups, previous-heading labels).
    pub topic_label: Option<String>,
    pub question: String,
    pub answer: String,
    pub contains_url: bool,
    /// Link text to absolute URL, for links that survived truncation.
    pub extra_data: BTreeMap<String, String>,
    /// Set when the answer came from the cross-level fallback scan or from an
    /// `A:` block with no question.
    pub needs_review: bool,
}

/// A piece of an answer before it is joined into text.
#[derive(Debug, Clone)]
pub enum AnswerFragment<'a> {
    Node {
        node: ElementRef<'a>,
        skip: Vec<ElementRef<'a>>,
    },
    Rendered(Rendered),
}

/// Collects answer fragments for one question and renders them into an
/// `ExtractedPair` in a single pass.
#[derive(Debug, Default)]
pub struct PairBuilder<'a> {
    question: String,
    fragments: Vec<AnswerFragment<'a>>,
    topic_label: Option<String>,
    strip_tags: Vec<String>,
    extra_data: BTreeMap<String, String>,
    needs_review: bool,
}

impl<'a> PairBuilder<'a> {
    pub fn new(question: impl Into<String>) -> Self {
        Self { question: question.into(), ..Self::default() }
    }

    pub fn push_node(&mut self, node: ElementRef<'a>) {
        self.fragments.push(AnswerFragment::Node { node, skip: Vec::new() });
    }

    pub fn push_rendered(&mut self, rendered: Rendered) {
        self.fragments.push(AnswerFragment::Rendered(rendered));
    }

    pub fn label(mut self, label: Option<String>) -> Self {
        self.topic_label = label;
        self
    }

    pub fn strip_tags(mut self, tags: &[String]) -> Self {
        self.strip_tags = tags.to_vec();
        self
    }

    pub fn extra(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extra_data.insert(key.into(), value.into());
    }

    pub fn flag_for_review(&mut self) {
        self.needs_review = true;
    }

    /// True when no fragment pushed so far carries text.
    pub fn has_no_answer(&self) -> bool {
        self.fragments.iter().all(|fragment| match fragment {
            AnswerFragment::Rendered(r) => r.is_blank(),
            AnswerFragment::Node { node, skip } => skip.is_empty() && dom::plain_text(*node).is_empty(),
        })
    }

    /// Renders, joins (one fragment per line), truncates, and derives the URL signals.
    pub fn finish(self, cx: &ExtractContext<'_>) -> ExtractedPair {
        let mut pieces: Vec<String> = Vec::with_capacity(self.fragments.len());
        let mut rendered_links = Vec::new();

        for fragment in self.fragments {
            let rendered = match fragment {
                AnswerFragment::Node { node, skip } => dom::render(
                    node,
                    &RenderOptions { resolver: cx.links, skip: &skip, strip_tags: &self.strip_tags },
                ),
                AnswerFragment::Rendered(rendered) => rendered,
            };
            if rendered.is_blank() {
                continue;
            }
            rendered_links.extend(rendered.links);
            pieces.push(rendered.text);
        }

        let answer = cx.truncation.apply(&pieces.join("\n"));

        let mut extra_data = self.extra_data;
        for link in rendered_links {
            if answer.contains(link.href.as_str()) {
                extra_data.entry(link.text).or_insert(link.href);
            }
        }

        ExtractedPair {
            topic_label: self.topic_label,
            question: dom::collapse_whitespace(&self.question),
            contains_url: links::contains_url(&answer),
            answer,
            extra_data,
            needs_review: self.needs_review,
        }
    }
}

// --- Marker helpers ---

/// Removes a leading marker (after trimming) and the whitespace behind it.
pub fn strip_marker(text: &str, marker: &str) -> String {
    let trimmed = text.trim();
    trimmed
        .strip_prefix(marker)
        .map(str::trim)
        .unwrap_or(trimmed)
        .to_string()
}

/// Emphasized text ending in `?`: the node itself or its first such descendant.
pub fn question_emphasis<'a>(node: ElementRef<'a>) -> Option<ElementRef<'a>> {
    node.descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| EMPHASIS_TAGS.contains(&el.value().name()))
        .find(|el| dom::plain_text(*el).ends_with('?'))
}

/// Byte offset of the first `Q:` token in `text`.
pub fn find_question_marker(text: &str) -> Option<usize> {
    QUESTION_MARKER_RE.find(text).map(|m| m.start())
}

/// Byte offset of the first `A:` token in `text`.
pub fn find_answer_marker(text: &str) -> Option<usize> {
    ANSWER_MARKER_RE.find(text).map(|m| m.start())
}

/// A node opens a new pair if it carries an emphasized question or a `Q:` marker.
pub fn is_question_node(node: ElementRef<'_>) -> bool {
    question_emphasis(node).is_some() || find_question_marker(&dom::plain_text(node)).is_some()
}

/// Splits `... Q: question A: answer` text. Without an `A:` marker the whole
/// remainder is the question.
fn split_marked_text(text: &str) -> (String, String) {
    let after_q = match find_question_marker(text) {
        Some(idx) => &text[idx + QUESTION_MARKER.len()..],
        None => text,
    };
    match find_answer_marker(after_q) {
        Some(idx) => (
            after_q[..idx].trim().to_string(),
            after_q[idx + ANSWER_MARKER.len()..].trim().to_string(),
        ),
        None => (after_q.trim().to_string(), String::new()),
    }
}

// --- Mixed-inline rule ---

/// Applies the inline marker rule to an ordered node range.
///
/// The range is cut into runs at question nodes. Each run's head supplies the
/// question and the start of the answer; the remaining nodes of the run
/// continue the answer. A question left without an answer may borrow one
/// from later paragraphs, but only from inside `scope`.
pub fn mixed_pairs<'a>(
    nodes: &[ElementRef<'a>],
    scope: Scope<'a>,
    label: Option<&str>,
    cx: &ExtractContext<'_>,
) -> Vec<ExtractedPair> {
    let parts = segment::partition(nodes, is_question_node);
    let mut pairs = Vec::with_capacity(parts.runs.len() + 1);

    if let Some(orphan) = orphan_answer(&parts.preamble, label, cx) {
        pairs.push(orphan);
    }
    for run in &parts.runs {
        pairs.push(question_run(run, scope, label, cx));
    }
    pairs
}

fn render_with_skip<'a>(node: ElementRef<'a>, skip: &[ElementRef<'a>], cx: &ExtractContext<'_>) -> Rendered {
    dom::render(node, &RenderOptions { resolver: cx.links, skip, strip_tags: &[] })
}

fn question_run<'a>(
    run: &[ElementRef<'a>],
    scope: Scope<'a>,
    label: Option<&str>,
    cx: &ExtractContext<'_>,
) -> ExtractedPair {
    let head = run[0];

    let (question, head_answer) = match question_emphasis(head) {
        Some(emphasis) => {
            let question = strip_marker(&dom::plain_text(emphasis), QUESTION_MARKER);
            // `Q:` may sit outside the emphasis: `<p>Q: <b>...?</b> A: ...</p>`
            let mut rest = render_with_skip(head, &[emphasis], cx);
            rest.text = strip_marker(&strip_marker(&rest.text, QUESTION_MARKER), ANSWER_MARKER);
            (question, rest)
        }
        None => {
            let rendered = render_with_skip(head, &[], cx);
            let (question, answer) = split_marked_text(&rendered.text);
            (question, Rendered { text: answer, links: rendered.links })
        }
    };

    tracing::trace!("Question '{}' opens a run of {} node(s)", question, run.len());
    let mut builder = PairBuilder::new(question).label(label.map(str::to_string));
    let mut continuation = &run[1..];
    if head_answer.is_blank() {
        // `<p><b>Q: ...?</b></p><p>A: ...</p>`: the marker opens the next node instead
        if let Some((&first, tail)) = continuation.split_first() {
            let mut opening = render_with_skip(first, &[], cx);
            opening.text = strip_marker(&opening.text, ANSWER_MARKER);
            builder.push_rendered(opening);
            continuation = tail;
        }
    } else {
        builder.push_rendered(head_answer);
    }
    for &node in continuation {
        builder.push_node(node);
    }

    if run.len() == 1 && builder.has_no_answer() {
        scan_forward_for_answer(head, scope, &mut builder, cx);
    }
    builder.finish(cx)
}

/// The question's answer sits at a different nesting level: continue from the
/// next paragraph in document order, then its paragraph siblings, until a
/// `Q:` marker, a heading, or the end of `scope`.
fn scan_forward_for_answer<'a>(
    head: ElementRef<'a>,
    scope: Scope<'a>,
    builder: &mut PairBuilder<'a>,
    cx: &ExtractContext<'_>,
) {
    let Some(first) = dom::find_next(head, "p").filter(|p| scope.contains(*p)) else {
        tracing::debug!("Topic '{}': question without answer and no paragraph follows in range", cx.topic);
        return;
    };
    if find_question_marker(&dom::plain_text(first)).is_some() {
        tracing::debug!("Topic '{}': next paragraph already opens a new question", cx.topic);
        return;
    }

    tracing::warn!(
        "Topic '{}': answer taken from a paragraph outside the question's sibling range, flag for manual review",
        cx.topic
    );
    builder.flag_for_review();

    let mut opening = render_with_skip(first, &[], cx);
    opening.text = strip_marker(&opening.text, ANSWER_MARKER);
    builder.push_rendered(opening);

    let continuation = segment::segment(first, &Boundary::heading())
        .into_iter()
        .take_while(|node| find_question_marker(&dom::plain_text(*node)).is_none() && scope.contains(*node));
    for node in continuation {
        if dom::has_tag(node, "p") {
            builder.push_node(node);
        }
    }
}

/// Text carrying `A:` before any question is kept as an answer with no question.
fn orphan_answer(preamble: &[ElementRef<'_>], label: Option<&str>, cx: &ExtractContext<'_>) -> Option<ExtractedPair> {
    let start = preamble
        .iter()
        .position(|node| find_answer_marker(&dom::plain_text(*node)).is_some())?;

    tracing::warn!(
        "Topic '{}': '{}' marker with no matching question, flag for manual review",
        cx.topic,
        ANSWER_MARKER
    );

    let mut builder = PairBuilder::new(String::new()).label(label.map(str::to_string));
    builder.flag_for_review();

    let mut opening = render_with_skip(preamble[start], &[], cx);
    if let Some(idx) = find_answer_marker(&opening.text) {
        opening.text = opening.text[idx + ANSWER_MARKER.len()..].trim().to_string();
    }
    builder.push_rendered(opening);
    for &node in &preamble[start + 1..] {
        builder.push_node(node);
    }
    Some(builder.finish(cx))
}
