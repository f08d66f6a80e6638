// src/extractors/segment.rs
//! Bounded sibling walks. Every layout is expressed as one of these walks
//! plus a boundary, so the layouts differ only in where they stop.

use scraper::ElementRef;

use crate::extractors::dom;

/// Stop condition for a sibling walk. The matching sibling is never collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Boundary {
    /// Sibling has exactly this tag.
    SameTag(String),
    /// Sibling has any of these tags.
    AnyTag(Vec<String>),
    /// Sibling's tag is not in the list.
    NotTagIn(Vec<String>),
    /// Sibling's text contains this literal.
    ContainsMarker(String),
    /// Sibling is an `h1`..`h6`.
    Heading,
    /// Any of the inner boundaries.
    Any(Vec<Boundary>),
}

impl Boundary {
    pub fn same_tag(tag: impl Into<String>) -> Self {
        Boundary::SameTag(tag.into())
    }

    pub fn any_tag<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Boundary::AnyTag(tags.into_iter().map(Into::into).collect())
    }

    pub fn not_tag_in<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Boundary::NotTagIn(tags.into_iter().map(Into::into).collect())
    }

    pub fn contains_marker(marker: impl Into<String>) -> Self {
        Boundary::ContainsMarker(marker.into())
    }

    pub fn heading() -> Self {
        Boundary::Heading
    }

    /// Stops at whichever of `self` and `other` matches first.
    pub fn or(self, other: Boundary) -> Self {
        match self {
            Boundary::Any(mut inner) => {
                inner.push(other);
                Boundary::Any(inner)
            }
            first => Boundary::Any(vec![first, other]),
        }
    }

    pub fn matches(&self, sibling: ElementRef<'_>) -> bool {
        let name = sibling.value().name();
        match self {
            Boundary::SameTag(tag) => name == tag,
            Boundary::AnyTag(tags) => tags.iter().any(|t| t == name),
            Boundary::NotTagIn(tags) => !tags.iter().any(|t| t == name),
            Boundary::ContainsMarker(marker) => sibling.text().collect::<String>().contains(marker.as_str()),
            Boundary::Heading => dom::is_heading(sibling),
            Boundary::Any(inner) => inner.iter().any(|b| b.matches(sibling)),
        }
    }
}

/// Element siblings strictly after `start`, up to (not including) the first
/// one matching `boundary`, or to the end of the parent.
pub fn segment<'a>(start: ElementRef<'a>, boundary: &Boundary) -> Vec<ElementRef<'a>> {
    let mut collected = Vec::new();
    for sibling in dom::next_element_siblings(start) {
        if boundary.matches(sibling) {
            tracing::trace!("Segment after <{}> stops at <{}>", start.value().name(), sibling.value().name());
            break;
        }
        collected.push(sibling);
    }
    collected
}

/// A node sequence split into runs.
#[derive(Debug, Default)]
pub struct Partition<'a> {
    /// Nodes before the first run start.
    pub preamble: Vec<ElementRef<'a>>,
    /// Each run begins with a node for which the start test held.
    pub runs: Vec<Vec<ElementRef<'a>>>,
}

/// Splits `nodes` into runs, opening a new run at every node where
/// `starts_run` holds.
pub fn partition<'a, F>(nodes: &[ElementRef<'a>], starts_run: F) -> Partition<'a>
where
    F: Fn(ElementRef<'a>) -> bool,
{
    let mut parts = Partition::default();
    for &node in nodes {
        if starts_run(node) {
            parts.runs.push(vec![node]);
        } else if let Some(run) = parts.runs.last_mut() {
            run.push(node);
        } else {
            parts.preamble.push(node);
        }
    }
    parts
}
