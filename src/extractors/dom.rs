// src/extractors/dom.rs
//! Thin query and rendering layer over a parsed `scraper::Html` tree.
//!
//! Nothing here mutates the tree. Elements that a layout wants "removed"
//! before rendering (a question's `<strong>`, a credit line in `<em>`) are
//! passed in a skip list instead, so every render sees the pristine document.

// --- Imports ---
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{node::Node, ElementRef, Selector};

// --- Constants ---
// Elements that start a new visual line; a space is emitted around them so
// adjacent paragraphs don't run together once text is collapsed.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "dl", "dt", "dd", "table", "tr", "td", "th", "section",
    "article", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6",
];

const DROPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

// Non-text badges and icons that sit inside links
const DECORATION_TAGS: &[&str] = &["img", "svg", "i", "picture"];

pub const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").expect("Failed to compile WHITESPACE_RE")
});

/// Turns an anchor's `href` into the form written to records.
pub trait ResolveHref {
    fn resolve(&self, href: &str) -> String;
}

/// Per-render switches. `skip` holds elements dropped from this render only.
pub struct RenderOptions<'r, 'a> {
    pub resolver: &'r dyn ResolveHref,
    pub skip: &'r [ElementRef<'a>],
    pub strip_tags: &'r [String],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLink {
    pub text: String,
    pub href: String,
}

/// Text of a subtree plus every link rendered into it, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub links: Vec<RenderedLink>,
}

impl Rendered {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

// --- Queries ---

/// All descendants of `root` matching `selector`, in document order.
pub fn find_all<'a>(root: ElementRef<'a>, selector: &Selector) -> Vec<ElementRef<'a>> {
    root.select(selector).collect()
}

/// All descendants of `root` (not `root` itself) with the given tag name.
pub fn find_all_tag<'a>(root: ElementRef<'a>, tag: &str) -> Vec<ElementRef<'a>> {
    root.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == tag)
        .collect()
}

/// Element siblings strictly after `start`, text and comment nodes skipped.
pub fn next_element_siblings<'a>(start: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    start.next_siblings().filter_map(ElementRef::wrap)
}

/// Element children of `parent`, in order.
pub fn element_children<'a>(parent: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    parent.children().filter_map(ElementRef::wrap)
}

/// First element named `tag` after `node` in document order. Like a
/// document-order scan, `node`'s own descendants come first.
pub fn find_next<'a>(node: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    let named = |el: &ElementRef<'a>| el.value().name() == tag;

    if let Some(found) = node.descendants().skip(1).filter_map(ElementRef::wrap).find(named) {
        return Some(found);
    }

    let mut current = Some(*node);
    while let Some(anchor) = current {
        for sibling in anchor.next_siblings() {
            if let Some(found) = sibling.descendants().filter_map(ElementRef::wrap).find(named) {
                return Some(found);
            }
        }
        current = anchor.parent();
    }
    None
}

/// Nearest previous element sibling with the given tag.
pub fn find_previous_sibling<'a>(node: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    node.prev_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == tag)
}

pub fn is_heading(el: ElementRef<'_>) -> bool {
    HEADING_TAGS.contains(&el.value().name())
}

pub fn has_tag(el: ElementRef<'_>, tag: &str) -> bool {
    el.value().name() == tag
}

// --- Text ---

/// Collapses every whitespace run (non-breaking spaces included) to one space and trims.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// All text under `el`, markup ignored, whitespace collapsed.
pub fn plain_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Depth-first rendering of `el`.
///
/// Anchors become one `<a href="...">text</a>` token with an absolute href.
/// Their own text nodes are only ever emitted through that token, and
/// decoration inside the anchor (icons, screen-reader labels) is dropped, so
/// link text never appears twice.
pub fn render(el: ElementRef<'_>, opts: &RenderOptions<'_, '_>) -> Rendered {
    let mut out = Rendered::default();
    render_into(el, opts, &mut out);
    out.text = collapse_whitespace(&out.text);
    out
}

fn is_skipped(el: ElementRef<'_>, opts: &RenderOptions<'_, '_>) -> bool {
    opts.skip.iter().any(|skipped| skipped.id() == el.id())
        || opts.strip_tags.iter().any(|tag| tag == el.value().name())
}

fn render_into(el: ElementRef<'_>, opts: &RenderOptions<'_, '_>, out: &mut Rendered) {
    if is_skipped(el, opts) {
        return;
    }

    let name = el.value().name();
    if DROPPED_TAGS.contains(&name) {
        return;
    }
    match name {
        "br" => {
            out.text.push(' ');
            return;
        }
        "a" => {
            render_anchor(el, opts, out);
            return;
        }
        _ => {}
    }

    let block = BLOCK_TAGS.contains(&name);
    if block {
        out.text.push(' ');
    }
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.text.push_str(text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    render_into(child_el, opts, out);
                }
            }
            _ => {} // Comments, doctypes, processing instructions
        }
    }
    if block {
        out.text.push(' ');
    }
}

fn render_anchor(anchor: ElementRef<'_>, opts: &RenderOptions<'_, '_>, out: &mut Rendered) {
    let mut inner = String::new();
    anchor_text(anchor, opts, &mut inner);
    let inner = collapse_whitespace(&inner);

    match anchor.value().attr("href").map(str::trim) {
        Some(href) if !href.is_empty() => {
            let absolute = opts.resolver.resolve(href);
            tracing::trace!("Rendering link '{}' -> {}", inner, absolute);
            out.text.push_str(&format!("<a href=\"{}\">{}</a>", absolute, inner));
            if !inner.is_empty() {
                out.links.push(RenderedLink { text: inner, href: absolute });
            }
        }
        _ => out.text.push_str(&inner),
    }
}

fn anchor_text(el: ElementRef<'_>, opts: &RenderOptions<'_, '_>, buf: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => buf.push_str(text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if is_decoration(child_el) || is_skipped(child_el, opts) {
                        continue;
                    }
                    anchor_text(child_el, opts, buf);
                }
            }
            _ => {}
        }
    }
}

fn is_decoration(el: ElementRef<'_>) -> bool {
    let element = el.value();
    DECORATION_TAGS.contains(&element.name())
        || element.attr("aria-hidden") == Some("true")
        || element.classes().any(|class| class == "sr-only" || class.contains("icon"))
}
