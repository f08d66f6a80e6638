// src/utils/html_debug.rs
use std::fs::File;
use std::io::Write;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::utils::error::StorageError;

/// Whole-token markers worth a reviewer's eye, with their highlight class.
static REVIEW_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"\bQ:").expect("Failed to compile REVIEW_PATTERNS"), "question"),
        (Regex::new(r"\bA:").expect("Failed to compile REVIEW_PATTERNS"), "answer"),
    ]
});

/// Saves a HTML document with highlight spans around the given byte ranges.
/// Overlapping ranges after the first are dropped.
pub fn save_debug_html(html: &str, path: &Path, highlights: &[(usize, usize, &str)]) -> Result<(), StorageError> {
    let mut file = File::create(path)?;

    let mut debug_html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n");
    debug_html.push_str(".highlight-question { background-color: #FFFF00; font-weight: bold; }\n");
    debug_html.push_str(".highlight-answer { background-color: #90EE90; font-weight: bold; }\n");
    debug_html.push_str(".highlight-custom { background-color: #FFC0CB; }\n");
    debug_html.push_str("</style>\n</head>\n<body>\n");

    let mut sorted_highlights = highlights.to_vec();
    sorted_highlights.sort_by_key(|h| h.0);

    let mut last_pos = 0;
    for (start, end, highlight_type) in sorted_highlights {
        if start < last_pos || end > html.len() {
            continue;
        }
        debug_html.push_str(&html[last_pos..start]);

        let css_class = match highlight_type {
            "question" => "highlight-question",
            "answer" => "highlight-answer",
            _ => "highlight-custom",
        };
        debug_html.push_str(&format!(
            "<span class=\"{}\" title=\"Position: {}-{}, Type: {}\">",
            css_class, start, end, highlight_type
        ));
        debug_html.push_str(&html[start..end]);
        debug_html.push_str("</span>");

        last_pos = end;
    }
    debug_html.push_str(&html[last_pos..]);
    debug_html.push_str("\n</body>\n</html>");

    file.write_all(debug_html.as_bytes())?;
    Ok(())
}

/// Writes a review copy of `html` with every `Q:`/`A:` marker highlighted.
/// Returns how many markers were found.
pub fn save_review_html(html: &str, path: &Path) -> Result<usize, StorageError> {
    let highlights: Vec<(usize, usize, &str)> = REVIEW_PATTERNS
        .iter()
        .flat_map(|(re, kind)| re.find_iter(html).map(move |m| (m.start(), m.end(), *kind)))
        .collect();

    save_debug_html(html, path, &highlights)?;
    tracing::info!("Saved review HTML with {} marker(s) to {}", highlights.len(), path.display());
    Ok(highlights.len())
}
