// src/storage/stats.rs
//! Question/answer counts per record file, rendered as a markdown table.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::utils::error::StorageError;

pub const STATS_FILE: &str = "scraped_stats.md";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStats {
    pub source: String,
    pub questions: usize,
    pub answers: usize,
}

/// Counts records with a non-empty `questionText` / `answerText` in every
/// `*.jsonl` file directly under `dir`. Sorted by source name.
pub fn compute_stats(dir: &Path) -> Result<Vec<SourceStats>, StorageError> {
    let mut stats = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
            continue;
        }
        let source = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        let (mut questions, mut answers) = (0, 0);
        for (line_no, line) in BufReader::new(fs::File::open(&path)?).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: Value = serde_json::from_str(&line).map_err(|e| {
                StorageError::SerializationError(format!("{}:{}: {}", path.display(), line_no + 1, e))
            })?;
            if non_empty(&record, "questionText") {
                questions += 1;
            }
            if non_empty(&record, "answerText") {
                answers += 1;
            }
        }

        tracing::debug!("{}: {} question(s), {} answer(s)", source, questions, answers);
        stats.push(SourceStats { source, questions, answers });
    }

    stats.sort_by(|a, b| a.source.cmp(&b.source));
    Ok(stats)
}

fn non_empty(record: &Value, field: &str) -> bool {
    record
        .get(field)
        .and_then(Value::as_str)
        .map_or(false, |text| !text.is_empty())
}

/// Markdown table with a bold total row right under the header.
pub fn render_markdown(stats: &[SourceStats]) -> String {
    let total_q: usize = stats.iter().map(|s| s.questions).sum();
    let total_a: usize = stats.iter().map(|s| s.answers).sum();

    let mut table = String::from("| source | questions | answers |\n|:--|--:|--:|\n");
    table.push_str(&format!("| **total** | **{}** | **{}** |\n", total_q, total_a));
    for s in stats {
        table.push_str(&format!("| {} | {} | {} |\n", s.source, s.questions, s.answers));
    }
    table
}

/// Recomputes the stats for `dir` and writes them to `dir/scraped_stats.md`.
pub fn save_stats(dir: &Path) -> Result<PathBuf, StorageError> {
    let stats = compute_stats(dir)?;
    let path = dir.join(STATS_FILE);
    fs::write(&path, render_markdown(&stats))?;
    tracing::info!("Saved stats for {} source(s) to {}", stats.len(), path.display());
    Ok(path)
}
