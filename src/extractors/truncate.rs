// src/extractors/truncate.rs

/// Cuts answers at the first of a source's known boilerplate phrases
/// (author bios, study recruitment, calls to action).
#[derive(Debug, Clone, Default)]
pub struct TruncationFilter {
    phrases: Vec<String>,
}

impl TruncationFilter {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let phrases = phrases
            .into_iter()
            .map(Into::into)
            .filter(|p: &String| !p.is_empty())
            .collect();
        Self { phrases }
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Prefix of `text` before the earliest occurrence of any phrase, or the
    /// whole text when none occurs.
    pub fn apply(&self, text: &str) -> String {
        let cut = self
            .phrases
            .iter()
            .filter_map(|phrase| text.find(phrase.as_str()))
            .min();

        match cut {
            Some(idx) => {
                tracing::debug!("Truncating answer at byte {} of {}", idx, text.len());
                text[..idx].to_string()
            }
            None => text.to_string(),
        }
    }
}
