//! Shared helper functions for CLI commands.

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Settings;
use crate::corpus::Corpus;

/// Truncate to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// First line of a paragraph, truncated for listings.
pub fn preview(text: &str, max: usize) -> String {
    truncate(text.lines().next().unwrap_or_default(), max)
}

/// Progress bar in the standard style.
pub fn progress_bar(len: u64) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")?
            .progress_chars("█▓░"),
    );
    Ok(pb)
}

/// Load the processed corpus named by the settings.
pub fn load_corpus(settings: &Settings) -> anyhow::Result<Corpus> {
    let table = settings.paragraphs_path();
    Corpus::load_with_annotations(&table, &settings.annotations_path()).with_context(|| {
        format!(
            "Failed to load corpus from {} (run 'debates preprocess' first?)",
            table.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer sentence", 10), "a longe...");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_preview_uses_first_line() {
        assert_eq!(preview("First line\nsecond", 40), "First line");
        assert_eq!(preview("", 40), "");
    }
}
