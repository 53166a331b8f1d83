//! Corpus inspection and maintenance commands.

use std::collections::BTreeSet;
use std::path::Path;

use console::style;

use crate::cli::helpers::{load_corpus, preview, progress_bar, truncate};
use crate::cli::icons::{dim_arrow, error, info, success, warn};
use crate::config::Settings;

/// Print corpus statistics.
pub async fn cmd_stats(settings: &Settings) -> anyhow::Result<()> {
    let corpus = load_corpus(settings)?;

    let years: Vec<i32> = corpus.speeches().iter().filter_map(|s| s.year()).collect();
    let countries: BTreeSet<&str> = corpus
        .speeches()
        .iter()
        .filter_map(|s| s.country_code())
        .collect();
    let unresolved = corpus
        .speeches()
        .iter()
        .filter(|s| s.country_code().is_none())
        .count();

    println!("\n{}", style("Corpus Statistics").bold());
    println!("{}", "-".repeat(40));
    println!("{:<20} {}", "Speeches:", corpus.speeches().len());
    println!("{:<20} {}", "Paragraphs:", corpus.paragraph_count());
    if let (Some(min), Some(max)) = (years.iter().min(), years.iter().max()) {
        println!("{:<20} {}-{}", "Years:", min, max);
    }
    println!("{:<20} {}", "Countries:", countries.len());
    if unresolved > 0 {
        println!("{:<20} {}", "Unresolved country:", unresolved);
    }

    match corpus.engine() {
        Some(engine) => println!(
            "{:<20} {} ({} lexemes)",
            "Annotations:",
            engine,
            corpus.vocab().len()
        ),
        None => println!("{:<20} {}", "Annotations:", style("not available").yellow()),
    }
    if !corpus.orphaned_annotations().is_empty() {
        println!(
            "{:<20} {}",
            "Orphaned:",
            corpus.orphaned_annotations().len()
        );
    }

    Ok(())
}

/// Print one speech and its paragraphs.
pub async fn cmd_show(
    settings: &Settings,
    document_id: &str,
    annotations: bool,
) -> anyhow::Result<()> {
    let corpus = load_corpus(settings)?;
    let Some(speech) = corpus.speech(document_id) else {
        anyhow::bail!("Speech not found: {}", document_id);
    };

    println!("\n{}", style(speech.id()).bold());
    println!(
        "  {} Session {}, {}",
        dim_arrow(),
        speech.session().unwrap_or_default(),
        speech.year().unwrap_or_default()
    );
    println!(
        "  {} {} ({})",
        dim_arrow(),
        speech.country().unwrap_or("unknown country"),
        speech.country_code().unwrap_or("-")
    );
    println!();

    for paragraph in speech.paragraphs() {
        println!(
            "  {:>3}  {}",
            style(paragraph.index()).dim(),
            preview(paragraph.text(), 72)
        );
    }

    if annotations {
        let doc = corpus.annotation(speech)?;
        println!(
            "\n{} {} tokens, {} paragraph spans",
            info(),
            doc.tokens().len(),
            doc.paragraphs().len()
        );
        for paragraph in speech.paragraphs() {
            match corpus.paragraph_annotation(paragraph) {
                Ok(annotation) => println!(
                    "  {:>3}  {} tokens, {} distinct words",
                    style(paragraph.index()).dim(),
                    annotation.token_count(),
                    annotation.bag_of_words().len()
                ),
                Err(e) => println!(
                    "  {:>3}  {} {}",
                    style(paragraph.index()).dim(),
                    error(),
                    e
                ),
            }
        }
    }

    Ok(())
}

/// Decode every speech's annotation.
pub async fn cmd_preload(settings: &Settings) -> anyhow::Result<()> {
    let corpus = load_corpus(settings)?;
    if !corpus.has_annotations() {
        anyhow::bail!(
            "No annotation blob at {}",
            settings.annotations_path().display()
        );
    }

    let pb = progress_bar(corpus.speeches().len() as u64)?;
    let loaded = corpus.preload_annotations_with_progress(|speech| {
        pb.inc(1);
        pb.set_message(truncate(speech.id(), 19));
    });
    pb.finish_and_clear();

    let loaded = loaded?;
    println!("{} Loaded {} annotations", success(), loaded);
    Ok(())
}

/// Append a column from a file with one value per line.
pub async fn cmd_append_column(
    settings: &Settings,
    name: &str,
    values_file: &Path,
) -> anyhow::Result<()> {
    let contents = tokio::fs::read_to_string(values_file)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", values_file.display(), e))?;
    let values: Vec<String> = contents.lines().map(str::to_string).collect();

    let mut corpus = load_corpus(settings)?;
    let existed = corpus.table().column_index(name).is_some();
    corpus.append_column(name, values)?;

    println!(
        "{} {} column '{}' ({} rows)",
        success(),
        if existed { "Replaced" } else { "Appended" },
        name,
        corpus.paragraph_count()
    );
    println!("  {} {}", dim_arrow(), corpus.path().display());
    Ok(())
}

/// Validate the corpus; fails if any violation is found.
pub async fn cmd_check(settings: &Settings) -> anyhow::Result<()> {
    let corpus = load_corpus(settings)?;
    let report = corpus.validate();

    println!(
        "{} Checked {} speeches, {} paragraphs",
        info(),
        report.speeches,
        report.paragraphs
    );
    if report.speeches_without_annotation > 0 {
        println!(
            "{} {} speeches have no annotation",
            warn(),
            report.speeches_without_annotation
        );
    }

    for gap in &report.index_gaps {
        println!(
            "{} Paragraph indices of {} are not contiguous: {:?}",
            error(),
            truncate(&gap.document_id, 19),
            gap.indices
        );
    }
    for id in &report.split_documents {
        println!("{} Rows of {} are not contiguous", error(), truncate(id, 19));
    }
    for (id, count) in &report.duplicate_paragraph_ids {
        println!(
            "{} Paragraph id {} occurs {} times",
            error(),
            truncate(id, 19),
            count
        );
    }
    for id in &report.orphaned_annotations {
        println!(
            "{} Annotation {} matches no speech",
            error(),
            truncate(id, 19)
        );
    }

    if report.is_clean() {
        println!("{} No problems found", success());
        Ok(())
    } else {
        anyhow::bail!("Corpus check failed");
    }
}
