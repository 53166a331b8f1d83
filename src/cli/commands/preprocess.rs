//! Preprocessing command.

use console::style;

use crate::annotation::{AnnotationEngine, RegexEngine};
use crate::cli::helpers::{progress_bar, truncate};
use crate::cli::icons::{dim_arrow, error, info, success, warn};
use crate::config::Settings;
use crate::pipeline::{PreprocessEvent, PreprocessReport, Preprocessor};

/// Run the preprocessing pipeline with a progress bar.
pub async fn cmd_preprocess(settings: &Settings, batch_size: Option<usize>) -> anyhow::Result<()> {
    let paths = settings.pipeline_paths();
    let engine = RegexEngine::with_stop_words(settings.stop_words());
    let engine_id = engine.engine_id().to_string();
    let mut pipeline = Preprocessor::new(engine, paths.clone())
        .with_batch_size(batch_size.unwrap_or(settings.batch_size))
        .with_reference_columns(settings.reference_columns.clone());

    println!(
        "{} Preprocessing {} (engine: {})",
        info(),
        paths.raw_corpus.display(),
        engine_id
    );

    let pb = progress_bar(0)?;
    let events = pb.clone();
    let report = tokio::task::spawn_blocking(move || {
        pipeline.run_with_progress(|event| match event {
            PreprocessEvent::Loaded {
                speeches,
                unmatched_countries,
            } => {
                events.println(format!(
                    "{} Loaded {} speeches ({} unmatched country values)",
                    dim_arrow(),
                    speeches,
                    unmatched_countries
                ));
            }
            PreprocessEvent::AnnotationStarted { total } => {
                events.set_length(total as u64);
                events.set_message("annotating");
            }
            PreprocessEvent::DocumentAnnotated { document_id } => {
                events.inc(1);
                events.set_message(truncate(&document_id, 19));
            }
            PreprocessEvent::DocumentFailed { document_id, error: e } => {
                events.inc(1);
                events.println(format!(
                    "{} {} {}",
                    error(),
                    truncate(&document_id, 19),
                    e
                ));
            }
            PreprocessEvent::Writing => events.set_message("writing outputs"),
        })
    })
    .await??;
    pb.finish_and_clear();

    print_report(&report);
    println!(
        "  {} Paragraphs: {}",
        dim_arrow(),
        paths.paragraphs.display()
    );
    println!("  {} Manifest: {}", dim_arrow(), paths.manifest.display());

    Ok(())
}

fn print_report(report: &PreprocessReport) {
    println!(
        "{} Wrote {} speeches, {} paragraphs, {} annotations",
        success(),
        report.speeches,
        report.paragraphs,
        report.annotated
    );

    if !report.failed_documents.is_empty() {
        println!(
            "{} {} documents failed to annotate:",
            warn(),
            report.failed_documents.len()
        );
        for id in &report.failed_documents {
            println!("  {} {}", dim_arrow(), id);
        }
    }
    if !report.empty_documents.is_empty() {
        println!(
            "{} {} documents have no paragraphs (speech table only)",
            warn(),
            report.empty_documents.len()
        );
    }
    if !report.unmatched_countries.is_empty() {
        println!(
            "{} Unmatched countries: {}",
            warn(),
            style(report.unmatched_countries.join(", ")).dim()
        );
    }
    for dup in &report.duplicate_document_ids {
        println!(
            "{} Document id {} occurs {} times",
            warn(),
            truncate(&dup.id, 19),
            dup.count
        );
    }
    if !report.duplicate_paragraph_ids.is_empty() {
        println!(
            "{} Paragraph ids aren't unique ({} collisions)",
            warn(),
            report.duplicate_paragraph_ids.len()
        );
    }
}
