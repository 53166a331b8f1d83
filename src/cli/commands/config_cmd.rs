//! Configuration management commands.

use console::style;

use crate::cli::icons::dim_arrow;
use crate::config::{Config, Settings};

/// Print the resolved settings.
pub async fn cmd_config_show(settings: &Settings, config: &Config) -> anyhow::Result<()> {
    let paths = settings.pipeline_paths();

    println!("\n{}", style("Configuration").bold());
    println!("{}", "-".repeat(40));
    match config.source_path {
        Some(ref path) => println!("{:<18} {}", "Config file:", path.display()),
        None => println!("{:<18} {}", "Config file:", style("none (defaults)").dim()),
    }
    println!("{:<18} {}", "Data dir:", settings.data_dir.display());
    println!("{:<18} {}", "Batch size:", settings.batch_size);
    println!(
        "{:<18} {} / {}",
        "Reference cols:", settings.reference_columns.name, settings.reference_columns.code
    );
    match settings.stop_words {
        Some(ref words) => println!("{:<18} {} custom", "Stop words:", words.len()),
        None => println!("{:<18} built-in", "Stop words:"),
    }

    println!("\n{}", style("Inputs").bold());
    println!("  {} {}", dim_arrow(), paths.raw_corpus.display());
    println!("  {} {}", dim_arrow(), paths.reference_table.display());

    println!("\n{}", style("Outputs").bold());
    for path in [
        &paths.speeches,
        &paths.paragraphs,
        &paths.annotations,
        &paths.manifest,
    ] {
        println!("  {} {}", dim_arrow(), path.display());
    }

    Ok(())
}
