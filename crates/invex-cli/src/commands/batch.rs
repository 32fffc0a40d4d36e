//! Batch command for multiple invoice files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use invex_core::{Coordinator, ExtractionResult, InvoiceRecord};

use super::extract::{format_result, OutputFormat};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching the input PDFs
    #[arg(required = true)]
    input: String,

    /// Output directory for per-file results (default: print to stdout)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write a summary CSV
    #[arg(long)]
    summary: bool,

    /// Keep going when a file cannot be extracted
    #[arg(long)]
    continue_on_error: bool,
}

/// Outcome for one file.
struct FileOutcome {
    record: InvoiceRecord,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!("{} Found {} files to process", style("ℹ").blue(), files.len());

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let coordinator = Coordinator::from_config(&config);
    let mut outcomes = Vec::with_capacity(files.len());

    for (index, path) in files.iter().enumerate() {
        let file_start = Instant::now();
        let result = coordinator.process_invoice(path);
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        let mut record = InvoiceRecord::new(index as u64 + 1, path);
        record.apply(&result);

        write_result(path, &result, args.output_dir.as_deref())?;

        if let Some(message) = result.error() {
            if !args.continue_on_error {
                pb.abandon();
                error!("Failed to process {}: {}", path.display(), message);
                anyhow::bail!("Processing failed for {}: {}", path.display(), message);
            }
            warn!("Failed to process {}: {}", path.display(), message);
        }

        outcomes.push(FileOutcome {
            record,
            error: result.error().map(str::to_string),
            processing_time_ms,
        });
        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &outcomes)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = outcomes.iter().filter(|o| o.error.is_some()).collect();
    eprintln!();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        outcomes.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} successful, {} failed",
        style(outcomes.len() - failed.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{}", style("Failed files:").red());
        for outcome in &failed {
            eprintln!(
                "  - {}: {}",
                outcome.record.file_path.display(),
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// One JSON response per file, in `output_dir` or on stdout.
fn write_result(path: &Path, result: &ExtractionResult, output_dir: Option<&Path>) -> anyhow::Result<()> {
    let content = format_result(result, OutputFormat::Json)?;

    match output_dir {
        Some(dir) => {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("invoice");
            let output_path = dir.join(format!("{}.{}", stem, OutputFormat::Json.extension()));
            fs::write(&output_path, content)?;
            debug!("Wrote output to {}", output_path.display());
        }
        None => println!("{}", content),
    }

    Ok(())
}

fn write_summary(path: &Path, outcomes: &[FileOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "id",
        "filename",
        "status",
        "invoice_number",
        "invoice_date",
        "amount",
        "due_date",
        "confidence_score",
        "processing_time_ms",
        "error",
    ])?;

    for outcome in outcomes {
        let record = &outcome.record;
        let filename = record
            .file_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        let id = record.id.to_string();
        let invoice_date = record.invoice_date.map(|d| d.to_string()).unwrap_or_default();
        let amount = record.amount.map(|a| a.to_string()).unwrap_or_default();
        let due_date = record.due_date.map(|d| d.to_string()).unwrap_or_default();
        let confidence = format!("{:.2}", record.confidence_score);
        let elapsed = outcome.processing_time_ms.to_string();

        wtr.write_record([
            id.as_str(),
            filename,
            record.status(),
            record.invoice_number.as_deref().unwrap_or(""),
            invoice_date.as_str(),
            amount.as_str(),
            due_date.as_str(),
            confidence.as_str(),
            elapsed.as_str(),
            outcome.error.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
