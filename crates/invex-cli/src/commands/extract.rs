//! Extract command - read invoice fields from a single file.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use invex_core::{Coordinator, ExtractionResult};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input PDF
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Use the contents of this text file instead of reading the PDF
    #[arg(long, value_name = "TXT")]
    text: Option<PathBuf>,

    /// Show extraction method and confidence
    #[arg(long)]
    show_confidence: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON response
    Json,
    /// CSV with a header row
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;
    let coordinator = Coordinator::from_config(&config);

    let result = match &args.text {
        Some(text_path) => {
            let text = fs::read_to_string(text_path)?;
            info!(
                "Using {} characters from {}",
                text.chars().count(),
                text_path.display()
            );
            coordinator.process_text(&text, &args.input)
        }
        None => {
            if !args.input.exists() {
                anyhow::bail!("Input file not found: {}", args.input.display());
            }

            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
            pb.set_message(format!("Extracting {}", args.input.display()));
            let result = coordinator.process_invoice(&args.input);
            pb.finish_and_clear();
            result
        }
    };

    let output = format_result(&result, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        println!();
        println!(
            "{} Method: {}",
            style("ℹ").blue(),
            result.extraction_method()
        );
        println!(
            "{} Confidence: {:.1}%",
            style("ℹ").blue(),
            result.confidence_score() * 100.0
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    if let Some(error) = result.error() {
        anyhow::bail!("Extraction failed: {}", error);
    }

    Ok(())
}

pub fn format_result(result: &ExtractionResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&result.to_response())?),
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Text => Ok(format_text(result)),
    }
}

fn format_csv(result: &ExtractionResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "invoice_number",
        "invoice_date",
        "amount",
        "due_date",
        "extraction_method",
        "confidence_score",
        "error",
    ])?;

    let invoice_date = result.invoice_date().map(|d| d.to_string()).unwrap_or_default();
    let amount = result.amount().map(|a| a.to_string()).unwrap_or_default();
    let due_date = result.due_date().map(|d| d.to_string()).unwrap_or_default();
    let confidence = format!("{:.2}", result.confidence_score());

    wtr.write_record([
        result.invoice_number().unwrap_or_default(),
        invoice_date.as_str(),
        amount.as_str(),
        due_date.as_str(),
        result.extraction_method().as_str(),
        confidence.as_str(),
        result.error().unwrap_or_default(),
    ])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(result: &ExtractionResult) -> String {
    if let Some(error) = result.error() {
        return format!("Error: {}\n", error);
    }

    let missing = || "-".to_string();
    let mut output = String::new();
    output.push_str(&format!(
        "Invoice number: {}\n",
        result.invoice_number().map(str::to_string).unwrap_or_else(missing)
    ));
    output.push_str(&format!(
        "Invoice date:   {}\n",
        result.invoice_date().map(|d| d.to_string()).unwrap_or_else(missing)
    ));
    output.push_str(&format!(
        "Amount:         {}\n",
        result.amount().map(|a| a.to_string()).unwrap_or_else(missing)
    ));
    output.push_str(&format!(
        "Due date:       {}\n",
        result.due_date().map(|d| d.to_string()).unwrap_or_else(missing)
    ));
    output
}
