//! Text command - show the text the field extractors would see.

use std::path::PathBuf;

use clap::Args;
use console::style;

use invex_core::TextExtractor;

/// Arguments for the text command.
#[derive(Args)]
pub struct TextArgs {
    /// Input PDF
    #[arg(required = true)]
    input: PathBuf,
}

pub async fn run(args: TextArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let extractor = TextExtractor::from_config(&config);

    match extractor.extract_text(&args.input)? {
        Some(extracted) => {
            eprintln!(
                "{} {} characters via {}",
                style("ℹ").blue(),
                extracted.text.chars().count(),
                extracted.source
            );
            println!("{}", extracted.text);
            Ok(())
        }
        None => anyhow::bail!("No text extracted from {}", args.input.display()),
    }
}
