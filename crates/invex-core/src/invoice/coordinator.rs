//! Orchestrates text extraction and the field strategy fallback chain.

use std::path::Path;

use tracing::{debug, info, warn};

use super::filename::FilenameGuesser;
use super::model::{CommandModel, ModelStrategy};
use super::strategy::{PatternStrategy, RegexStrategy};
use super::FieldStrategy;
use crate::models::config::InvexConfig;
use crate::models::result::{ExtractionMethod, ExtractionResult};
use crate::text::TextExtractor;

/// Confidence ceiling for fields guessed from a file name.
const FILENAME_CONFIDENCE_CAP: f64 = 0.6;

const FILENAME_SAMPLE: &str = "Extracted from filename patterns";

/// Runs text extraction, then each available strategy until one finds enough fields.
pub struct Coordinator {
    text: TextExtractor,
    strategies: Vec<Box<dyn FieldStrategy>>,
    filename: Option<FilenameGuesser>,
    min_accepted_fields: usize,
    sample_len: usize,
}

impl Coordinator {
    /// The default chain: model (when configured), patterns, simple regexes.
    pub fn from_config(config: &InvexConfig) -> Self {
        let model = CommandModel::from_config(&config.model);
        let strategies: Vec<Box<dyn FieldStrategy>> = vec![
            Box::new(ModelStrategy::from_config(model, &config.model, &config.extraction)),
            Box::new(PatternStrategy::from_config(&config.extraction)),
            Box::new(RegexStrategy::from_config(&config.extraction)),
        ];

        Self {
            text: TextExtractor::from_config(config),
            strategies,
            filename: config
                .extraction
                .filename_fallback
                .then(|| FilenameGuesser::from_config(&config.extraction)),
            min_accepted_fields: config.extraction.min_accepted_fields,
            sample_len: config.extraction.raw_text_sample_len,
        }
    }

    pub fn with_text_extractor(mut self, text: TextExtractor) -> Self {
        self.text = text;
        self
    }

    /// Replace the strategy chain.
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn FieldStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_min_accepted_fields(mut self, min: usize) -> Self {
        self.min_accepted_fields = min;
        self
    }

    pub fn with_filename_fallback(mut self, enabled: bool) -> Self {
        self.filename = enabled.then(FilenameGuesser::new);
        self
    }

    /// Extract fields from the PDF at `path`. Never fails; problems become a failed result.
    pub fn process_invoice(&self, path: &Path) -> ExtractionResult {
        info!("Starting extraction for {}", path.display());

        let extracted = match self.text.extract_text(path) {
            Ok(Some(extracted)) => extracted,
            Ok(None) => {
                warn!("No text extracted from {}", path.display());
                return ExtractionResult::failed("No text extracted");
            }
            Err(e) => {
                warn!("Cannot read {}: {}", path.display(), e);
                return ExtractionResult::failed(e.to_string());
            }
        };

        info!(
            "Extracted {} characters via {}",
            extracted.text.chars().count(),
            extracted.source
        );
        self.process_text(&extracted.text, path)
    }

    /// Run the strategy chain and the filename fallback over text already extracted.
    pub fn process_text(&self, text: &str, path: &Path) -> ExtractionResult {
        for strategy in &self.strategies {
            let method = strategy.method();
            if !strategy.is_available() {
                debug!("Skipping {}: unavailable", method);
                continue;
            }

            let record = strategy.attempt(text);
            let found = record.present_count();
            if found >= self.min_accepted_fields {
                info!(fields = found, "Accepted {} result", method);
                let sample: String = text.chars().take(self.sample_len).collect();
                return ExtractionResult::extracted(
                    record.fields.clone(),
                    method,
                    record.confidence(),
                    sample,
                );
            }
            debug!(
                fields = found,
                required = self.min_accepted_fields,
                "{} result rejected",
                method
            );
        }

        if let Some(guesser) = &self.filename {
            let record = guesser.guess(path);
            let found = record.present_count();
            if found > 0 && found >= self.min_accepted_fields {
                info!(fields = found, "Using filename fallback");
                return ExtractionResult::extracted(
                    record.fields.clone(),
                    ExtractionMethod::FilenameFallback,
                    record.confidence().min(FILENAME_CONFIDENCE_CAP),
                    FILENAME_SAMPLE,
                );
            }
        }

        warn!("All extraction methods failed for {}", path.display());
        ExtractionResult::failed("All extraction methods failed")
    }
}
