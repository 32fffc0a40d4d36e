//! Invoice field extraction module.
//!
//! Field strategies turn raw text into a [`PartialRecord`]; the
//! [`Coordinator`] runs them in order and builds the final result.

mod coordinator;
mod filename;
mod model;
pub mod rules;
mod strategy;

pub use coordinator::Coordinator;
pub use filename::FilenameGuesser;
pub use model::{clean_model_json, CommandModel, LanguageModel, ModelStrategy};
pub use strategy::{PatternStrategy, RegexStrategy};

use crate::models::result::{ExtractionMethod, InvoiceFields};

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, crate::error::ExtractionError>;

/// Output of one field strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialRecord {
    pub fields: InvoiceFields,
    /// The invoice number came from a labeled pattern or was corroborated.
    pub invoice_number_validated: bool,
}

impl PartialRecord {
    pub fn present_count(&self) -> usize {
        self.fields.present_count()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Heuristic confidence for this record.
    pub fn confidence(&self) -> f64 {
        rules::score(&self.fields, self.invoice_number_validated)
    }
}

/// One interchangeable field extractor in the coordinator's fallback chain.
pub trait FieldStrategy {
    /// Tag recorded on results this strategy produces.
    fn method(&self) -> ExtractionMethod;

    /// Whether the strategy's capabilities were detected.
    fn is_available(&self) -> bool {
        true
    }

    /// Best-effort extraction; never fails, absent fields stay `None`.
    fn attempt(&self, text: &str) -> PartialRecord;
}
