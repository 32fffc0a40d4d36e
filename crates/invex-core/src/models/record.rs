//! Stored invoice entity owned by the persistence layer.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::result::{ExtractionMethod, ExtractionResult};

/// An uploaded invoice and the fields of its latest extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub id: u64,

    /// Uploaded PDF; the pipeline only reads it.
    pub file_path: PathBuf,

    pub uploaded_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    /// `None` until the first extraction has run.
    pub extraction_method: Option<ExtractionMethod>,

    pub confidence_score: f64,

    /// Excerpt of the text the fields were read from.
    pub raw_text: String,
}

impl InvoiceRecord {
    /// A freshly uploaded invoice, not yet extracted.
    pub fn new(id: u64, file_path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            file_path: file_path.into(),
            uploaded_at: Utc::now(),
            invoice_date: None,
            invoice_number: None,
            amount: None,
            due_date: None,
            extraction_method: None,
            confidence_score: 0.0,
            raw_text: String::new(),
        }
    }

    /// Overwrite every extraction field; the latest result always wins.
    pub fn apply(&mut self, result: &ExtractionResult) {
        self.invoice_date = result.invoice_date();
        self.invoice_number = result.invoice_number().map(str::to_string);
        self.amount = result.amount();
        self.due_date = result.due_date();
        self.extraction_method = Some(result.extraction_method());
        self.confidence_score = result.confidence_score();
        self.raw_text = result.raw_text_sample().to_string();
    }

    /// Status label as shown by the API (`pending` before any extraction).
    pub fn status(&self) -> &'static str {
        self.extraction_method
            .map(|m| m.as_str())
            .unwrap_or("pending")
    }
}
