//! Rule-based field extractors for invoice text.

pub mod amounts;
pub mod confidence;
pub mod dates;
pub mod numbers;
pub mod patterns;

pub use amounts::{extract_amount, parse_amount, AmountExtractor};
pub use confidence::{score, MAX_CONFIDENCE, MIN_CONFIDENCE};
pub use dates::{extract_dates, parse_date, DateExtractor, DateFormat, DateParser, InvoiceDates};
pub use numbers::{extract_invoice_number, InvoiceNumber, NumberExtractor};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// Extraction context with confidence scores.
#[derive(Debug, Clone)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Position in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}

/// Collapse every whitespace run to a single space.
pub fn normalize_text(text: &str) -> String {
    patterns::WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Invoice\n\n #12\t\tTotal  "), "Invoice #12 Total");
    }
}
