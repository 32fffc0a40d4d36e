//! Extraction result returned to the caller, and its wire form.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which stage of the fallback chain produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Local language model, checked against the pattern extractor.
    ModelAssisted,
    /// Context-aware pattern extraction (the primary strategy).
    IntelligentPatterns,
    /// Simple first-match regular expressions.
    RegexFallback,
    /// Fields guessed from the file name.
    FilenameFallback,
    /// Nothing usable was extracted.
    Failed,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModelAssisted => "model_assisted",
            Self::IntelligentPatterns => "intelligent_patterns",
            Self::RegexFallback => "regex_fallback",
            Self::FilenameFallback => "filename_fallback",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four invoice fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceFields {
    pub invoice_date: Option<NaiveDate>,
    pub invoice_number: Option<String>,
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
}

impl InvoiceFields {
    /// Number of fields that hold a value.
    pub fn present_count(&self) -> usize {
        [
            self.invoice_date.is_some(),
            self.invoice_number.as_deref().is_some_and(|n| !n.is_empty()),
            self.amount.is_some(),
            self.due_date.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.present_count() == 0
    }
}

/// Outcome of one extraction call.
///
/// Built once by the coordinator and never changed afterwards; callers read
/// it through accessors and persist what they need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    fields: InvoiceFields,
    extraction_method: ExtractionMethod,
    confidence_score: f64,
    raw_text_sample: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ExtractionResult {
    /// A result produced by one of the strategies.
    pub fn extracted(
        fields: InvoiceFields,
        method: ExtractionMethod,
        confidence_score: f64,
        raw_text_sample: impl Into<String>,
    ) -> Self {
        Self {
            fields,
            extraction_method: method,
            confidence_score: confidence_score.clamp(0.0, 1.0),
            raw_text_sample: raw_text_sample.into(),
            error: None,
        }
    }

    /// The terminal result: nothing extracted, zero confidence, message attached.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            fields: InvoiceFields::default(),
            extraction_method: ExtractionMethod::Failed,
            confidence_score: 0.0,
            raw_text_sample: String::new(),
            error: Some(message.into()),
        }
    }

    pub fn fields(&self) -> &InvoiceFields {
        &self.fields
    }

    pub fn invoice_number(&self) -> Option<&str> {
        self.fields.invoice_number.as_deref()
    }

    pub fn amount(&self) -> Option<Decimal> {
        self.fields.amount
    }

    pub fn invoice_date(&self) -> Option<NaiveDate> {
        self.fields.invoice_date
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.fields.due_date
    }

    pub fn extraction_method(&self) -> ExtractionMethod {
        self.extraction_method
    }

    pub fn confidence_score(&self) -> f64 {
        self.confidence_score
    }

    pub fn raw_text_sample(&self) -> &str {
        &self.raw_text_sample
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_failed(&self) -> bool {
        self.extraction_method == ExtractionMethod::Failed
    }

    /// Wire form reported to the requester.
    pub fn to_response(&self) -> ExtractionResponse {
        match (&self.error, self.extraction_method) {
            (Some(message), ExtractionMethod::Failed) => ExtractionResponse::Error {
                error: message.clone(),
            },
            _ => ExtractionResponse::Extracted {
                extraction_method: self.extraction_method,
                confidence_score: self.confidence_score,
                extracted_data: self.fields.clone(),
            },
        }
    }
}

/// JSON body returned by the extract action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractionResponse {
    Extracted {
        extraction_method: ExtractionMethod,
        confidence_score: f64,
        extracted_data: InvoiceFields,
    },
    Error {
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::str::FromStr;

    fn sample_fields() -> InvoiceFields {
        InvoiceFields {
            invoice_date: NaiveDate::from_ymd_opt(2015, 12, 12),
            invoice_number: Some("1164006105".to_string()),
            amount: Some(Decimal::from_str("108.82").unwrap()),
            due_date: NaiveDate::from_ymd_opt(2016, 1, 12),
        }
    }

    #[test]
    fn test_response_shape() {
        let result = ExtractionResult::extracted(
            sample_fields(),
            ExtractionMethod::IntelligentPatterns,
            0.98,
            "Invoice #1164006105",
        );

        let value = serde_json::to_value(result.to_response()).unwrap();
        assert_eq!(
            value,
            json!({
                "extraction_method": "intelligent_patterns",
                "confidence_score": 0.98,
                "extracted_data": {
                    "invoice_date": "2015-12-12",
                    "invoice_number": "1164006105",
                    "amount": "108.82",
                    "due_date": "2016-01-12"
                }
            })
        );
    }

    #[test]
    fn test_failed_response_is_error_only() {
        let result = ExtractionResult::failed("No text extracted");

        assert!(result.is_failed());
        assert_eq!(result.confidence_score(), 0.0);
        assert!(result.fields().is_empty());
        assert_eq!(
            serde_json::to_value(result.to_response()).unwrap(),
            json!({ "error": "No text extracted" })
        );
    }

    #[test]
    fn test_present_count_ignores_empty_number() {
        let fields = InvoiceFields {
            invoice_number: Some(String::new()),
            amount: Some(Decimal::ONE),
            ..Default::default()
        };
        assert_eq!(fields.present_count(), 1);
    }
}
