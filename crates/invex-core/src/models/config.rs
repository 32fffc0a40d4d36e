//! Configuration structures for the extraction pipeline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::InvexError;

/// Main configuration for the invex pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvexConfig {
    /// Text-layer plausibility configuration.
    pub pdf: PdfConfig,

    /// OCR fallback configuration.
    pub ocr: OcrConfig,

    /// Field extraction policy.
    pub extraction: ExtractionConfig,

    /// Optional local language model.
    pub model: ModelConfig,
}

/// Plausibility rules applied to every text representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Minimum number of characters (after trimming) for text to count.
    pub min_text_chars: usize,

    /// Minimum number of distinct domain keywords the text must contain.
    pub min_keyword_hits: usize,

    /// Domain keywords, matched case-insensitively as substrings.
    pub keywords: Vec<String>,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 10,
            min_keyword_hits: 2,
            keywords: [
                "invoice", "bill", "date", "amount", "total", "due", "number", "customer",
                "account", "payment",
            ]
            .iter()
            .map(|k| k.to_string())
            .collect(),
        }
    }
}

/// Which OCR engine to use when the text layers are not plausible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrEngineKind {
    /// ONNX models if they load, otherwise Tesseract.
    Auto,
    /// Tesseract command line.
    Tesseract,
    /// Pure Rust ONNX engine.
    Onnx,
    /// Never run OCR.
    Disabled,
}

/// OCR fallback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Engine selection.
    pub engine: OcrEngineKind,

    /// DPI for rendering PDF pages to images.
    pub render_dpi: u32,

    /// Tesseract language code.
    pub language: String,

    /// Path or name of the tesseract binary.
    pub tesseract_path: String,

    /// Path or name of the poppler pdftoppm binary.
    pub pdftoppm_path: String,

    /// Directory with `det.onnx`, `latin_rec.onnx` and `latin_dict.txt`.
    pub model_dir: PathBuf,

    /// Maximum image dimension (longer side) passed to the engine.
    pub max_image_size: u32,

    /// Keep `[UNK]` tokens emitted by the ONNX recognizer.
    pub keep_unk: bool,

    /// Maximum pages to OCR (0 = unlimited).
    pub max_pages: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: OcrEngineKind::Auto,
            render_dpi: 300,
            language: "eng".to_string(),
            tesseract_path: "tesseract".to_string(),
            pdftoppm_path: "pdftoppm".to_string(),
            model_dir: PathBuf::from("models"),
            max_image_size: 4096,
            keep_unk: false,
            max_pages: 10,
        }
    }
}

/// Field extraction and acceptance policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Smallest plausible invoice amount.
    pub min_amount: Decimal,

    /// Largest plausible invoice amount.
    pub max_amount: Decimal,

    /// Present fields a strategy must find for its result to be accepted.
    pub min_accepted_fields: usize,

    /// Days added to the invoice date when the due date must be synthesized.
    pub net_days: i64,

    /// Two-digit years mapping past this year fall into the previous century.
    pub two_digit_year_pivot: i32,

    /// Characters after a date label searched for the labeled date.
    pub label_lookahead: usize,

    /// Characters after an amount label searched for the labeled amount.
    pub amount_label_window: usize,

    /// Minimum length of an accepted invoice number.
    pub invoice_number_min_len: usize,

    /// Characters of raw text kept on the result.
    pub raw_text_sample_len: usize,

    /// Guess fields from the file name when every strategy fails.
    pub filename_fallback: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_amount: Decimal::new(1, 2),
            max_amount: Decimal::from(1_000_000),
            min_accepted_fields: 1,
            net_days: 30,
            two_digit_year_pivot: 2025,
            label_lookahead: 40,
            amount_label_window: 100,
            invoice_number_min_len: 3,
            raw_text_sample_len: 1000,
            filename_fallback: true,
        }
    }
}

/// Local language model invoked as a subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Program and arguments; the prompt is written to stdin. Empty disables the model.
    pub command: Vec<String>,

    /// Characters of invoice text included in the prompt.
    pub max_prompt_chars: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            max_prompt_chars: 1500,
        }
    }
}

impl InvexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, InvexError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| InvexError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), InvexError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| InvexError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot honour.
    pub fn validate(&self) -> Result<(), InvexError> {
        let e = &self.extraction;
        if e.min_amount > e.max_amount {
            return Err(InvexError::Config(format!(
                "extraction.min_amount ({}) exceeds extraction.max_amount ({})",
                e.min_amount, e.max_amount
            )));
        }
        if e.min_accepted_fields > 4 {
            return Err(InvexError::Config(
                "extraction.min_accepted_fields must be between 0 and 4".to_string(),
            ));
        }
        if self.ocr.render_dpi == 0 {
            return Err(InvexError::Config("ocr.render_dpi must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: InvexConfig =
            serde_json::from_str(r#"{"extraction": {"max_amount": "2000"}}"#).unwrap();

        assert_eq!(config.extraction.max_amount, Decimal::from(2000));
        assert_eq!(config.extraction.min_accepted_fields, 1);
        assert_eq!(config.ocr.render_dpi, 300);
        assert_eq!(config.pdf.min_keyword_hits, 2);
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let mut config = InvexConfig::default();
        config.extraction.min_amount = Decimal::from(10);
        config.extraction.max_amount = Decimal::from(5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = InvexConfig::default();
        config.ocr.engine = OcrEngineKind::Tesseract;
        config.save(&path).unwrap();

        let loaded = InvexConfig::from_file(&path).unwrap();
        assert_eq!(loaded.ocr.engine, OcrEngineKind::Tesseract);
        assert_eq!(loaded.extraction.net_days, 30);
    }
}
