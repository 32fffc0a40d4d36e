//! Core library for invoice field extraction.
//!
//! This crate provides:
//! - PDF text extraction with two independent text-layer parsers
//! - OCR fallback (pdftoppm or embedded page images, Tesseract or ONNX models)
//! - Pattern-based extraction of invoice number, amount, invoice and due dates
//! - A coordinator that chains field strategies and scores the result

pub mod error;
pub mod invoice;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod text;

pub use error::{InvexError, Result};
pub use invoice::{
    CommandModel, Coordinator, FieldStrategy, LanguageModel, ModelStrategy, PartialRecord,
    PatternStrategy, RegexStrategy,
};
pub use models::{
    ExtractionMethod, ExtractionResponse, ExtractionResult, InvexConfig, InvoiceFields,
    InvoiceRecord,
};
pub use ocr::{OcrBackend, OcrPipeline, PageRasterizer};
pub use pdf::{PlausibilityCheck, TextBackend};
pub use text::{ExtractedText, TextExtractor, TextSource};
