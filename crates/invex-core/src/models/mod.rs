//! Data models: configuration, extraction results, and the stored invoice record.

pub mod config;
pub mod record;
pub mod result;

pub use config::{ExtractionConfig, InvexConfig, ModelConfig, OcrConfig, OcrEngineKind, PdfConfig};
pub use record::InvoiceRecord;
pub use result::{ExtractionMethod, ExtractionResponse, ExtractionResult, InvoiceFields};
