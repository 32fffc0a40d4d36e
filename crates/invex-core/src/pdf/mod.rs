//! PDF processing module.

mod backends;
mod images;
mod plausibility;

pub use backends::{load_document, PageTextBackend, StreamTextBackend};
pub use images::extract_page_images;
pub use plausibility::PlausibilityCheck;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// A parser that turns PDF bytes into raw text.
pub trait TextBackend {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Extract the text layer of the whole document.
    fn extract(&self, data: &[u8]) -> Result<String>;
}
