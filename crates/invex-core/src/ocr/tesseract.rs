//! Tesseract OCR through its command-line interface.

use std::process::Command;

use image::GrayImage;
use tracing::{debug, trace};

use super::OcrBackend;
use crate::error::OcrError;

/// Runs `tesseract <image> stdout -l <language>` on each page.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    program: String,
    language: String,
}

impl TesseractEngine {
    pub fn new(program: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            language: language.into(),
        }
    }

    /// The engine, if `<program> --version` runs successfully.
    pub fn detect(program: &str, language: &str) -> Option<Self> {
        let available = Command::new(program)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);

        if available {
            debug!("Found tesseract at '{}'", program);
            Some(Self::new(program, language))
        } else {
            debug!("tesseract not runnable at '{}'", program);
            None
        }
    }
}

impl OcrBackend for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
        let temp_dir = tempfile::tempdir()
            .map_err(|e| OcrError::Preprocessing(format!("failed to create temp dir: {}", e)))?;
        let input = temp_dir.path().join("page.png");

        image
            .save(&input)
            .map_err(|e| OcrError::Preprocessing(format!("failed to write page image: {}", e)))?;

        let output = Command::new(&self.program)
            .arg(&input)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| OcrError::Unavailable(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(OcrError::Recognition(format!(
                "tesseract exited with {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        trace!("tesseract read {} characters", text.len());
        Ok(text)
    }
}
