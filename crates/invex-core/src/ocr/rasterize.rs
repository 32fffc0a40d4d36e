//! Turning PDF pages into images for OCR.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, trace};

use super::PageRasterizer;
use crate::error::OcrError;
use crate::pdf::{extract_page_images, load_document};

/// Renders pages with poppler's `pdftoppm` as grayscale PNGs.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    program: String,
}

impl PdftoppmRasterizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The rasterizer, if `<program> -v` can be spawned.
    pub fn detect(program: &str) -> Option<Self> {
        // pdftoppm prints its version to stderr; some builds exit non-zero.
        match Command::new(program).arg("-v").output() {
            Ok(_) => Some(Self::new(program)),
            Err(e) => {
                trace!("pdftoppm not runnable at '{}': {}", program, e);
                None
            }
        }
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn name(&self) -> &'static str {
        "pdftoppm"
    }

    fn rasterize(&self, data: &[u8], dpi: u32) -> crate::Result<Vec<DynamicImage>> {
        let temp_dir = tempfile::tempdir()?;
        let input = temp_dir.path().join("input.pdf");
        std::fs::write(&input, data)?;
        let prefix = temp_dir.path().join("page");

        let output = Command::new(&self.program)
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-gray")
            .arg("-png")
            .arg(&input)
            .arg(&prefix)
            .output()
            .map_err(|e| OcrError::Rasterize(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(OcrError::Rasterize(format!(
                "pdftoppm exited with {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            ))
            .into());
        }

        let mut pages = Vec::new();
        for path in page_files(temp_dir.path())? {
            pages.push(image::open(&path)?);
        }

        debug!("pdftoppm rendered {} pages at {} DPI", pages.len(), dpi);
        Ok(pages)
    }
}

/// `page-1.png`, `page-2.png`, ... sorted by page number.
///
/// pdftoppm zero-pads to the width of the page count, so sort numerically.
fn page_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut numbered: Vec<(u32, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?;
            let number = stem.strip_prefix("page-")?.parse().ok()?;
            (path.extension()? == "png").then_some((number, path))
        })
        .collect();
    numbered.sort_by_key(|(number, _)| *number);
    Ok(numbered.into_iter().map(|(_, path)| path).collect())
}

/// Uses the largest image embedded in each page as that page's raster.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedImageRasterizer;

impl EmbeddedImageRasterizer {
    pub fn new() -> Self {
        Self
    }
}

impl PageRasterizer for EmbeddedImageRasterizer {
    fn name(&self) -> &'static str {
        "embedded_images"
    }

    fn rasterize(&self, data: &[u8], _dpi: u32) -> crate::Result<Vec<DynamicImage>> {
        let doc = load_document(data)?;

        let pages: Vec<DynamicImage> = extract_page_images(&doc)
            .into_iter()
            .filter_map(|(_, images)| {
                images.into_iter().max_by_key(|img| {
                    let (w, h) = img.dimensions();
                    u64::from(w) * u64::from(h)
                })
            })
            .collect();

        if pages.is_empty() {
            return Err(OcrError::Rasterize("no page images embedded in PDF".to_string()).into());
        }

        debug!("Using {} embedded page images", pages.len());
        Ok(pages)
    }
}
