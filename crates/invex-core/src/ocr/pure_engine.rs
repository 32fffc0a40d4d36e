//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GrayImage};
use tracing::{debug, info};

use super::OcrBackend;
use crate::error::OcrError;

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
pub struct PureOcrEngine {
    engine: pure_onnx_ocr::engine::OcrEngine,
    keep_unk: bool,
}

/// A recognized region reduced to what reading order needs.
struct Region {
    x: f32,
    y: f32,
    text: String,
}

impl PureOcrEngine {
    /// Create an engine from `det.onnx`, `latin_rec.onnx` and `latin_dict.txt` in a directory.
    pub fn from_dir(model_dir: &Path, keep_unk: bool) -> Result<Self, OcrError> {
        let det_path = model_dir.join("det.onnx");
        let rec_path = model_dir.join("latin_rec.onnx");
        let dict_path = model_dir.join("latin_dict.txt");

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "model file not found: {}",
                    path.display()
                )));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self { engine, keep_unk })
    }
}

impl OcrBackend for PureOcrEngine {
    fn name(&self) -> &'static str {
        "pure_onnx_ocr"
    }

    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
        let start = Instant::now();
        let rgb = DynamicImage::ImageRgb8(DynamicImage::ImageLuma8(image.clone()).to_rgb8());

        let results = self
            .engine
            .run_from_image(&rgb)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        debug!("pure-onnx-ocr returned {} text regions", results.len());

        let mut regions: Vec<Region> = results
            .iter()
            .map(|r| {
                let (x, y) = top_left(&r.bounding_box);
                let text = if self.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                Region { x, y, text }
            })
            .collect();

        sort_reading_order(&mut regions);

        let text = regions
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        info!(
            "OCR complete: {} regions in {}ms",
            regions.len(),
            start.elapsed().as_millis()
        );

        Ok(text)
    }
}

/// Rows of 20px, left to right within a row.
fn sort_reading_order(regions: &mut [Region]) {
    regions.sort_by(|a, b| {
        let row_a = (a.y / 20.0) as i32;
        let row_b = (b.y / 20.0) as i32;
        if row_a != row_b {
            row_a.cmp(&row_b)
        } else {
            a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal)
        }
    });
}

/// Minimum x and y over the first four polygon points.
fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f32, f32) {
    polygon
        .exterior()
        .coords()
        .take(4)
        .fold((f32::INFINITY, f32::INFINITY), |(x, y), c| {
            (x.min(c.x as f32), y.min(c.y as f32))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: f32, y: f32, text: &str) -> Region {
        Region {
            x,
            y,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_reading_order() {
        let mut regions = vec![
            region(300.0, 105.0, "Total"),
            region(10.0, 12.0, "Invoice"),
            region(10.0, 101.0, "Amount"),
            region(200.0, 5.0, "#1001"),
        ];
        sort_reading_order(&mut regions);

        let texts: Vec<&str> = regions.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["Invoice", "#1001", "Amount", "Total"]);
    }

    #[test]
    fn test_missing_models_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let err = PureOcrEngine::from_dir(dir.path(), false).err().unwrap();
        assert!(matches!(err, OcrError::ModelLoad(_)));
    }
}
