//! Rendering bounding boxes onto source images.
//!
//! Boxes arrive as normalized fractions of image width/height and are drawn
//! as hollow rectangles in a deterministic per-label color, lowest
//! confidence first so the highest-confidence boxes stay visually on top at
//! overlaps. The batch path fetches each source image from the input store,
//! draws the annotations extracted from that row's raw response, and uploads
//! the result as PNG under the same path.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tokio::sync::Semaphore;

use crate::error::{AnnotateError, Result, SightlineError};
use crate::format::{safe_json_loads, ResponseFormatter};
use crate::store::ObjectStore;
use crate::types::{BoundingBox, ErrorHandling, Row, IMAGE_PATH_COLUMN};

const BORDER_THICKNESS: u32 = 3;

/// Box colors, assigned per label by hashing the label name.
const PALETTE: [Rgba<u8>; 6] = [
    Rgba([230, 25, 75, 255]),
    Rgba([60, 180, 75, 255]),
    Rgba([255, 225, 25, 255]),
    Rgba([0, 130, 200, 255]),
    Rgba([245, 130, 48, 255]),
    Rgba([145, 30, 180, 255]),
];

fn label_color(label: &str) -> Rgba<u8> {
    let hash: u32 = label.bytes().fold(0u32, |acc, b| {
        acc.wrapping_mul(31).wrapping_add(b as u32)
    });
    PALETTE[(hash as usize) % PALETTE.len()]
}

/// Draw labeled rectangles for every bounding box onto the image.
///
/// Boxes are drawn in ascending confidence order. Normalized coordinates
/// are converted to pixels (`xmin = left * W`, `xmax = xmin + width * W`,
/// same for y with the image height) and clamped to the image bounds.
pub fn draw_annotations(image: &mut RgbaImage, boxes: &[BoundingBox]) {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return;
    }

    let mut ordered: Vec<&BoundingBox> = boxes.iter().collect();
    ordered.sort_by(|a, b| a.confidence.total_cmp(&b.confidence));

    for bbox in ordered {
        let xmin = (bbox.left * w as f32).round().max(0.0) as u32;
        let ymin = (bbox.top * h as f32).round().max(0.0) as u32;
        let xmax = (((bbox.left + bbox.width) * w as f32).round() as u32).min(w - 1);
        let ymax = (((bbox.top + bbox.height) * h as f32).round() as u32).min(h - 1);
        if xmin >= xmax || ymin >= ymax {
            continue;
        }

        tracing::debug!(
            "Drawing '{}' ({:.1}%) at [{xmin},{ymin}]..[{xmax},{ymax}]",
            bbox.label,
            bbox.confidence * 100.0
        );
        let color = label_color(&bbox.label);
        for inset in 0..BORDER_THICKNESS {
            draw_rect_outline(image, xmin + inset, ymin + inset, xmax.saturating_sub(inset), ymax.saturating_sub(inset), color);
        }
    }
}

fn draw_rect_outline(image: &mut RgbaImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgba<u8>) {
    if x0 > x1 || y0 > y1 {
        return;
    }
    for x in x0..=x1 {
        image.put_pixel(x, y0, color);
        image.put_pixel(x, y1, color);
    }
    for y in y0..=y1 {
        image.put_pixel(x0, y, color);
        image.put_pixel(x1, y, color);
    }
}

/// Outcome counts for one annotation batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnnotateStats {
    pub succeeded: usize,
    pub failed: usize,
}

/// Draws and persists annotated images for a formatted batch.
pub struct ImageAnnotator {
    workers: usize,
    mode: ErrorHandling,
}

impl ImageAnnotator {
    pub fn new(workers: usize, mode: ErrorHandling) -> Self {
        Self {
            workers: workers.max(1),
            mode,
        }
    }

    /// Annotate and upload one image per row.
    ///
    /// Rows are processed concurrently with the same worker sizing as the
    /// dispatcher; completion order is not significant here — only the final
    /// success/failure counts are reported. Under `Log` mode an unreadable
    /// source image is logged and counted; under `Fail` mode it aborts the
    /// batch.
    pub async fn save_batch(
        &self,
        rows: &[Row],
        formatter: Arc<dyn ResponseFormatter>,
        input_store: Arc<dyn ObjectStore>,
        output_store: Arc<dyn ObjectStore>,
    ) -> Result<AnnotateStats> {
        tracing::info!("Saving annotated images for {} rows", rows.len());

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let aborted = Arc::new(AtomicBool::new(false));
        let fail_fast = self.mode == ErrorHandling::Fail;
        let mut handles = Vec::with_capacity(rows.len());

        for row in rows {
            if fail_fast && aborted.load(Ordering::SeqCst) {
                break;
            }
            let permit = semaphore.clone().acquire_owned().await;
            if permit.is_err() {
                break;
            }

            let formatter = formatter.clone();
            let input_store = input_store.clone();
            let output_store = output_store.clone();
            let aborted = aborted.clone();
            let row = row.clone();
            let mode = self.mode;

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                if fail_fast && aborted.load(Ordering::SeqCst) {
                    return Ok(false);
                }
                let result =
                    annotate_one(&row, formatter.as_ref(), input_store.as_ref(), output_store.as_ref())
                        .await;
                match result {
                    Ok(()) => Ok(true),
                    Err(e) => {
                        if mode == ErrorHandling::Fail {
                            aborted.store(true, Ordering::SeqCst);
                            Err(e)
                        } else {
                            tracing::warn!("Skipping annotation: {e}");
                            Ok(false)
                        }
                    }
                }
            }));
        }

        let mut stats = AnnotateStats::default();
        let mut first_error: Option<SightlineError> = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(true)) => stats.succeeded += 1,
                Ok(Ok(false)) => stats.failed += 1,
                Ok(Err(e)) => {
                    stats.failed += 1;
                    if first_error.is_none() {
                        first_error = Some(e.into());
                    }
                }
                Err(e) => {
                    tracing::error!("Annotation task panicked: {e}");
                    stats.failed += 1;
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        tracing::info!(
            "Saving annotated images: {} succeeded, {} failed",
            stats.succeeded,
            stats.failed
        );
        Ok(stats)
    }
}

async fn annotate_one(
    row: &Row,
    formatter: &dyn ResponseFormatter,
    input_store: &dyn ObjectStore,
    output_store: &dyn ObjectStore,
) -> std::result::Result<(), AnnotateError> {
    let path = row.get_str(IMAGE_PATH_COLUMN).unwrap_or("");
    let raw = row
        .get_str(&formatter.base().api_columns.response)
        .unwrap_or("");

    // Error rows carry an empty response, which parses to no annotations
    let response = safe_json_loads(raw, ErrorHandling::Log).unwrap_or_default();
    let boxes = formatter.annotations(&response);

    let bytes = input_store.fetch(path).await?;
    let decoded = image::load_from_memory(&bytes).map_err(|e| AnnotateError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })?;

    let mut canvas = decoded.to_rgba8();
    draw_annotations(&mut canvas, &boxes);

    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| AnnotateError::Encode {
            path: path.to_string(),
            message: e.to_string(),
        })?;

    output_store.upload(path, buffer.into_inner()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::GenericFormatter;
    use crate::store::LocalStore;

    fn sample_box(label: &str, confidence: f32) -> BoundingBox {
        BoundingBox {
            label: label.to_string(),
            confidence,
            top: 0.2,
            left: 0.1,
            width: 0.5,
            height: 0.5,
        }
    }

    #[test]
    fn test_draw_converts_normalized_to_pixels() {
        let mut image = RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 255]));
        draw_annotations(&mut image, &[sample_box("cat", 0.9)]);

        // xmin = 0.1*40 = 4, ymin = 0.2*40 = 8
        let color = label_color("cat");
        assert_eq!(*image.get_pixel(4, 8), color);
        // Interior stays untouched
        assert_eq!(*image.get_pixel(14, 18), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_draw_higher_confidence_on_top() {
        // Two overlapping boxes with different labels: the higher-confidence
        // one is drawn last and wins on shared border pixels
        let mut image = RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 255]));
        let low = sample_box("dog", 0.1);
        let high = sample_box("cat", 0.9);
        assert_ne!(label_color("dog"), label_color("cat"));

        draw_annotations(&mut image, &[high, low]);
        assert_eq!(*image.get_pixel(4, 8), label_color("cat"));
    }

    #[test]
    fn test_draw_out_of_range_box_skipped() {
        let mut image = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let degenerate = BoundingBox {
            label: "x".to_string(),
            confidence: 0.5,
            top: 0.99,
            left: 0.99,
            width: 0.0,
            height: 0.0,
        };
        draw_annotations(&mut image, &[degenerate]);
        // No panic, nothing drawn
        assert!(image.pixels().all(|p| *p == Rgba([0, 0, 0, 255])));
    }

    fn png_bytes() -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([9, 9, 9, 255])));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn formatter() -> Arc<dyn ResponseFormatter> {
        Arc::new(
            GenericFormatter::new(&["image_path".to_string()], "api", ErrorHandling::Log).unwrap(),
        )
    }

    fn response_row(path: &str) -> Row {
        let mut row = Row::from_image_path(path);
        row.set("api_response", serde_json::json!("{}"));
        row
    }

    #[tokio::test]
    async fn test_save_batch_uploads_annotated_images() {
        let input_dir = tempfile::tempdir().unwrap();
        let output_dir = tempfile::tempdir().unwrap();
        let input: Arc<dyn ObjectStore> = Arc::new(LocalStore::new(input_dir.path()));
        let output: Arc<dyn ObjectStore> = Arc::new(LocalStore::new(output_dir.path()));

        input.upload("a.png", png_bytes()).await.unwrap();
        input.upload("b.png", png_bytes()).await.unwrap();

        let annotator = ImageAnnotator::new(2, ErrorHandling::Log);
        let rows = vec![response_row("a.png"), response_row("b.png")];
        let stats = annotator
            .save_batch(&rows, formatter(), input.clone(), output.clone())
            .await
            .unwrap();

        assert_eq!(stats, AnnotateStats { succeeded: 2, failed: 0 });
        assert_eq!(output.list().await.unwrap(), vec!["a.png", "b.png"]);
    }

    #[tokio::test]
    async fn test_save_batch_log_mode_counts_corrupt_images() {
        let input_dir = tempfile::tempdir().unwrap();
        let output_dir = tempfile::tempdir().unwrap();
        let input: Arc<dyn ObjectStore> = Arc::new(LocalStore::new(input_dir.path()));
        let output: Arc<dyn ObjectStore> = Arc::new(LocalStore::new(output_dir.path()));

        input.upload("good.png", png_bytes()).await.unwrap();
        input.upload("bad.png", vec![1, 2, 3]).await.unwrap();

        let annotator = ImageAnnotator::new(2, ErrorHandling::Log);
        let rows = vec![response_row("good.png"), response_row("bad.png")];
        let stats = annotator
            .save_batch(&rows, formatter(), input, output)
            .await
            .unwrap();

        assert_eq!(stats, AnnotateStats { succeeded: 1, failed: 1 });
    }

    #[tokio::test]
    async fn test_save_batch_fail_mode_aborts_on_corrupt_image() {
        let input_dir = tempfile::tempdir().unwrap();
        let output_dir = tempfile::tempdir().unwrap();
        let input: Arc<dyn ObjectStore> = Arc::new(LocalStore::new(input_dir.path()));
        let output: Arc<dyn ObjectStore> = Arc::new(LocalStore::new(output_dir.path()));

        input.upload("bad.png", vec![1, 2, 3]).await.unwrap();

        let annotator = ImageAnnotator::new(2, ErrorHandling::Fail);
        let rows = vec![response_row("bad.png")];
        let outcome = annotator.save_batch(&rows, formatter(), input, output).await;

        assert!(matches!(outcome, Err(SightlineError::Annotate(_))));
    }
}
