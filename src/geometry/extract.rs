//! Bounding-box extraction from detection heatmaps.

use crate::core::config::ExtractorConfig;
use crate::core::errors::OcrError;
use crate::geometry::{AnnotationShape, HeatMap};
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Converts a probability heatmap into normalized annotation shapes.
///
/// The extractor binarizes the heatmap, suppresses speckle with a small
/// morphological opening, traces external contours, and turns each surviving
/// bounding rectangle into an [`AnnotationShape`] normalized against the
/// detection input size.
#[derive(Debug, Clone, Default)]
pub struct BoxExtractor {
    config: ExtractorConfig,
}

impl BoxExtractor {
    /// Creates an extractor with the given tunables.
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extracts annotation shapes from a heatmap.
    ///
    /// `detection_input` is the (width, height) the detection model consumed.
    /// When the heatmap's own dimensions differ (a model that downsamples
    /// internally), rectangles are rescaled to the detection input space
    /// before normalization so the shapes align with the displayed image.
    ///
    /// Returned shapes are in contour-discovery order reversed; callers must
    /// not read meaning into the ordering. An empty result is a valid outcome,
    /// not an error.
    pub fn extract(
        &self,
        heatmap: HeatMap,
        detection_input: (u32, u32),
    ) -> Result<Vec<AnnotationShape>, OcrError> {
        let (target_w, target_h) = detection_input;
        if target_w == 0 || target_h == 0 {
            return Err(OcrError::Config {
                message: "detection input size has a zero dimension".to_string(),
            });
        }
        if heatmap.width() == 0 || heatmap.height() == 0 {
            return Err(OcrError::zero_sized_image(heatmap.width(), heatmap.height()));
        }

        let scale_x = target_w as f32 / heatmap.width() as f32;
        let scale_y = target_h as f32 / heatmap.height() as f32;

        let mask = self.binarize(heatmap.into_gray_image());
        let opened = morphology::open(&mask, Norm::LInf, 1);
        let contours = find_contours::<u32>(&opened);

        let mut shapes = Vec::new();
        for (index, contour) in contours.iter().enumerate() {
            if contour.border_type != BorderType::Outer {
                continue;
            }
            let Some((x, y, w, h)) = bounding_rect(contour) else {
                continue;
            };
            if w <= self.config.min_box_side || h <= self.config.min_box_side {
                continue;
            }

            // Map into detection-input space before expanding.
            let x = x as f32 * scale_x;
            let y = y as f32 * scale_y;
            let w = w as f32 * scale_x;
            let h = h as f32 * scale_y;

            let offset = expansion_offset(w, h, self.config.pad_factor);
            let x1 = (x - offset).clamp(0.0, target_w as f32);
            let y1 = (y - offset).clamp(0.0, target_h as f32);
            let x2 = (x1 + w + 2.0 * offset).clamp(0.0, target_w as f32);
            let y2 = (y1 + h + 2.0 * offset).clamp(0.0, target_h as f32);

            shapes.push(AnnotationShape::from_pixel_rect(
                index as u32,
                x1,
                y1,
                x2,
                y2,
                detection_input,
            ));
        }

        // Most-recently-discovered first. The ordering is an artifact, not a
        // guarantee.
        shapes.reverse();

        tracing::debug!(shapes = shapes.len(), "extracted bounding boxes");
        Ok(shapes)
    }

    fn binarize(&self, gray: GrayImage) -> GrayImage {
        let threshold = self.config.binarize_threshold;
        let mut mask = GrayImage::new(gray.width(), gray.height());
        for (x, y, pixel) in gray.enumerate_pixels() {
            let value = if pixel[0] > threshold { 255 } else { 0 };
            mask.put_pixel(x, y, Luma([value]));
        }
        mask
    }
}

/// Axis-aligned bounding rectangle of a contour as `(x, y, w, h)`.
fn bounding_rect(contour: &Contour<u32>) -> Option<(u32, u32, u32, u32)> {
    if contour.points.is_empty() {
        return None;
    }
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    for point in &contour.points {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }
    Some((min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Approximate uniform dilation so thin glyphs keep enough padding for the
/// recognizer: `factor * area / (2 * (w + h))`.
fn expansion_offset(w: f32, h: f32, factor: f32) -> f32 {
    factor * w * h / (2.0 * (w + h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ExtractorConfig;

    fn heatmap_with_blobs(width: u32, height: u32, blobs: &[(u32, u32, u32, u32)]) -> HeatMap {
        let mut pixels = vec![0u8; (width * height) as usize];
        for &(bx, by, bw, bh) in blobs {
            for y in by..by + bh {
                for x in bx..bx + bw {
                    pixels[(y * width + x) as usize] = 255;
                }
            }
        }
        HeatMap::new(width, height, pixels).unwrap()
    }

    #[test]
    fn expansion_offset_matches_heuristic() {
        assert!((expansion_offset(10.0, 10.0, 1.8) - 4.5).abs() < 1e-6);
    }

    #[test]
    fn single_blob_produces_one_expanded_shape() {
        let heatmap = heatmap_with_blobs(100, 100, &[(10, 10, 20, 20)]);
        let extractor = BoxExtractor::new(ExtractorConfig::default());
        let shapes = extractor.extract(heatmap, (100, 100)).unwrap();
        assert_eq!(shapes.len(), 1);

        let rect = shapes[0].to_pixel_rect((100, 100));
        // offset = 1.8 * 400 / 80 = 4.5 on each side.
        assert!((rect.x1 - 5.5).abs() < 0.5, "x1 = {}", rect.x1);
        assert!((rect.y1 - 5.5).abs() < 0.5, "y1 = {}", rect.y1);
        assert!((rect.x2 - 34.5).abs() < 0.5, "x2 = {}", rect.x2);
        assert!((rect.y2 - 34.5).abs() < 0.5, "y2 = {}", rect.y2);
    }

    #[test]
    fn tiny_rectangles_are_noise() {
        // 2x2 and 1x8 blobs never survive; the 10x10 one does.
        let heatmap = heatmap_with_blobs(64, 64, &[(4, 4, 2, 2), (30, 4, 1, 8), (20, 30, 10, 10)]);
        let extractor = BoxExtractor::new(ExtractorConfig::default());
        let shapes = extractor.extract(heatmap, (64, 64)).unwrap();
        assert_eq!(shapes.len(), 1);
        let rect = shapes[0].to_pixel_rect((64, 64));
        assert!(rect.x1 < 20.0 && rect.x2 > 30.0);
    }

    #[test]
    fn blank_heatmap_yields_empty_result() {
        let heatmap = heatmap_with_blobs(64, 64, &[]);
        let extractor = BoxExtractor::new(ExtractorConfig::default());
        assert!(extractor.extract(heatmap, (64, 64)).unwrap().is_empty());
    }

    #[test]
    fn below_threshold_intensity_is_background() {
        let width = 32;
        let mut pixels = vec![0u8; 32 * 32];
        for y in 5..15 {
            for x in 5..15 {
                pixels[y * width + x] = 77; // not strictly greater than the threshold
            }
        }
        let heatmap = HeatMap::new(32, 32, pixels).unwrap();
        let extractor = BoxExtractor::new(ExtractorConfig::default());
        assert!(extractor.extract(heatmap, (32, 32)).unwrap().is_empty());
    }

    #[test]
    fn shapes_come_back_most_recent_first() {
        let heatmap = heatmap_with_blobs(100, 100, &[(10, 5, 20, 10), (10, 60, 20, 10)]);
        let extractor = BoxExtractor::new(ExtractorConfig::default());
        let shapes = extractor.extract(heatmap, (100, 100)).unwrap();
        assert_eq!(shapes.len(), 2);
        // Discovery order is raster order (top blob first), returned reversed.
        assert!(shapes[0].id > shapes[1].id);
        let first = shapes[0].to_pixel_rect((100, 100));
        let second = shapes[1].to_pixel_rect((100, 100));
        assert!(first.y1 > second.y1);
    }

    #[test]
    fn downsampled_heatmap_is_rescaled_to_detection_input() {
        // Heatmap at half the detection input resolution.
        let heatmap = heatmap_with_blobs(50, 50, &[(10, 10, 10, 10)]);
        let extractor = BoxExtractor::new(ExtractorConfig::default());
        let shapes = extractor.extract(heatmap, (100, 100)).unwrap();
        assert_eq!(shapes.len(), 1);

        let rect = shapes[0].to_pixel_rect((100, 100));
        // Scaled rect is (20, 20, 20, 20); offset = 1.8 * 400 / 80 = 4.5.
        assert!((rect.x1 - 15.5).abs() < 1.5, "x1 = {}", rect.x1);
        assert!((rect.x2 - 44.5).abs() < 1.5, "x2 = {}", rect.x2);
    }
}
