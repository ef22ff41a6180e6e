//! Crop extraction from the source image.

use crate::core::errors::OcrError;
use crate::geometry::AnnotationShape;
use image::imageops;
use image::RgbImage;
use rayon::prelude::*;

/// Cuts one rectangular crop per shape out of the source image.
///
/// Shape corners are scaled back to pixel coordinates against the original
/// image's dimensions (not the detection input size) before the bounding
/// rectangle is sliced out. Crops come back in shape order.
pub fn extract_crops(
    image: &RgbImage,
    shapes: &[AnnotationShape],
) -> Result<Vec<RgbImage>, OcrError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(OcrError::zero_sized_image(image.width(), image.height()));
    }

    Ok(shapes
        .par_iter()
        .map(|shape| crop_region(image, shape))
        .collect())
}

fn crop_region(image: &RgbImage, shape: &AnnotationShape) -> RgbImage {
    let rect = shape.to_pixel_rect((image.width(), image.height()));

    let x1 = (rect.x1.max(0.0) as u32).min(image.width() - 1);
    let y1 = (rect.y1.max(0.0) as u32).min(image.height() - 1);
    let x2 = (rect.x2.ceil().max(0.0) as u32).clamp(x1 + 1, image.width());
    let y2 = (rect.y2.ceil().max(0.0) as u32).clamp(y1 + 1, image.height());

    imageops::crop_imm(image, x1, y1, x2 - x1, y2 - y1).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crops_match_shape_rectangles() {
        let image = RgbImage::new(200, 100);
        let shapes = vec![
            AnnotationShape::from_pixel_rect(0, 20.0, 10.0, 60.0, 30.0, (200, 100)),
            AnnotationShape::from_pixel_rect(1, 0.0, 0.0, 200.0, 100.0, (200, 100)),
        ];
        let crops = extract_crops(&image, &shapes).unwrap();
        assert_eq!(crops.len(), 2);
        assert_eq!((crops[0].width(), crops[0].height()), (40, 20));
        assert_eq!((crops[1].width(), crops[1].height()), (200, 100));
    }

    #[test]
    fn degenerate_shapes_still_produce_a_crop() {
        let image = RgbImage::new(50, 50);
        let shapes = vec![AnnotationShape::from_pixel_rect(
            0, 49.9, 49.9, 49.9, 49.9,
            (50, 50),
        )];
        let crops = extract_crops(&image, &shapes).unwrap();
        assert_eq!(crops.len(), 1);
        assert!(crops[0].width() >= 1 && crops[0].height() >= 1);
    }

    #[test]
    fn zero_sized_source_fails_fast() {
        let image = RgbImage::new(0, 50);
        let shapes = vec![AnnotationShape::from_pixel_rect(0, 0.0, 0.0, 1.0, 1.0, (1, 1))];
        assert!(matches!(
            extract_crops(&image, &shapes),
            Err(OcrError::InvalidImage { .. })
        ));
    }
}
