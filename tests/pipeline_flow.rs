//! End-to-end checks of the geometry and batching stages through the public
//! API, without any model on disk.

use image::RgbImage;
use textlens::core::{DetectionArch, PipelineConfig, RecognitionArch};
use textlens::geometry::{AnnotationShape, BoxExtractor, HeatMap};
use textlens::pipeline::{batch_spans, extract_crops, OcrSession, RunStatus};
use textlens::utils::UploadedFile;
use textlens::ExtractorConfig;

fn synthetic_heatmap(width: u32, height: u32, rect: (u32, u32, u32, u32)) -> HeatMap {
    let (bx, by, bw, bh) = rect;
    let mut pixels = vec![0u8; (width * height) as usize];
    for y in by..by + bh {
        for x in bx..bx + bw {
            pixels[(y * width + x) as usize] = 200;
        }
    }
    HeatMap::new(width, height, pixels).unwrap()
}

#[test]
fn one_blob_becomes_one_expanded_word_region() {
    let heatmap = synthetic_heatmap(100, 100, (10, 10, 20, 20));
    let extractor = BoxExtractor::new(ExtractorConfig::default());
    let shapes = extractor.extract(heatmap, (100, 100)).unwrap();
    assert_eq!(shapes.len(), 1);

    // offset = 1.8 * (20*20) / (2 * (20+20)) = 4.5
    let rect = shapes[0].to_pixel_rect((100, 100));
    assert!((rect.x1 - 5.5).abs() < 0.5);
    assert!((rect.y1 - 5.5).abs() < 0.5);
    assert!((rect.x2 - 34.5).abs() < 0.5);
    assert!((rect.y2 - 34.5).abs() < 0.5);

    // The same normalized shape cuts a crop out of a differently sized
    // source image, scaled against that image's own dimensions.
    let source = RgbImage::new(400, 200);
    let crops = extract_crops(&source, &shapes).unwrap();
    assert_eq!(crops.len(), 1);
    let expected_w = (rect.x2 / 100.0 * 400.0).ceil() - (rect.x1 / 100.0 * 400.0).floor();
    assert!((crops[0].width() as f32 - expected_w).abs() <= 1.0);
}

#[test]
fn blob_near_the_border_is_clamped() {
    let heatmap = synthetic_heatmap(100, 100, (0, 0, 20, 20));
    let extractor = BoxExtractor::new(ExtractorConfig::default());
    let shapes = extractor.extract(heatmap, (100, 100)).unwrap();
    assert_eq!(shapes.len(), 1);
    for corner in shapes[0].corners {
        assert!((0.0..=1.0).contains(&corner[0]));
        assert!((0.0..=1.0).contains(&corner[1]));
    }
}

#[test]
fn batch_partitioning_matches_contract() {
    let spans = batch_spans(65, 32);
    assert_eq!(spans.len(), 3);
    assert_eq!(spans[0].len(), 32);
    assert_eq!(spans[1].len(), 32);
    assert_eq!(spans[2].len(), 1);
}

#[test]
fn coordinate_round_trip_is_stable() {
    for &frame in &[(100u32, 100u32), (1920, 1080), (33, 77)] {
        let shape = AnnotationShape::from_pixel_rect(0, 3.0, 4.0, 30.0, 40.0, frame);
        let rect = shape.to_pixel_rect(frame);
        assert!((rect.x1 - 3.0).abs() < 1e-2);
        assert!((rect.y1 - 4.0).abs() < 1e-2);
        assert!((rect.x2 - 30.0).abs() < 1e-2);
        assert!((rect.y2 - 40.0).abs() < 1e-2);
    }
}

#[tokio::test]
async fn session_without_models_reports_unavailable() {
    let session = OcrSession::new(
        "nonexistent-models-dir",
        DetectionArch::DbMobilenetV2,
        RecognitionArch::CrnnVgg16Bn,
        PipelineConfig::default(),
    );

    let mut png = Vec::new();
    image::DynamicImage::new_rgb8(32, 32)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let status = session
        .analyze(&UploadedFile::from_bytes(png))
        .await
        .unwrap();
    assert!(matches!(status, RunStatus::ModelUnavailable));
    assert!(session.words().is_empty());
    assert!(session.shapes().is_empty());
}
