//! Constants shared across the OCR pipeline.
//!
//! Normalization statistics are per model family and must match the weights
//! the models were trained with. The vocabulary must stay in lockstep with
//! whichever recognition model is loaded; a mismatch produces garbled (but
//! non-crashing) transcriptions.

/// Mean used to normalize detection model inputs (applied as `255 * mean`).
pub const DET_MEAN: f32 = 0.785;
/// Standard deviation used to normalize detection model inputs (applied as `255 * std`).
pub const DET_STD: f32 = 0.275;

/// Mean used to normalize recognition model inputs (applied as `255 * mean`).
pub const REC_MEAN: f32 = 0.694;
/// Standard deviation used to normalize recognition model inputs (applied as `255 * std`).
pub const REC_STD: f32 = 0.298;

/// Character set for the recognition models: 94 printable ASCII characters,
/// six currency/degree symbols, and 26 accented Latin characters.
///
/// The CTC blank label is the index one past the end of this set.
pub const RECOGNITION_CHARSET: &str = "!\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~\u{00b0}\u{00a3}\u{20ac}\u{00a5}\u{00a2}\u{0e3f}\u{00e0}\u{00e2}\u{00e9}\u{00e8}\u{00ea}\u{00eb}\u{00ee}\u{00ef}\u{00f4}\u{00f9}\u{00fb}\u{00fc}\u{00e7}\u{00c0}\u{00c2}\u{00c9}\u{00c8}\u{00ca}\u{00cb}\u{00ce}\u{00cf}\u{00d4}\u{00d9}\u{00db}\u{00dc}\u{00c7}";

/// Default threshold for binarizing the detection heatmap (0-255 scale).
pub const DEFAULT_BINARIZE_THRESHOLD: u8 = 77;

/// Default factor for the bounding-box expansion heuristic
/// (`offset = factor * area / (2 * (w + h))`).
pub const DEFAULT_PAD_FACTOR: f32 = 1.8;

/// Rectangles with width or height at or below this value are treated as noise.
pub const DEFAULT_MIN_BOX_SIDE: u32 = 2;

/// Default number of crops sent to the recognition model per batch.
pub const DEFAULT_REGION_BATCH_SIZE: usize = 32;

/// Input height/width shared by the selectable detection models.
pub const DETECTION_INPUT_SIZE: (u32, u32) = (512, 512);

/// Input (height, width) shared by the selectable recognition models.
pub const RECOGNITION_INPUT_SIZE: (u32, u32) = (32, 128);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_has_trailing_blank_at_126() {
        assert_eq!(RECOGNITION_CHARSET.chars().count(), 126);
    }
}
