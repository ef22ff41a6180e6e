//! Conversions between images and model tensors.
//!
//! The codec owns both directions for both model families: encoding images
//! into normalized, padded NHWC input tensors, and decoding raw model output
//! into a probability heatmap (detection) or text (recognition).

pub mod ctc;
pub mod detection;
pub mod recognition;

pub use ctc::{collapse_labels, decode_recognition_output, Vocabulary};
pub use detection::{decode_detection_heatmap, encode_detection_input};
pub use recognition::encode_recognition_batch;
