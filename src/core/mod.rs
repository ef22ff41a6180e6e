//! Core building blocks of the OCR pipeline: configuration, errors, and the
//! inference session wrapper.

pub mod config;
pub mod constants;
pub mod errors;
pub mod inference;

/// A 3-dimensional `f32` tensor (label-sequence batches).
pub type Tensor3D = ndarray::Array3<f32>;
/// A 4-dimensional `f32` tensor (image batches, NHWC).
pub type Tensor4D = ndarray::Array4<f32>;

pub use config::{
    DetectionArch, ExtractorConfig, ModelConfig, PipelineConfig, RecognitionArch, TranscriberConfig,
};
pub use errors::{OcrError, Stage};
pub use inference::{load_graph, GraphRunner};
