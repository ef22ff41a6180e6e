//! Error types for the OCR pipeline.
//!
//! "No text found" is not an error anywhere in this crate: empty detection
//! output is a valid terminal state and is represented by empty collections.
//! `OcrError` covers the cases where the pipeline itself is broken.

use thiserror::Error;

/// Stage of the pipeline an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Encoding an image into a model input tensor.
    Encode,
    /// Decoding a model output tensor.
    Decode,
    /// Heatmap binarization, morphology, or contour extraction.
    Geometry,
    /// Cutting crops out of the source image.
    Crop,
    /// Batched recognition of crops.
    Transcription,
    /// Top-level session orchestration.
    Session,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Encode => write!(f, "tensor encode"),
            Stage::Decode => write!(f, "tensor decode"),
            Stage::Geometry => write!(f, "geometry extraction"),
            Stage::Crop => write!(f, "crop extraction"),
            Stage::Transcription => write!(f, "transcription"),
            Stage::Session => write!(f, "session"),
        }
    }
}

/// Errors surfaced by the OCR pipeline.
#[derive(Debug, Error)]
pub enum OcrError {
    /// A model file could not be loaded into an executable session.
    #[error("model load failed for '{model}': {reason}")]
    ModelLoad {
        /// Name of the model configuration that failed to load.
        model: String,
        /// Short reason string.
        reason: String,
        /// Underlying source error, when one exists.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Running a loaded model failed.
    #[error("inference failed in model '{model}': {context}")]
    Inference {
        /// Name of the model that failed.
        model: String,
        /// What the model was being asked to do.
        context: String,
        /// The underlying runtime error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An image payload could not be decoded.
    #[error("image decode")]
    ImageDecode(#[from] image::ImageError),

    /// The input image is structurally unusable (for example zero-sized).
    #[error("invalid image: {message}")]
    InvalidImage {
        /// Description of the defect.
        message: String,
    },

    /// A stage-local processing failure.
    #[error("{stage} failed: {context}")]
    Processing {
        /// The stage that failed.
        stage: Stage,
        /// Additional context.
        context: String,
    },

    /// A tensor had an unexpected shape.
    #[error("tensor '{operation}': expected {expected}, got {actual:?}")]
    TensorShape {
        /// The operation that observed the mismatch.
        operation: String,
        /// Human-readable description of the expected shape.
        expected: String,
        /// The shape actually observed.
        actual: Vec<usize>,
    },

    /// A malformed upload payload (for example an unparseable data URI).
    #[error("invalid upload: {message}")]
    InvalidUpload {
        /// Description of the defect.
        message: String,
    },

    /// A configuration problem.
    #[error("configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// Error from the ONNX Runtime session layer.
    #[error(transparent)]
    Runtime(#[from] ort::Error),

    /// Error from an ndarray reshape.
    #[error("tensor reshape")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    /// Creates a stage-local processing error.
    pub fn processing(stage: Stage, context: impl Into<String>) -> Self {
        Self::Processing {
            stage,
            context: context.into(),
        }
    }

    /// Creates an invalid-image error for zero-sized inputs.
    pub fn zero_sized_image(width: u32, height: u32) -> Self {
        Self::InvalidImage {
            message: format!("image has zero dimension ({width}x{height})"),
        }
    }
}
