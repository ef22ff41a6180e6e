//! # textlens
//!
//! A local two-stage OCR pipeline: a text-detection model locates words in an
//! uploaded image as a probability heatmap, geometry is extracted from the
//! heatmap, and a text-recognition model transcribes the cropped regions in
//! concurrent fixed-size batches using CTC blank-collapse decoding.
//!
//! The crate is organized around an [`OcrSession`](pipeline::OcrSession) that
//! owns the model handles and the word/shape state for one image at a time.
//! Model execution is delegated to ONNX Runtime; rendering is an external
//! collaborator behind the [`DrawSurface`](annotate::DrawSurface) trait.
//!
//! ```no_run
//! use textlens::core::{DetectionArch, PipelineConfig, RecognitionArch};
//! use textlens::pipeline::OcrSession;
//! use textlens::utils::UploadedFile;
//!
//! # async fn run() -> Result<(), textlens::core::OcrError> {
//! let session = OcrSession::new(
//!     "models",
//!     DetectionArch::DbMobilenetV2,
//!     RecognitionArch::CrnnVgg16Bn,
//!     PipelineConfig::default(),
//! );
//! session.load_models().await;
//!
//! let upload = UploadedFile::from_path("invoice.png")?;
//! session.analyze(&upload).await?;
//! for word in session.words() {
//!     println!("{}: {}", word.id, word.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod annotate;
pub mod codec;
pub mod core;
pub mod geometry;
pub mod pipeline;
pub mod utils;

pub use crate::annotate::{DrawSurface, InteractionHub, Word};
pub use crate::codec::Vocabulary;
pub use crate::core::{
    DetectionArch, ExtractorConfig, OcrError, PipelineConfig, RecognitionArch, TranscriberConfig,
};
pub use crate::geometry::{AnnotationShape, BoxExtractor, HeatMap};
pub use crate::pipeline::{OcrSession, RunStatus};
pub use crate::utils::UploadedFile;
