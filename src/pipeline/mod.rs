//! Pipeline orchestration: crop extraction, batched transcription, and the
//! analysis session that ties the stages together.

pub mod crop;
pub mod session;
pub mod transcribe;

pub use crop::extract_crops;
pub use session::{AnalysisSummary, OcrSession, RunStatus};
pub use transcribe::{batch_spans, transcribe_crops, BatchFailure, TranscriptionReport};
