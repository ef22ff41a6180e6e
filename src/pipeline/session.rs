//! The analysis session: owns model handles, configuration, and the
//! word/shape state for one uploaded image at a time.
//!
//! Every pipeline run and every model load is tagged with a generation
//! counter. A run whose generation has been superseded (new upload or config
//! swap) discards its results instead of overwriting newer state; a model
//! load that completes after a newer configuration was selected is dropped.

use crate::annotate::Word;
use crate::codec::{decode_detection_heatmap, encode_detection_input, Vocabulary};
use crate::core::config::{DetectionArch, ModelConfig, PipelineConfig, RecognitionArch};
use crate::core::errors::{OcrError, Stage};
use crate::core::{load_graph, GraphRunner};
use crate::geometry::{AnnotationShape, BoxExtractor};
use crate::pipeline::crop::extract_crops;
use crate::pipeline::transcribe::{transcribe_crops, BatchFailure};
use crate::utils::upload::UploadedFile;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// How one analysis run ended.
#[derive(Debug)]
pub enum RunStatus {
    /// The run committed its words and shapes to the session.
    Completed(AnalysisSummary),
    /// A required model handle is unset; the pipeline cannot run.
    ModelUnavailable,
    /// A newer upload or configuration swap started while this run was in
    /// flight; its results were discarded.
    Superseded,
}

/// Summary of a committed run.
#[derive(Debug)]
pub struct AnalysisSummary {
    /// Number of words committed (one per detected region).
    pub word_count: usize,
    /// Recognition batches that failed, if any. Words from surviving batches
    /// are committed regardless.
    pub batch_errors: Vec<BatchFailure>,
}

#[derive(Debug)]
struct ModelSlots {
    detection_arch: DetectionArch,
    recognition_arch: RecognitionArch,
    detection: Option<Arc<GraphRunner>>,
    recognition: Option<Arc<GraphRunner>>,
}

#[derive(Debug, Default)]
struct SessionState {
    words: Vec<Word>,
    shapes: Vec<AnnotationShape>,
    loading_image: bool,
    extracting_words: bool,
}

/// One analysis session over a pair of loaded models.
#[derive(Debug)]
pub struct OcrSession {
    models_dir: PathBuf,
    config: PipelineConfig,
    vocab: Arc<Vocabulary>,
    run_generation: AtomicU64,
    model_epoch: AtomicU64,
    slots: RwLock<ModelSlots>,
    state: RwLock<SessionState>,
}

impl OcrSession {
    /// Creates a session. No models are loaded yet; call
    /// [`load_models`](Self::load_models).
    pub fn new(
        models_dir: impl Into<PathBuf>,
        detection_arch: DetectionArch,
        recognition_arch: RecognitionArch,
        config: PipelineConfig,
    ) -> Self {
        Self {
            models_dir: models_dir.into(),
            config,
            vocab: Arc::new(Vocabulary::default()),
            run_generation: AtomicU64::new(0),
            model_epoch: AtomicU64::new(0),
            slots: RwLock::new(ModelSlots {
                detection_arch,
                recognition_arch,
                detection: None,
                recognition: None,
            }),
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Currently selected detection architecture.
    pub fn detection_arch(&self) -> DetectionArch {
        self.read_slots(|slots| slots.detection_arch)
    }

    /// Currently selected recognition architecture.
    pub fn recognition_arch(&self) -> RecognitionArch {
        self.read_slots(|slots| slots.recognition_arch)
    }

    /// Snapshot of the committed words.
    pub fn words(&self) -> Vec<Word> {
        self.read_state(|state| state.words.clone())
    }

    /// Snapshot of the committed shapes.
    pub fn shapes(&self) -> Vec<AnnotationShape> {
        self.read_state(|state| state.shapes.clone())
    }

    /// True while an upload is being detected.
    pub fn is_loading_image(&self) -> bool {
        self.read_state(|state| state.loading_image)
    }

    /// True while crops are being transcribed.
    pub fn is_extracting_words(&self) -> bool {
        self.read_state(|state| state.extracting_words)
    }

    /// Flips a word's activation flag; returns false when the id is unknown.
    pub fn set_word_active(&self, word_id: u32, active: bool) -> bool {
        let mut state = self.write_state();
        match state.words.iter_mut().find(|word| word.id == word_id) {
            Some(word) => {
                word.is_active = active;
                true
            }
            None => false,
        }
    }

    /// Loads both models for the currently selected architectures.
    ///
    /// Failures are logged and leave the corresponding handle unset; callers
    /// observe that as [`RunStatus::ModelUnavailable`] on the next run.
    pub async fn load_models(&self) {
        let epoch = self.model_epoch.load(Ordering::SeqCst);
        let (detection_arch, recognition_arch) =
            self.read_slots(|slots| (slots.detection_arch, slots.recognition_arch));
        self.reload_detection(detection_arch, epoch).await;
        self.reload_recognition(recognition_arch, epoch).await;
    }

    /// Selects a detection architecture, resets session state, and reloads.
    pub async fn set_detection_arch(&self, arch: DetectionArch) {
        let epoch = self.bump_for_config_change();
        self.write_slots(|slots| {
            slots.detection_arch = arch;
            slots.detection = None;
        });
        self.reload_detection(arch, epoch).await;
    }

    /// Selects a recognition architecture, resets session state, and reloads.
    pub async fn set_recognition_arch(&self, arch: RecognitionArch) {
        let epoch = self.bump_for_config_change();
        self.write_slots(|slots| {
            slots.recognition_arch = arch;
            slots.recognition = None;
        });
        self.reload_recognition(arch, epoch).await;
    }

    /// Runs the full pipeline over one uploaded image.
    ///
    /// On success the session's words and shapes are replaced wholesale; an
    /// upload with no detectable text commits an empty word list ("no words
    /// found"), which is a completed run, not an error.
    pub async fn analyze(&self, upload: &UploadedFile) -> Result<RunStatus, OcrError> {
        let generation = self.run_generation.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut state = self.write_state();
            state.words.clear();
            state.shapes.clear();
            state.loading_image = true;
            state.extracting_words = true;
        }

        let result = self.run_pipeline(generation, upload).await;

        // Only a still-current run may clear the busy flags; a superseded one
        // would stomp the newer run's progress.
        if self.run_generation.load(Ordering::SeqCst) == generation {
            let mut state = self.write_state();
            state.loading_image = false;
            state.extracting_words = false;
        }

        result
    }

    async fn run_pipeline(
        &self,
        generation: u64,
        upload: &UploadedFile,
    ) -> Result<RunStatus, OcrError> {
        let (detection, recognition, detection_config, recognition_config) = {
            let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
            (
                slots.detection.clone(),
                slots.recognition.clone(),
                slots.detection_arch.model_config(&self.models_dir),
                slots.recognition_arch.model_config(&self.models_dir),
            )
        };

        let (Some(detection), Some(recognition)) = (detection, recognition) else {
            tracing::warn!("analysis requested with unset model handles");
            return Ok(RunStatus::ModelUnavailable);
        };

        let payload = upload.clone();
        let image = tokio::task::spawn_blocking(move || payload.decode_image())
            .await
            .map_err(|e| {
                OcrError::processing(Stage::Session, format!("image decode task aborted: {e}"))
            })??;
        tracing::info!(
            width = image.width(),
            height = image.height(),
            "analyzing uploaded image"
        );

        let shapes = self
            .detect_shapes(&image, detection, &detection_config)
            .await?;

        if self.run_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "discarding superseded detection result");
            return Ok(RunStatus::Superseded);
        }
        self.write_state().loading_image = false;

        let crops = extract_crops(&image, &shapes)?;
        let report = transcribe_crops(
            recognition,
            recognition_config,
            Arc::clone(&self.vocab),
            crops,
            self.config.transcriber.batch_size,
        )
        .await?;

        if self.run_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "discarding superseded transcription result");
            return Ok(RunStatus::Superseded);
        }

        let words: Vec<Word> = shapes
            .iter()
            .zip(&report.texts)
            .map(|(shape, text)| Word::new(shape.id, text.clone().unwrap_or_default()))
            .collect();
        let word_count = words.len();

        {
            let mut state = self.write_state();
            state.shapes = shapes;
            state.words = words;
        }

        Ok(RunStatus::Completed(AnalysisSummary {
            word_count,
            batch_errors: report.batch_errors,
        }))
    }

    async fn detect_shapes(
        &self,
        image: &image::RgbImage,
        detection: Arc<GraphRunner>,
        detection_config: &ModelConfig,
    ) -> Result<Vec<AnnotationShape>, OcrError> {
        let input = encode_detection_input(image, detection_config)?;
        let output = tokio::task::spawn_blocking(move || detection.run(input))
            .await
            .map_err(|e| OcrError::Inference {
                model: detection_config.name.clone(),
                context: format!("detection task aborted: {e}"),
                source: Box::new(e),
            })??;

        let heatmap = decode_detection_heatmap(&output)?;
        let extractor = BoxExtractor::new(self.config.extractor.clone());
        extractor.extract(
            heatmap,
            (detection_config.input_width, detection_config.input_height),
        )
    }

    async fn reload_detection(&self, arch: DetectionArch, epoch: u64) {
        let config = arch.model_config(&self.models_dir);
        match load_graph(config).await {
            Ok(runner) => {
                if self.model_epoch.load(Ordering::SeqCst) == epoch {
                    self.write_slots(|slots| slots.detection = Some(Arc::new(runner)));
                } else {
                    tracing::debug!(model = arch.name(), "dropping stale detection model load");
                }
            }
            Err(error) => {
                tracing::error!(model = arch.name(), %error, "detection model load failed");
            }
        }
    }

    async fn reload_recognition(&self, arch: RecognitionArch, epoch: u64) {
        let config = arch.model_config(&self.models_dir);
        match load_graph(config).await {
            Ok(runner) => {
                if self.model_epoch.load(Ordering::SeqCst) == epoch {
                    self.write_slots(|slots| slots.recognition = Some(Arc::new(runner)));
                } else {
                    tracing::debug!(model = arch.name(), "dropping stale recognition model load");
                }
            }
            Err(error) => {
                tracing::error!(model = arch.name(), %error, "recognition model load failed");
            }
        }
    }

    /// A configuration swap invalidates in-flight loads and runs and resets
    /// all derived state.
    fn bump_for_config_change(&self) -> u64 {
        let epoch = self.model_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.run_generation.fetch_add(1, Ordering::SeqCst);
        let mut state = self.write_state();
        state.words.clear();
        state.shapes.clear();
        state.loading_image = false;
        state.extracting_words = false;
        epoch
    }

    fn read_slots<T>(&self, f: impl FnOnce(&ModelSlots) -> T) -> T {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        f(&slots)
    }

    fn write_slots<T>(&self, f: impl FnOnce(&mut ModelSlots) -> T) -> T {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        f(&mut slots)
    }

    fn read_state<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        f(&state)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PipelineConfig;

    fn session() -> OcrSession {
        OcrSession::new(
            "models",
            DetectionArch::DbMobilenetV2,
            RecognitionArch::CrnnVgg16Bn,
            PipelineConfig::default(),
        )
    }

    #[tokio::test]
    async fn analyze_without_models_short_circuits() {
        let session = session();
        let upload = UploadedFile::from_bytes(vec![1, 2, 3]);
        // Image bytes are bogus, but the missing-model check fires first.
        let status = session.analyze(&upload).await.unwrap();
        assert!(matches!(status, RunStatus::ModelUnavailable));
        assert!(session.words().is_empty());
        assert!(!session.is_loading_image());
        assert!(!session.is_extracting_words());
    }

    #[tokio::test]
    async fn config_swap_resets_session_state() {
        let session = session();
        {
            let mut state = session.write_state();
            state.words.push(Word::new(0, "stale".to_string()));
            state.shapes.push(AnnotationShape::from_pixel_rect(
                0, 0.0, 0.0, 10.0, 10.0,
                (100, 100),
            ));
        }

        // The reload fails (no model file on disk) and must leave the handle
        // unset, while the state reset still happens.
        session
            .set_recognition_arch(RecognitionArch::CrnnMobilenetV2)
            .await;

        assert!(session.words().is_empty());
        assert!(session.shapes().is_empty());
        assert_eq!(
            session.recognition_arch(),
            RecognitionArch::CrnnMobilenetV2
        );
    }

    #[tokio::test]
    async fn word_activation_uses_the_join_key() {
        let session = session();
        {
            let mut state = session.write_state();
            state.words.push(Word::new(3, "hello".to_string()));
        }
        assert!(session.set_word_active(3, true));
        assert!(session.words()[0].is_active);
        assert!(!session.set_word_active(99, true));
    }
}
