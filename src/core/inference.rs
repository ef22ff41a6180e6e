//! ONNX Runtime session wrapper.
//!
//! A [`GraphRunner`] owns one executable session for one model configuration.
//! `ort` sessions require exclusive access to run, so the session sits behind
//! a mutex; concurrent recognition batches interleave their waits here rather
//! than executing in parallel.

use crate::core::config::ModelConfig;
use crate::core::errors::OcrError;
use crate::core::Tensor4D;
use ndarray::ArrayD;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::sync::Mutex;

/// An executable model handle.
pub struct GraphRunner {
    session: Mutex<Session>,
    name: String,
}

impl std::fmt::Debug for GraphRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphRunner")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl GraphRunner {
    /// Loads the serialized graph named by `config` into an executable session.
    pub fn load(config: &ModelConfig) -> Result<Self, OcrError> {
        tracing::info!(model = %config.name, path = %config.path.display(), "loading model");

        let session = Session::builder()
            .and_then(|builder| Ok(builder.with_optimization_level(GraphOptimizationLevel::Level3)?))
            .and_then(|mut builder| builder.commit_from_file(&config.path))
            .map_err(|e| OcrError::ModelLoad {
                model: config.name.clone(),
                reason: e.to_string(),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            session: Mutex::new(session),
            name: config.name.clone(),
        })
    }

    /// Name of the model configuration this runner was loaded from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Executes the graph on one input tensor and returns the first output.
    pub fn run(&self, input: Tensor4D) -> Result<ArrayD<f32>, OcrError> {
        let input_shape = input.shape().to_vec();
        let tensor = Tensor::from_array(input).map_err(|e| OcrError::Inference {
            model: self.name.clone(),
            context: format!("building input value with shape {input_shape:?}"),
            source: Box::new(e),
        })?;

        let mut session = self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| OcrError::Inference {
                model: self.name.clone(),
                context: format!("forward pass on input shape {input_shape:?}"),
                source: Box::new(e),
            })?;

        let view = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| OcrError::Inference {
                model: self.name.clone(),
                context: "extracting output tensor".to_string(),
                source: Box::new(e),
            })?;

        Ok(view.to_owned())
    }
}

/// Loads a graph off the async runtime's blocking pool.
pub async fn load_graph(config: ModelConfig) -> Result<GraphRunner, OcrError> {
    tokio::task::spawn_blocking(move || GraphRunner::load(&config))
        .await
        .map_err(|e| OcrError::ModelLoad {
            model: "unknown".to_string(),
            reason: format!("load task aborted: {e}"),
            source: None,
        })?
}
