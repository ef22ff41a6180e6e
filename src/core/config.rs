//! Model and pipeline configuration.
//!
//! The selectable model architectures form closed enums so that every
//! configuration swap is matched exhaustively. Tunables whose values were
//! measured against one model pairing (binarization threshold, padding
//! factor) live in [`ExtractorConfig`] rather than being hard-coded.

use crate::core::constants::{
    DEFAULT_BINARIZE_THRESHOLD, DEFAULT_MIN_BOX_SIDE, DEFAULT_PAD_FACTOR,
    DEFAULT_REGION_BATCH_SIZE, DET_MEAN, DET_STD, DETECTION_INPUT_SIZE, REC_MEAN, REC_STD,
    RECOGNITION_INPUT_SIZE,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Selectable text detection architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionArch {
    /// Differentiable binarization head on a MobileNet V2 backbone.
    DbMobilenetV2,
    /// Differentiable binarization head on a ResNet-50 backbone.
    DbResnet50,
}

impl DetectionArch {
    /// Stable name of this architecture, used for model file resolution.
    pub fn name(&self) -> &'static str {
        match self {
            DetectionArch::DbMobilenetV2 => "db_mobilenet_v2",
            DetectionArch::DbResnet50 => "db_resnet50",
        }
    }

    /// Builds the full model configuration for this architecture.
    pub fn model_config(&self, models_dir: &Path) -> ModelConfig {
        let (height, width) = DETECTION_INPUT_SIZE;
        ModelConfig {
            name: self.name().to_string(),
            path: models_dir.join(format!("{}.onnx", self.name())),
            input_height: height,
            input_width: width,
            mean: DET_MEAN,
            std: DET_STD,
        }
    }
}

/// Selectable text recognition architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionArch {
    /// CRNN with a VGG-16 (batch-normalized) backbone.
    CrnnVgg16Bn,
    /// CRNN with a MobileNet V2 backbone.
    CrnnMobilenetV2,
}

impl RecognitionArch {
    /// Stable name of this architecture, used for model file resolution.
    pub fn name(&self) -> &'static str {
        match self {
            RecognitionArch::CrnnVgg16Bn => "crnn_vgg16_bn",
            RecognitionArch::CrnnMobilenetV2 => "crnn_mobilenet_v2",
        }
    }

    /// Builds the full model configuration for this architecture.
    pub fn model_config(&self, models_dir: &Path) -> ModelConfig {
        let (height, width) = RECOGNITION_INPUT_SIZE;
        ModelConfig {
            name: self.name().to_string(),
            path: models_dir.join(format!("{}.onnx", self.name())),
            input_height: height,
            input_width: width,
            mean: REC_MEAN,
            std: REC_STD,
        }
    }
}

/// A resolved model configuration: where the graph lives and how its inputs
/// are shaped and normalized.
///
/// Immutable once selected; swapping architectures produces a new value and
/// invalidates in-flight results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Architecture name.
    pub name: String,
    /// Path to the serialized graph.
    pub path: PathBuf,
    /// Fixed input height.
    pub input_height: u32,
    /// Fixed input width.
    pub input_width: u32,
    /// Normalization mean for this model family (applied as `255 * mean`).
    pub mean: f32,
    /// Normalization standard deviation for this model family (applied as `255 * std`).
    pub std: f32,
}

impl ModelConfig {
    /// Target aspect ratio (width / height) of the model input.
    pub fn aspect_ratio(&self) -> f32 {
        self.input_width as f32 / self.input_height as f32
    }
}

/// Tunables for heatmap-to-geometry extraction.
///
/// The defaults reproduce the behavior the pipeline was calibrated with; they
/// are configuration because their derivation is undocumented and may not
/// transfer to other model pairings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Heatmap intensity above which a pixel counts as foreground (0-255).
    #[serde(default = "ExtractorConfig::default_binarize_threshold")]
    pub binarize_threshold: u8,
    /// Factor in the box expansion heuristic `factor * area / (2 * (w + h))`.
    #[serde(default = "ExtractorConfig::default_pad_factor")]
    pub pad_factor: f32,
    /// Rectangles with width or height at or below this are discarded.
    #[serde(default = "ExtractorConfig::default_min_box_side")]
    pub min_box_side: u32,
}

impl ExtractorConfig {
    fn default_binarize_threshold() -> u8 {
        DEFAULT_BINARIZE_THRESHOLD
    }

    fn default_pad_factor() -> f32 {
        DEFAULT_PAD_FACTOR
    }

    fn default_min_box_side() -> u32 {
        DEFAULT_MIN_BOX_SIDE
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            binarize_threshold: Self::default_binarize_threshold(),
            pad_factor: Self::default_pad_factor(),
            min_box_side: Self::default_min_box_side(),
        }
    }
}

/// Tunables for batched transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Number of crops per recognition batch. Bounds peak memory per model
    /// invocation.
    #[serde(default = "TranscriberConfig::default_batch_size")]
    pub batch_size: usize,
}

impl TranscriberConfig {
    fn default_batch_size() -> usize {
        DEFAULT_REGION_BATCH_SIZE
    }
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            batch_size: Self::default_batch_size(),
        }
    }
}

/// Full pipeline configuration for an analysis session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Geometry extraction tunables.
    #[serde(default)]
    pub extractor: ExtractorConfig,
    /// Transcription tunables.
    #[serde(default)]
    pub transcriber: TranscriberConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arch_names_resolve_model_paths() {
        let config = DetectionArch::DbMobilenetV2.model_config(Path::new("models"));
        assert_eq!(config.path, PathBuf::from("models/db_mobilenet_v2.onnx"));
        assert_eq!((config.input_height, config.input_width), (512, 512));

        let config = RecognitionArch::CrnnVgg16Bn.model_config(Path::new("models"));
        assert_eq!(config.path, PathBuf::from("models/crnn_vgg16_bn.onnx"));
        assert_eq!((config.input_height, config.input_width), (32, 128));
    }

    #[test]
    fn extractor_defaults_match_calibration() {
        let config = ExtractorConfig::default();
        assert_eq!(config.binarize_threshold, 77);
        assert!((config.pad_factor - 1.8).abs() < f32::EPSILON);
        assert_eq!(config.min_box_side, 2);
    }
}
