//! Batched transcription of crops with the recognition model.
//!
//! Crops are partitioned into fixed-size batches to bound peak memory per
//! model invocation. All batches are issued concurrently and joined; a failed
//! batch surfaces as a recorded error plus gaps in the output, never as the
//! silent loss of the other batches' results.

use crate::codec::{decode_recognition_output, encode_recognition_batch, Vocabulary};
use crate::core::config::ModelConfig;
use crate::core::errors::{OcrError, Stage};
use crate::core::GraphRunner;
use image::RgbImage;
use itertools::Itertools;
use std::ops::Range;
use std::sync::Arc;

/// Outcome of transcribing one crop list.
#[derive(Debug)]
pub struct TranscriptionReport {
    /// One entry per crop, in crop order. `None` marks a crop whose batch
    /// failed; an empty string is a crop the recognizer read as empty.
    pub texts: Vec<Option<String>>,
    /// Failures isolated per batch.
    pub batch_errors: Vec<BatchFailure>,
}

impl TranscriptionReport {
    /// True when no batch failed.
    pub fn is_complete(&self) -> bool {
        self.batch_errors.is_empty()
    }
}

/// A single batch that failed to transcribe.
#[derive(Debug)]
pub struct BatchFailure {
    /// Index of the failed batch.
    pub batch_index: usize,
    /// What went wrong.
    pub error: OcrError,
}

/// Splits `total` items into contiguous spans of at most `batch_size`.
pub fn batch_spans(total: usize, batch_size: usize) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + batch_size).min(total);
        spans.push(start..end);
        start = end;
    }
    spans
}

/// Runs the recognition model over `crops` in concurrent batches.
pub async fn transcribe_crops(
    runner: Arc<GraphRunner>,
    model: ModelConfig,
    vocab: Arc<Vocabulary>,
    crops: Vec<RgbImage>,
    batch_size: usize,
) -> Result<TranscriptionReport, OcrError> {
    if batch_size == 0 {
        return Err(OcrError::Config {
            message: "batch size must be positive".to_string(),
        });
    }

    let total = crops.len();
    if total == 0 {
        return Ok(TranscriptionReport {
            texts: Vec::new(),
            batch_errors: Vec::new(),
        });
    }

    let mut batches: Vec<Vec<RgbImage>> = Vec::with_capacity(total.div_ceil(batch_size));
    {
        let chunks = crops.into_iter().chunks(batch_size);
        for chunk in &chunks {
            batches.push(chunk.collect());
        }
    }
    tracing::debug!(crops = total, batches = batches.len(), "transcribing crops");

    let tasks: Vec<_> = batches
        .into_iter()
        .enumerate()
        .map(|(batch_index, batch)| {
            let runner = Arc::clone(&runner);
            let model = model.clone();
            let vocab = Arc::clone(&vocab);
            tokio::spawn(async move {
                let result = tokio::task::spawn_blocking(move || {
                    let input = encode_recognition_batch(&batch, &model)?;
                    let output = runner.run(input)?;
                    decode_recognition_output(&output, &vocab)
                })
                .await
                .unwrap_or_else(|e| {
                    Err(OcrError::processing(
                        Stage::Transcription,
                        format!("batch task aborted: {e}"),
                    ))
                });
                (batch_index, result)
            })
        })
        .collect();

    let mut batch_results = Vec::with_capacity(tasks.len());
    for (batch_index, joined) in futures::future::join_all(tasks).await.into_iter().enumerate() {
        match joined {
            Ok(result) => batch_results.push(result),
            Err(e) => batch_results.push((
                batch_index,
                Err(OcrError::processing(
                    Stage::Transcription,
                    format!("batch task panicked: {e}"),
                )),
            )),
        }
    }

    Ok(assemble(total, batch_size, batch_results))
}

/// Reassembles per-batch results into one crop-ordered report.
fn assemble(
    total: usize,
    batch_size: usize,
    batch_results: Vec<(usize, Result<Vec<String>, OcrError>)>,
) -> TranscriptionReport {
    let spans = batch_spans(total, batch_size);
    let mut texts: Vec<Option<String>> = vec![None; total];
    let mut batch_errors = Vec::new();

    for (batch_index, result) in batch_results {
        let span = spans[batch_index].clone();
        match result {
            Ok(batch_texts) if batch_texts.len() == span.len() => {
                for (slot, text) in texts[span].iter_mut().zip(batch_texts) {
                    *slot = Some(text);
                }
            }
            Ok(batch_texts) => {
                batch_errors.push(BatchFailure {
                    batch_index,
                    error: OcrError::processing(
                        Stage::Transcription,
                        format!(
                            "batch {} returned {} texts for {} crops",
                            batch_index,
                            batch_texts.len(),
                            span.len()
                        ),
                    ),
                });
            }
            Err(error) => {
                tracing::warn!(batch_index, %error, "recognition batch failed");
                batch_errors.push(BatchFailure { batch_index, error });
            }
        }
    }

    TranscriptionReport {
        texts,
        batch_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixty_five_crops_make_three_batches() {
        let spans = batch_spans(65, 32);
        assert_eq!(spans, vec![0..32, 32..64, 64..65]);
    }

    #[test]
    fn exact_multiple_has_no_runt_batch() {
        assert_eq!(batch_spans(64, 32), vec![0..32, 32..64]);
        assert!(batch_spans(0, 32).is_empty());
    }

    #[test]
    fn assemble_preserves_crop_order() {
        let results = vec![
            (1, Ok(vec!["c".to_string(), "d".to_string()])),
            (0, Ok(vec!["a".to_string(), "b".to_string()])),
            (2, Ok(vec!["e".to_string()])),
        ];
        let report = assemble(5, 2, results);
        let texts: Vec<_> = report.texts.into_iter().map(|t| t.unwrap()).collect();
        assert_eq!(texts, vec!["a", "b", "c", "d", "e"]);
        assert!(report.batch_errors.is_empty());
    }

    #[test]
    fn failed_batch_does_not_lose_other_results() {
        let results = vec![
            (0, Ok(vec!["a".to_string(), "b".to_string()])),
            (
                1,
                Err(OcrError::processing(Stage::Transcription, "boom")),
            ),
            (2, Ok(vec!["e".to_string()])),
        ];
        let report = assemble(5, 2, results);
        assert_eq!(report.texts[0].as_deref(), Some("a"));
        assert_eq!(report.texts[1].as_deref(), Some("b"));
        assert_eq!(report.texts[2], None);
        assert_eq!(report.texts[3], None);
        assert_eq!(report.texts[4].as_deref(), Some("e"));
        assert_eq!(report.batch_errors.len(), 1);
        assert_eq!(report.batch_errors[0].batch_index, 1);
    }

    #[test]
    fn short_batch_output_is_an_isolated_failure() {
        let results = vec![(0, Ok(vec!["a".to_string()]))];
        let report = assemble(2, 2, results);
        assert_eq!(report.texts, vec![None, None]);
        assert_eq!(report.batch_errors.len(), 1);
    }
}
