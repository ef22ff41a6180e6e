//! CTC decoding for recognition model output.

use crate::core::constants::RECOGNITION_CHARSET;
use crate::core::errors::OcrError;
use ndarray::{ArrayD, Axis, Ix3};

/// An ordered character set with one trailing blank label.
///
/// Label `i` maps to the `i`-th character; the blank index is one past the
/// last character. The set must stay in lockstep with the loaded recognition
/// model: a mismatch garbles output but never panics (unknown labels are
/// dropped during collapse).
#[derive(Debug, Clone)]
pub struct Vocabulary {
    chars: Vec<char>,
}

impl Vocabulary {
    /// Creates a vocabulary from an ordered character set.
    pub fn new(charset: &str) -> Self {
        Self {
            chars: charset.chars().collect(),
        }
    }

    /// Number of non-blank labels.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// True when the vocabulary holds no characters.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// The blank label, one past the last character.
    pub fn blank_index(&self) -> usize {
        self.chars.len()
    }

    /// Character for a label, or `None` for the blank and out-of-range labels.
    pub fn char_at(&self, label: usize) -> Option<char> {
        self.chars.get(label).copied()
    }
}

impl Default for Vocabulary {
    /// The character set the bundled recognition models were trained with.
    fn default() -> Self {
        Self::new(RECOGNITION_CHARSET)
    }
}

/// Collapses one per-timestep label sequence into text.
///
/// A character is emitted only on the first non-blank label following a blank
/// (or the start of the sequence); repeated non-blank labels without an
/// intervening blank are suppressed, including runs of distinct labels.
pub fn collapse_labels(labels: &[usize], vocab: &Vocabulary) -> String {
    let mut text = String::new();
    let mut in_run = false;
    for &label in labels {
        if label == vocab.blank_index() {
            in_run = false;
        } else if !in_run {
            if let Some(ch) = vocab.char_at(label) {
                text.push(ch);
            }
            in_run = true;
        }
    }
    text
}

/// Decodes raw recognition output into one string per sequence.
///
/// Expects shape `(N, T, C)`. For each timestep, probabilities are taken by
/// softmax over the class axis and the arg-max class becomes the label; the
/// label sequence is then blank-collapsed. Output order matches input order.
pub fn decode_recognition_output(
    output: &ArrayD<f32>,
    vocab: &Vocabulary,
) -> Result<Vec<String>, OcrError> {
    let predictions = output
        .view()
        .into_dimensionality::<Ix3>()
        .map_err(|_| OcrError::TensorShape {
            operation: "recognition decode".to_string(),
            expected: "(batch, timesteps, classes)".to_string(),
            actual: output.shape().to_vec(),
        })?;

    let mut texts = Vec::with_capacity(predictions.len_of(Axis(0)));
    for sequence in predictions.axis_iter(Axis(0)) {
        let labels: Vec<usize> = sequence
            .axis_iter(Axis(0))
            .map(|logits| {
                let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let denominator: f32 = logits.iter().map(|&v| (v - max).exp()).sum();
                let mut best = 0;
                let mut best_probability = f32::NEG_INFINITY;
                for (label, &logit) in logits.iter().enumerate() {
                    let probability = (logit - max).exp() / denominator;
                    if probability > best_probability {
                        best_probability = probability;
                        best = label;
                    }
                }
                best
            })
            .collect();
        texts.push(collapse_labels(&labels, vocab));
    }

    Ok(texts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn tiny_vocab() -> Vocabulary {
        // 'a' = 0, 'b' = 1, blank = 2
        Vocabulary::new("ab")
    }

    #[test]
    fn default_vocabulary_blank_is_126() {
        let vocab = Vocabulary::default();
        assert_eq!(vocab.len(), 126);
        assert_eq!(vocab.blank_index(), 126);
        assert_eq!(vocab.char_at(0), Some('!'));
        assert_eq!(vocab.char_at(126), None);
    }

    #[test]
    fn collapse_emits_once_per_run() {
        let vocab = tiny_vocab();
        let blank = vocab.blank_index();
        assert_eq!(collapse_labels(&[blank, 0, 0, blank, 1], &vocab), "ab");
    }

    #[test]
    fn collapse_without_leading_blank_emits_first_run_only() {
        let vocab = tiny_vocab();
        assert_eq!(collapse_labels(&[0, 0, 0], &vocab), "a");
        // Distinct labels with no intervening blank are still one run.
        assert_eq!(collapse_labels(&[0, 1], &vocab), "a");
    }

    #[test]
    fn collapse_of_all_blanks_is_empty() {
        let vocab = tiny_vocab();
        let blank = vocab.blank_index();
        assert_eq!(collapse_labels(&[blank, blank], &vocab), "");
    }

    #[test]
    fn out_of_range_labels_are_dropped_not_fatal() {
        let vocab = tiny_vocab();
        let blank = vocab.blank_index();
        assert_eq!(collapse_labels(&[9, blank, 0], &vocab), "a");
    }

    #[test]
    fn decode_takes_argmax_per_timestep() {
        let vocab = tiny_vocab();
        // One sequence, three timesteps, three classes (a, b, blank).
        let mut logits = Array3::<f32>::zeros((1, 3, 3));
        logits[[0, 0, 0]] = 5.0; // a
        logits[[0, 1, 2]] = 5.0; // blank
        logits[[0, 2, 1]] = 5.0; // b
        let texts = decode_recognition_output(&logits.into_dyn(), &vocab).unwrap();
        assert_eq!(texts, vec!["ab".to_string()]);
    }

    #[test]
    fn decode_rejects_non_3d_output() {
        let vocab = tiny_vocab();
        let output = ArrayD::zeros(ndarray::IxDyn(&[2, 2]));
        assert!(matches!(
            decode_recognition_output(&output, &vocab),
            Err(OcrError::TensorShape { .. })
        ));
    }
}
