//! Frame batches and per-frame prediction vectors.

use crate::constants::probability;
use crate::error::{Error, Result};
use ndarray::{Array3, Array4, ArrayView3, Axis};
use std::sync::Arc;

/// A preprocessed frame tensor tagged with its source frame index.
#[derive(Debug, Clone)]
pub struct PreparedFrame {
    /// Index of the frame in its video.
    pub frame_index: usize,
    /// Normalized input tensor, without the batch dimension.
    pub tensor: Array3<f32>,
}

/// Ordered frames stacked into one input tensor.
///
/// All tensors in a batch share the same shape; the first axis of
/// [`FrameBatch::tensors`] is the frame position.
#[derive(Debug, Clone)]
pub struct FrameBatch {
    frame_indices: Vec<usize>,
    tensors: Array4<f32>,
}

impl FrameBatch {
    /// Stack frames into a batch, preserving their order.
    pub fn new(frames: &[PreparedFrame]) -> Result<Self> {
        let Some(first) = frames.first() else {
            return Err(Error::Internal {
                message: "cannot build an empty frame batch".to_string(),
            });
        };

        if let Some(odd) = frames.iter().find(|f| f.tensor.shape() != first.tensor.shape()) {
            return Err(Error::Internal {
                message: format!(
                    "frame {} has shape {:?}, expected {:?}",
                    odd.frame_index,
                    odd.tensor.shape(),
                    first.tensor.shape()
                ),
            });
        }

        let views: Vec<ArrayView3<'_, f32>> = frames.iter().map(|f| f.tensor.view()).collect();
        let tensors = ndarray::stack(Axis(0), &views).map_err(|e| Error::Internal {
            message: format!("failed to stack frame batch: {e}"),
        })?;

        Ok(Self {
            frame_indices: frames.iter().map(|f| f.frame_index).collect(),
            tensors,
        })
    }

    /// Number of frames in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frame_indices.len()
    }

    /// Whether the batch holds no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frame_indices.is_empty()
    }

    /// Source frame indices, parallel to the first tensor axis.
    #[must_use]
    pub fn frame_indices(&self) -> &[usize] {
        &self.frame_indices
    }

    /// Stacked input tensor.
    #[must_use]
    pub const fn tensors(&self) -> &Array4<f32> {
        &self.tensors
    }
}

/// Per-label probabilities for one frame.
///
/// Labels are shared with every other vector from the same model. Values
/// need not sum to one but each lies in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionVector {
    labels: Arc<[String]>,
    probabilities: Vec<f32>,
}

impl PredictionVector {
    /// Pair a probability vector with its label vocabulary.
    pub fn new(labels: Arc<[String]>, probabilities: Vec<f32>) -> Result<Self> {
        if probabilities.len() != labels.len() {
            return Err(Error::ModelOutput {
                reason: format!(
                    "expected {} probabilities, got {}",
                    labels.len(),
                    probabilities.len()
                ),
            });
        }
        if let Some((i, p)) = probabilities
            .iter()
            .enumerate()
            .find(|(_, p)| !(probability::MIN..=probability::MAX).contains(*p))
        {
            return Err(Error::ModelOutput {
                reason: format!("probability {p} for '{}' is outside [0, 1]", labels[i]),
            });
        }
        Ok(Self {
            labels,
            probabilities,
        })
    }

    /// Label vocabulary in output order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Shared handle to the label vocabulary.
    #[must_use]
    pub fn shared_labels(&self) -> Arc<[String]> {
        Arc::clone(&self.labels)
    }

    /// Probabilities parallel to [`PredictionVector::labels`].
    #[must_use]
    pub fn probabilities(&self) -> &[f32] {
        &self.probabilities
    }

    /// Probability of one label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<f32> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.probabilities[i])
    }

    /// Iterate `(label, probability)` pairs in vocabulary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.probabilities.iter().copied())
    }
}
