//! Batched inference with bounded batch-size reduction on failure.

use crate::error::{Error, Result};
use crate::inference::batch::{FrameBatch, PredictionVector, PreparedFrame};
use crate::inference::classifier::FrameClassifier;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs a shared classifier over frames in bounded batches.
///
/// Output `i` of [`BatchInferenceEngine::predict`] always belongs to input
/// frame `i`. Frames are never reordered.
#[derive(Clone)]
pub struct BatchInferenceEngine {
    classifier: Arc<dyn FrameClassifier>,
    labels: Arc<[String]>,
    max_batch_size: usize,
    max_retries: usize,
}

impl BatchInferenceEngine {
    /// Create an engine over a loaded classifier.
    ///
    /// `max_retries` bounds how many times a failing batch is retried at half
    /// the previous size before the failure is surfaced.
    pub fn new(
        classifier: Arc<dyn FrameClassifier>,
        max_batch_size: usize,
        max_retries: usize,
    ) -> Self {
        let labels: Arc<[String]> = classifier.labels().to_vec().into();
        Self {
            classifier,
            labels,
            max_batch_size: max_batch_size.max(1),
            max_retries,
        }
    }

    /// Label vocabulary of the underlying model.
    #[must_use]
    pub fn labels(&self) -> &Arc<[String]> {
        &self.labels
    }

    /// Maximum frames per classifier call.
    #[must_use]
    pub const fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Predict every frame, one probability vector per input frame.
    ///
    /// On [`Error::Inference`] the failed batch is retried at half its size, at
    /// most `max_retries` times per call; the reduced size is kept for the
    /// remaining frames. Running out of retries yields
    /// [`Error::InferenceExhausted`].
    pub fn predict(&self, frames: &[PreparedFrame]) -> Result<Vec<PredictionVector>> {
        let mut predictions = Vec::with_capacity(frames.len());
        let mut batch_size = self.max_batch_size;
        let mut retries = 0;
        let mut start = 0;

        while start < frames.len() {
            let end = (start + batch_size).min(frames.len());
            match self.run_batch(&frames[start..end]) {
                Ok(batch_predictions) => {
                    predictions.extend(batch_predictions);
                    start = end;
                }
                Err(Error::Inference { reason }) => {
                    let failed = end - start;
                    if retries >= self.max_retries || failed == 1 {
                        return Err(Error::InferenceExhausted {
                            attempts: retries + 1,
                            reason,
                        });
                    }
                    retries += 1;
                    batch_size = (failed / 2).max(1);
                    warn!(
                        "Inference failed ({reason}), retrying with batch size {batch_size} \
                         (retry {retries}/{})",
                        self.max_retries
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(predictions)
    }

    fn run_batch(&self, frames: &[PreparedFrame]) -> Result<Vec<PredictionVector>> {
        let batch = FrameBatch::new(frames)?;
        debug!("Running inference on {} frame(s)", batch.len());

        let outputs = self.classifier.classify(&batch)?;
        if outputs.len() != batch.len() {
            return Err(Error::ModelOutput {
                reason: format!(
                    "classifier returned {} vectors for {} frames",
                    outputs.len(),
                    batch.len()
                ),
            });
        }

        outputs
            .into_iter()
            .map(|probabilities| PredictionVector::new(Arc::clone(&self.labels), probabilities))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use std::sync::Mutex;

    /// Scores each frame by its first tensor value; fails batches above `limit`.
    struct EchoClassifier {
        labels: Vec<String>,
        limit: usize,
        calls: Mutex<Vec<usize>>,
    }

    impl EchoClassifier {
        fn new(limit: usize) -> Self {
            Self {
                labels: vec!["elephant".to_string(), "gorilla".to_string()],
                limit,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl FrameClassifier for EchoClassifier {
        fn labels(&self) -> &[String] {
            &self.labels
        }

        fn classify(&self, batch: &FrameBatch) -> Result<Vec<Vec<f32>>> {
            self.calls.lock().unwrap().push(batch.len());
            if batch.len() > self.limit {
                return Err(Error::Inference {
                    reason: "out of memory".to_string(),
                });
            }
            Ok(batch
                .tensors()
                .outer_iter()
                .map(|t| {
                    let v = t[[0, 0, 0]];
                    vec![v, 1.0 - v]
                })
                .collect())
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn frames(count: usize) -> Vec<PreparedFrame> {
        (0..count)
            .map(|i| PreparedFrame {
                frame_index: i * 10,
                tensor: Array3::from_elem((1, 1, 1), i as f32 / count as f32),
            })
            .collect()
    }

    #[test]
    fn test_predict_preserves_order_and_labels() {
        let classifier = Arc::new(EchoClassifier::new(usize::MAX));
        let engine = BatchInferenceEngine::new(classifier.clone(), 3, 0);

        let input = frames(7);
        let output = engine.predict(&input).unwrap();

        assert_eq!(output.len(), 7);
        for (frame, prediction) in input.iter().zip(&output) {
            assert_eq!(prediction.labels(), &["elephant", "gorilla"]);
            assert_eq!(prediction.get("elephant"), Some(frame.tensor[[0, 0, 0]]));
        }
        assert_eq!(*classifier.calls.lock().unwrap(), vec![3, 3, 1]);
    }

    #[test]
    fn test_predict_halves_batch_after_failure() {
        let classifier = Arc::new(EchoClassifier::new(2));
        let engine = BatchInferenceEngine::new(classifier.clone(), 8, 3);

        let output = engine.predict(&frames(5)).unwrap();
        assert_eq!(output.len(), 5);
        assert_eq!(*classifier.calls.lock().unwrap(), vec![5, 2, 2, 1]);
    }

    #[test]
    fn test_predict_halves_short_batch_below_max_size() {
        let classifier = Arc::new(EchoClassifier::new(2));
        let engine = BatchInferenceEngine::new(classifier.clone(), 16, 1);

        let output = engine.predict(&frames(4)).unwrap();
        assert_eq!(output.len(), 4);
        assert_eq!(*classifier.calls.lock().unwrap(), vec![4, 2, 2]);
    }

    #[test]
    fn test_predict_halves_final_partial_batch() {
        let classifier = Arc::new(EchoClassifier::new(2));
        let engine = BatchInferenceEngine::new(classifier.clone(), 4, 2);

        let output = engine.predict(&frames(7)).unwrap();
        assert_eq!(output.len(), 7);
        // 4 fails, then 2-sized chunks cover the rest.
        assert_eq!(*classifier.calls.lock().unwrap(), vec![4, 2, 2, 2, 1]);
    }

    #[test]
    fn test_predict_surfaces_exhausted_retries() {
        let classifier = Arc::new(EchoClassifier::new(0));
        let engine = BatchInferenceEngine::new(classifier.clone(), 8, 2);

        let err = engine.predict(&frames(4)).unwrap_err();
        assert!(matches!(err, Error::InferenceExhausted { attempts: 3, .. }));
        assert!(err.is_fatal());
        assert_eq!(*classifier.calls.lock().unwrap(), vec![4, 2, 1]);
    }

    #[test]
    fn test_predict_without_retry_budget_fails_immediately() {
        let classifier = Arc::new(EchoClassifier::new(1));
        let engine = BatchInferenceEngine::new(classifier, 4, 0);
        assert!(matches!(
            engine.predict(&frames(2)),
            Err(Error::InferenceExhausted { attempts: 1, .. })
        ));
    }

    #[test]
    fn test_predict_empty_input() {
        let engine = BatchInferenceEngine::new(Arc::new(EchoClassifier::new(1)), 4, 0);
        assert!(engine.predict(&[]).unwrap().is_empty());
    }
}
