//! Frame classifiers: the black-box model behind the inference engine.

use crate::config::{InferenceDevice, ModelConfig, OutputActivation};
use crate::error::{Error, Result};
use crate::inference::batch::FrameBatch;
use crate::inference::labels::load_labels;
use crate::inference::provider::select_providers;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use std::sync::Mutex;
use tracing::{debug, info};

/// A trained classifier over fixed-size frame tensors.
///
/// Given a batch of `n` frames, returns `n` probability vectors, each parallel
/// to [`FrameClassifier::labels`]. Implementations are shared by every worker.
pub trait FrameClassifier: Send + Sync {
    /// Label vocabulary in output order.
    fn labels(&self) -> &[String];

    /// Classify a batch of frames. Output `i` belongs to input frame `i`.
    fn classify(&self, batch: &FrameBatch) -> Result<Vec<Vec<f32>>>;
}

/// ONNX Runtime backed classifier.
pub struct OnnxClassifier {
    /// Sessions need exclusive access to run; this is the only lock around
    /// the physical inference call.
    session: Mutex<Session>,
    labels: Vec<String>,
    activation: OutputActivation,
}

impl OnnxClassifier {
    /// Load a model and its labels for the given device.
    pub fn from_config(model_config: &ModelConfig, device: InferenceDevice) -> Result<Self> {
        let labels = load_labels(&model_config.labels)?;
        if !model_config.path.exists() {
            return Err(Error::ModelFileNotFound {
                path: model_config.path.clone(),
            });
        }

        let (providers, device_name) = select_providers(device)?;
        let build_err = |e: &dyn std::fmt::Display| Error::ClassifierBuild {
            reason: e.to_string(),
        };

        let mut builder = Session::builder()
            .map_err(|e| build_err(&e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| build_err(&e))?;
        if !providers.is_empty() {
            builder = builder
                .with_execution_providers(providers)
                .map_err(|e| build_err(&e))?;
        }
        let session = builder
            .commit_from_file(&model_config.path)
            .map_err(|e| build_err(&e))?;

        info!(
            "Loaded model: {}, {} labels, input {}x{}, device: {}",
            model_config.path.display(),
            labels.len(),
            model_config.input.width,
            model_config.input.height,
            device_name
        );

        Ok(Self {
            session: Mutex::new(session),
            labels,
            activation: model_config.activation,
        })
    }
}

impl FrameClassifier for OnnxClassifier {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn classify(&self, batch: &FrameBatch) -> Result<Vec<Vec<f32>>> {
        let inference_err = |e: &dyn std::fmt::Display| Error::Inference {
            reason: e.to_string(),
        };

        let (n, a, b, c) = batch.tensors().dim();
        let data: Vec<f32> = batch.tensors().iter().copied().collect();
        let input = Tensor::from_array(([n, a, b, c], data)).map_err(|e| inference_err(&e))?;

        let raw: Vec<f32> = {
            let mut session = self.session.lock().map_err(|_| Error::Inference {
                reason: "inference session lock poisoned".to_string(),
            })?;
            let outputs = session
                .run(ort::inputs![input])
                .map_err(|e| inference_err(&e))?;
            let (shape, values) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| inference_err(&e))?;
            debug!("Model output shape: {shape:?}");
            values.to_vec()
        };

        split_outputs(&raw, n, self.labels.len(), self.activation)
    }
}

/// Split a flat `[n, labels]` output into per-frame probability vectors.
pub(crate) fn split_outputs(
    raw: &[f32],
    frames: usize,
    labels: usize,
    activation: OutputActivation,
) -> Result<Vec<Vec<f32>>> {
    if raw.len() != frames * labels {
        return Err(Error::ModelOutput {
            reason: format!(
                "expected {frames} x {labels} = {} values, got {}",
                frames * labels,
                raw.len()
            ),
        });
    }
    if raw.iter().any(|v| !v.is_finite()) {
        return Err(Error::ModelOutput {
            reason: "output contains non-finite values".to_string(),
        });
    }

    Ok(raw
        .chunks_exact(labels.max(1))
        .take(frames)
        .map(|row| apply_activation(row, activation))
        .collect())
}

/// Turn raw scores into probabilities clamped to `[0, 1]`.
fn apply_activation(row: &[f32], activation: OutputActivation) -> Vec<f32> {
    match activation {
        OutputActivation::None => row.iter().map(|v| v.clamp(0.0, 1.0)).collect(),
        OutputActivation::Sigmoid => row.iter().map(|v| 1.0 / (1.0 + (-v).exp())).collect(),
        OutputActivation::Softmax => {
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let exps: Vec<f32> = row.iter().map(|v| (v - max).exp()).collect();
            let sum: f32 = exps.iter().sum();
            exps.into_iter()
                .map(|e| (e / sum).clamp(0.0, 1.0))
                .collect()
        }
    }
}
