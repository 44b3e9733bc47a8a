//! Model loading and batched frame inference.

mod batch;
mod classifier;
mod engine;
mod labels;
pub mod provider;

pub use batch::{FrameBatch, PredictionVector, PreparedFrame};
pub use classifier::{FrameClassifier, OnnxClassifier};
pub use engine::BatchInferenceEngine;
pub use labels::load_labels;
