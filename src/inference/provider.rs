//! Execution provider metadata and selection.

use crate::config::InferenceDevice;
use crate::error::{Error, Result};
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, DirectMLExecutionProvider, ExecutionProvider,
    ExecutionProviderDispatch, TensorRTExecutionProvider,
};
use tracing::{debug, info, warn};

/// Accelerated execution providers zamba knows how to register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// NVIDIA `TensorRT`.
    TensorRt,
    /// NVIDIA CUDA.
    Cuda,
    /// Windows `DirectML`.
    DirectMl,
    /// Apple `CoreML`.
    CoreMl,
}

/// GPU provider priority order shared by `auto` and `gpu` devices.
pub const GPU_PRIORITY: [Provider; 4] = [
    Provider::TensorRt,
    Provider::Cuda,
    Provider::DirectMl,
    Provider::CoreMl,
];

/// Metadata for an execution provider.
pub struct ProviderMetadata {
    /// CLI identifier (e.g., "cuda", "tensorrt").
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Description for human output.
    pub description: &'static str,
}

impl Provider {
    /// Metadata for this provider.
    #[must_use]
    pub const fn metadata(self) -> ProviderMetadata {
        match self {
            Self::TensorRt => ProviderMetadata {
                id: "tensorrt",
                name: "TensorRT",
                description: "TensorRT (NVIDIA optimized inference)",
            },
            Self::Cuda => ProviderMetadata {
                id: "cuda",
                name: "CUDA",
                description: "CUDA (NVIDIA GPU acceleration)",
            },
            Self::DirectMl => ProviderMetadata {
                id: "directml",
                name: "DirectML",
                description: "DirectML (Windows GPU acceleration)",
            },
            Self::CoreMl => ProviderMetadata {
                id: "coreml",
                name: "CoreML",
                description: "CoreML (Apple GPU/Neural Engine)",
            },
        }
    }

    /// Whether the loaded ONNX Runtime reports this provider as usable.
    #[must_use]
    pub fn is_available(self) -> bool {
        let available = match self {
            Self::TensorRt => TensorRTExecutionProvider::default().is_available(),
            Self::Cuda => CUDAExecutionProvider::default().is_available(),
            Self::DirectMl => DirectMLExecutionProvider::default().is_available(),
            Self::CoreMl => CoreMLExecutionProvider::default().is_available(),
        };
        available.unwrap_or(false)
    }

    fn dispatch(self) -> ExecutionProviderDispatch {
        match self {
            Self::TensorRt => TensorRTExecutionProvider::default().build(),
            Self::Cuda => CUDAExecutionProvider::default().build(),
            Self::DirectMl => DirectMLExecutionProvider::default().build(),
            Self::CoreMl => CoreMLExecutionProvider::default().build(),
        }
    }
}

/// Providers available at runtime, in priority order.
#[must_use]
pub fn available_providers() -> Vec<Provider> {
    GPU_PRIORITY
        .into_iter()
        .filter(|p| p.is_available())
        .collect()
}

/// Execution providers to register for a device, plus a label for logs.
///
/// An empty list means plain CPU execution.
pub fn select_providers(
    device: InferenceDevice,
) -> Result<(Vec<ExecutionProviderDispatch>, &'static str)> {
    let available = available_providers();
    debug!(
        "Available execution providers: {}",
        available
            .iter()
            .map(|p| p.metadata().name)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let explicit = |provider: Provider| {
        let name = provider.metadata().name;
        if !available.contains(&provider) {
            return Err(provider_unavailable_error(name, &available));
        }
        info!("Requested device: {name}");
        Ok((vec![provider.dispatch().error_on_failure()], name))
    };

    match device {
        InferenceDevice::Cpu => {
            info!("Requested device: CPU");
            Ok((Vec::new(), "CPU"))
        }
        InferenceDevice::Auto => {
            if let Some(provider) = available.first() {
                let name = provider.metadata().name;
                info!("Auto mode: {name} available, attempting GPU");
                Ok((vec![provider.dispatch()], name))
            } else {
                info!("Auto mode: No GPU providers available, using CPU");
                Ok((Vec::new(), "Auto (CPU)"))
            }
        }
        InferenceDevice::Gpu => {
            if let Some(provider) = available.first() {
                let name = provider.metadata().name;
                info!("--gpu: Selected {name} provider");
                Ok((vec![provider.dispatch()], name))
            } else {
                warn!("--gpu requested but no GPU providers available, using CPU");
                Ok((Vec::new(), "GPU (fallback to CPU)"))
            }
        }
        InferenceDevice::Cuda => explicit(Provider::Cuda),
        InferenceDevice::TensorRt => explicit(Provider::TensorRt),
        InferenceDevice::DirectMl => explicit(Provider::DirectMl),
        InferenceDevice::CoreMl => explicit(Provider::CoreMl),
    }
}

/// Create a descriptive error for an unavailable execution provider.
fn provider_unavailable_error(provider_name: &str, available: &[Provider]) -> Error {
    use std::fmt::Write;

    let mut message = format!("{provider_name} provider not available\n\n");
    message.push_str("Available providers:\n");
    message.push_str("  CPU\n");
    for provider in available {
        let _ = writeln!(message, "  {}", provider.metadata().name);
    }

    message.push_str("\nTry one of:\n");
    message.push_str("  zamba --cpu <input>     (use CPU)\n");
    message.push_str("  zamba --gpu <input>     (auto-select best GPU)\n");
    message.push_str("  zamba <input>           (auto mode with fallback)\n");

    Error::ClassifierBuild { reason: message }
}
