//! Configuration validation.

use crate::config::{Config, ModelConfig, SamplingKind};
use crate::constants::{MAX_BATCH_SIZE, probability};
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_defaults(config)?;
    for (name, model) in &config.models {
        validate_model_settings(name, model)?;
    }
    Ok(())
}

/// Validate default settings.
fn validate_defaults(config: &Config) -> Result<()> {
    let defaults = &config.defaults;

    if defaults.batch_size == 0 || defaults.batch_size > MAX_BATCH_SIZE {
        return Err(Error::ConfigValidation {
            message: format!(
                "batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                defaults.batch_size
            ),
        });
    }

    if let Some(ref model_name) = defaults.model
        && !config.models.contains_key(model_name)
    {
        return Err(Error::ModelNotFound {
            name: model_name.clone(),
        });
    }

    Ok(())
}

/// Validate the pipeline settings of one model without touching the filesystem.
pub fn validate_model_settings(name: &str, model: &ModelConfig) -> Result<()> {
    let invalid = |message: String| Error::ConfigValidation {
        message: format!("model '{name}': {message}"),
    };

    if model.input.width == 0 || model.input.height == 0 {
        return Err(invalid(format!(
            "input size must be non-zero, got {}x{}",
            model.input.width, model.input.height
        )));
    }

    if model.input.std.iter().any(|s| *s == 0.0 || !s.is_finite()) {
        return Err(invalid(format!(
            "input.std must be finite and non-zero, got {:?}",
            model.input.std
        )));
    }

    let sampling = &model.sampling;
    if sampling.count == 0 {
        return Err(invalid("sampling.count must be at least 1".to_string()));
    }

    if sampling.policy == SamplingKind::Offsets {
        if sampling.offsets.len() < sampling.count {
            return Err(invalid(format!(
                "offsets sampling needs at least {} offsets, got {}",
                sampling.count,
                sampling.offsets.len()
            )));
        }
        if let Some(bad) = sampling.offsets.iter().find(|o| !(0.0..1.0).contains(*o)) {
            return Err(invalid(format!("offset {bad} is outside [0, 1)")));
        }
    }

    let aggregation = &model.aggregation;
    if aggregation.top_k == 0 {
        return Err(invalid("aggregation.top_k must be at least 1".to_string()));
    }

    let in_range = |t: f32| (probability::MIN..=probability::MAX).contains(&t);
    if !in_range(aggregation.threshold) {
        return Err(invalid(format!(
            "threshold must be between {} and {}, got {}",
            probability::MIN,
            probability::MAX,
            aggregation.threshold
        )));
    }
    if let Some((species, t)) = aggregation.thresholds.iter().find(|(_, t)| !in_range(**t)) {
        return Err(invalid(format!(
            "threshold for '{species}' must be between 0 and 1, got {t}"
        )));
    }

    Ok(())
}

/// Validate a model configuration and check files exist.
pub fn validate_model_config(name: &str, model: &ModelConfig) -> Result<()> {
    if !model.path.exists() {
        return Err(Error::ModelFileNotFound {
            path: model.path.clone(),
        });
    }

    if !model.labels.exists() {
        return Err(Error::LabelsFileNotFound {
            path: model.labels.clone(),
        });
    }

    validate_model_settings(name, model)
}

/// Get a model by name from the config.
pub fn get_model<'a>(config: &'a Config, name: &str) -> Result<&'a ModelConfig> {
    config.models.get(name).ok_or_else(|| Error::ModelNotFound {
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn model() -> ModelConfig {
        ModelConfig::new(PathBuf::from("m.onnx"), PathBuf::from("l.txt"))
    }

    #[test]
    fn test_validate_valid_config() {
        let mut config = Config::default();
        config.models.insert("m".to_string(), model());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_batch_size() {
        let mut config = Config::default();
        config.defaults.batch_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_missing_default_model() {
        let mut config = Config::default();
        config.defaults.model = Some("nonexistent".to_string());
        assert!(matches!(
            validate_config(&config),
            Err(Error::ModelNotFound { .. })
        ));
    }

    #[test]
    fn test_validate_threshold_out_of_range() {
        let mut m = model();
        m.aggregation.threshold = 1.5;
        assert!(validate_model_settings("m", &m).is_err());

        let mut m = model();
        m.aggregation.thresholds.insert("leopard".to_string(), -0.1);
        assert!(validate_model_settings("m", &m).is_err());
    }

    #[test]
    fn test_validate_offsets_policy() {
        let mut m = model();
        m.sampling.policy = SamplingKind::Offsets;
        m.sampling.count = 2;
        m.sampling.offsets = vec![0.25];
        assert!(validate_model_settings("m", &m).is_err());

        m.sampling.offsets = vec![0.25, 1.0];
        assert!(validate_model_settings("m", &m).is_err());

        m.sampling.offsets = vec![0.25, 0.75];
        assert!(validate_model_settings("m", &m).is_ok());
    }

    #[test]
    fn test_validate_zero_std() {
        let mut m = model();
        m.input.std = [0.2, 0.0, 0.2];
        assert!(validate_model_settings("m", &m).is_err());
    }

    #[test]
    fn test_validate_model_config_missing_files() {
        assert!(matches!(
            validate_model_config("m", &model()),
            Err(Error::ModelFileNotFound { .. })
        ));
    }
}
