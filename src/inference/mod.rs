pub mod model;
#[cfg(feature = "torch")]
pub mod torch;

use crate::domain::errors::AppError;
use crate::infrastructure::config::{ModelBackend, ModelConfig};
use log::info;
use model::{EnhancementModel, IdentityModel};

/// Loads the configured model once for the whole run.
pub fn load_model(config: &ModelConfig) -> Result<Box<dyn EnhancementModel>, AppError> {
    match config.backend {
        ModelBackend::Identity => {
            info!("Using identity model (no enhancement)");
            Ok(Box::new(IdentityModel))
        }
        ModelBackend::Torchscript => load_torchscript(config),
    }
}

#[cfg(feature = "torch")]
fn load_torchscript(config: &ModelConfig) -> Result<Box<dyn EnhancementModel>, AppError> {
    let path = config.path.as_deref().ok_or_else(|| {
        AppError::InvalidConfiguration("model.path is required for the torchscript backend".into())
    })?;
    let device = torch::parse_device(&config.device)?;
    info!("Loading TorchScript model {:?} on {:?}", path, device);
    Ok(Box::new(torch::TorchScriptModel::load(
        path,
        device,
        config.half_precision,
    )?))
}

#[cfg(not(feature = "torch"))]
fn load_torchscript(_config: &ModelConfig) -> Result<Box<dyn EnhancementModel>, AppError> {
    Err(AppError::ModelLoad(
        "this build has no TorchScript support; rebuild with `--features torch`".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_backend_loads() {
        let config = ModelConfig {
            backend: ModelBackend::Identity,
            path: None,
            device: "cpu".into(),
            half_precision: false,
        };
        assert_eq!(load_model(&config).unwrap().name(), "identity");
    }

    #[cfg(not(feature = "torch"))]
    #[test]
    fn test_torchscript_unavailable_without_feature() {
        let config = ModelConfig {
            backend: ModelBackend::Torchscript,
            path: Some("model.pt".into()),
            device: "cpu".into(),
            half_precision: false,
        };
        assert!(matches!(load_model(&config), Err(AppError::ModelLoad(_))));
    }
}
