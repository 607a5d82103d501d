use crate::domain::errors::AppError;
use crate::inference::model::{EnhancementModel, ModelTensor};
use tch::{CModule, Device, IValue, Kind, Tensor};
use std::path::Path;

/// Parses `cpu`, `cuda`, `cuda:N` and `cuda_if_available`.
pub fn parse_device(spec: &str) -> Result<Device, AppError> {
    match spec {
        "cuda_if_available" => Ok(Device::cuda_if_available()),
        "cpu" => Ok(Device::Cpu),
        "cuda" => Ok(Device::Cuda(0)),
        other => other
            .strip_prefix("cuda:")
            .and_then(|index| index.parse::<usize>().ok())
            .map(Device::Cuda)
            .ok_or_else(|| {
                AppError::InvalidConfiguration(format!("invalid device specification {:?}", other))
            }),
    }
}

/// TorchScript export of an enhancement network.
///
/// The module receives `[1, C, H, W]` and may return either one tensor of the
/// same shape or a tuple of `C` tensors shaped `[1, 1, H, W]` (the complex
/// estimator returns `(real, imag)`).
pub struct TorchScriptModel {
    module: CModule,
    device: Device,
    half_precision: bool,
}

impl TorchScriptModel {
    pub fn load(path: &Path, device: Device, half_precision: bool) -> Result<Self, AppError> {
        let mut module = CModule::load_on_device(path, device)
            .map_err(|e| AppError::ModelLoad(format!("{:?}: {}", path, e)))?;
        module.set_eval();
        if half_precision {
            module.to(device, Kind::Half, false);
        }
        Ok(TorchScriptModel {
            module,
            device,
            half_precision,
        })
    }

    fn run(&self, input: &ModelTensor) -> Result<Vec<f32>, AppError> {
        let [c, h, w] = input.shape;
        let kind = if self.half_precision { Kind::Half } else { Kind::Float };
        let tensor = Tensor::from_slice(&input.data)
            .view([1, c as i64, h as i64, w as i64])
            .to_device(self.device)
            .to_kind(kind);

        let output = tch::no_grad(|| self.module.forward_is(&[IValue::Tensor(tensor)]))
            .map_err(|e| AppError::ModelInference(e.to_string()))?;
        let output = match output {
            IValue::Tensor(t) => t,
            IValue::Tuple(parts) | IValue::GenericList(parts) => {
                let tensors = parts
                    .into_iter()
                    .map(|part| match part {
                        IValue::Tensor(t) => Ok(t),
                        other => Err(AppError::ModelInference(format!(
                            "unexpected model output element {:?}",
                            other
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Tensor::cat(&tensors, 1)
            }
            other => {
                return Err(AppError::ModelInference(format!(
                    "unexpected model output {:?}",
                    other
                )));
            }
        };

        let size = output.size();
        let actual: Vec<usize> = size.iter().skip(1).map(|&d| d as usize).collect();
        if actual.as_slice() != input.shape.as_slice() {
            let mut shape = [0usize; 3];
            for (slot, d) in shape.iter_mut().zip(actual) {
                *slot = d;
            }
            return Err(AppError::ShapeMismatch {
                expected: input.shape,
                actual: shape,
            });
        }
        let flat = output
            .to_kind(Kind::Float)
            .to_device(Device::Cpu)
            .flatten(0, -1);
        Ok(Vec::<f32>::try_from(&flat)?)
    }
}

impl EnhancementModel for TorchScriptModel {
    fn enhance(&self, input: &ModelTensor) -> Result<ModelTensor, AppError> {
        // Device tensors are dropped when `run` returns, on success or error.
        let data = self.run(input)?;
        ModelTensor::new(input.shape, data)
    }

    fn name(&self) -> &'static str {
        "torchscript"
    }
}
