use crate::domain::errors::AppError;

/// Dense f32 tensor shaped `[channels, height, width]`, row-major.
///
/// The compressed-complex representation uses two channels (real, imaginary)
/// over `[frames, bins]`; the resize representation uses one channel over
/// `[freq, frames]`. The batch axis is implied.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTensor {
    pub shape: [usize; 3],
    pub data: Vec<f32>,
}

impl ModelTensor {
    pub fn new(shape: [usize; 3], data: Vec<f32>) -> Result<Self, AppError> {
        let expected = shape.iter().product::<usize>();
        if data.len() != expected {
            return Err(AppError::ModelInference(format!(
                "tensor data has {} values, shape {:?} needs {}",
                data.len(),
                shape,
                expected
            )));
        }
        Ok(ModelTensor { shape, data })
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        let plane = self.shape[1] * self.shape[2];
        &self.data[index * plane..(index + 1) * plane]
    }
}

/// Opaque enhancement model: estimates a clean spectrogram from a noisy one.
///
/// Implementations must return a tensor with the same shape as the input and
/// must not keep any per-call buffers alive after returning.
pub trait EnhancementModel {
    fn enhance(&self, input: &ModelTensor) -> Result<ModelTensor, AppError>;
    fn name(&self) -> &'static str;
}

/// Returns its input unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityModel;

impl EnhancementModel for IdentityModel {
    fn enhance(&self, input: &ModelTensor) -> Result<ModelTensor, AppError> {
        Ok(input.clone())
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_shape_checked() {
        assert!(ModelTensor::new([2, 3, 4], vec![0.0; 24]).is_ok());
        assert!(matches!(
            ModelTensor::new([2, 3, 4], vec![0.0; 23]),
            Err(AppError::ModelInference(_))
        ));
    }

    #[test]
    fn test_channel_planes() {
        let t = ModelTensor::new([2, 1, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(t.channel(0), &[1.0, 2.0]);
        assert_eq!(t.channel(1), &[3.0, 4.0]);
    }

    #[test]
    fn test_identity_model_is_passthrough() {
        let t = ModelTensor::new([1, 2, 2], vec![0.5, -0.5, 1.5, 2.5]).unwrap();
        assert_eq!(IdentityModel.enhance(&t).unwrap(), t);
    }
}
