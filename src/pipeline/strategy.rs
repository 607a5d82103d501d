//! Spectral representations a segment can be enhanced in.
//!
//! Both strategies take an already gain-normalized channel segment and return
//! an enhanced segment of exactly the same length.

use crate::domain::errors::AppError;
use crate::inference::model::{EnhancementModel, ModelTensor};
use crate::spectral::compression::{compress, decompress};
use crate::spectral::mel::MelFilterbank;
use crate::spectral::pad_to_window;
use crate::spectral::resize::{SpectrogramImage, resize, restore};
use crate::spectral::scaling::{ScaleParams, db_to_power, power_to_db};
use crate::spectral::stft::{ComplexSpectrogram, Stft};
use log::trace;
use num_complex::Complex;

pub trait SpectralStrategy {
    fn enhance_segment(
        &self,
        samples: &[f32],
        model: &dyn EnhancementModel,
    ) -> Result<Vec<f32>, AppError>;

    fn name(&self) -> &'static str;
}

/// Model outputs may be built without `ModelTensor::new`, so the data length
/// is checked here as well as the declared shape.
fn check_shape(input: &ModelTensor, output: &ModelTensor) -> Result<(), AppError> {
    if input.shape != output.shape {
        return Err(AppError::ShapeMismatch {
            expected: input.shape,
            actual: output.shape,
        });
    }
    let expected = output.shape.iter().product::<usize>();
    if output.data.len() != expected {
        return Err(AppError::ModelInference(format!(
            "model returned {} values for shape {:?}, expected {}",
            output.data.len(),
            output.shape,
            expected
        )));
    }
    Ok(())
}

/// Power-compressed complex spectrogram, model sees `[real, imag] x frames x bins`.
pub struct CompressedComplexStrategy {
    stft: Stft,
    exponent: f32,
}

impl CompressedComplexStrategy {
    pub fn new(stft: Stft, exponent: f32) -> Self {
        CompressedComplexStrategy { stft, exponent }
    }

    fn to_tensor(spec: &ComplexSpectrogram) -> Result<ModelTensor, AppError> {
        let mut data = Vec::with_capacity(spec.data.len() * 2);
        data.extend(spec.data.iter().map(|c| c.re));
        data.extend(spec.data.iter().map(|c| c.im));
        ModelTensor::new([2, spec.frames, spec.bins], data)
    }

    fn from_tensor(tensor: &ModelTensor) -> ComplexSpectrogram {
        let [_, frames, bins] = tensor.shape;
        ComplexSpectrogram {
            frames,
            bins,
            data: tensor
                .channel(0)
                .iter()
                .zip(tensor.channel(1))
                .map(|(&re, &im)| Complex::new(re, im))
                .collect(),
        }
    }
}

impl SpectralStrategy for CompressedComplexStrategy {
    fn enhance_segment(
        &self,
        samples: &[f32],
        model: &dyn EnhancementModel,
    ) -> Result<Vec<f32>, AppError> {
        let padded = pad_to_window(samples, self.stft.window_size());
        let noisy = compress(&self.stft.forward(&padded)?, self.exponent);
        let input = Self::to_tensor(&noisy)?;
        drop(noisy);

        let estimate = model.enhance(&input)?;
        check_shape(&input, &estimate)?;

        let spec = decompress(&Self::from_tensor(&estimate), self.exponent);
        let mut audio = self.stft.inverse(&spec, padded.len())?;
        trace!(
            "segment of {} samples (padded to {}) through {} frames",
            samples.len(),
            padded.len(),
            spec.frames
        );
        audio.truncate(samples.len());
        Ok(audio)
    }

    fn name(&self) -> &'static str {
        "compressed_complex"
    }
}

/// Log-magnitude image resized to a fixed shape; phase is kept from the input.
pub struct ResizeStrategy {
    stft: Stft,
    target: (usize, usize),
    mel: Option<MelFilterbank>,
    top_db: f32,
    scale: ScaleParams,
}

impl ResizeStrategy {
    pub fn new(
        stft: Stft,
        target: (usize, usize),
        mel: Option<MelFilterbank>,
        top_db: f32,
        scale: ScaleParams,
    ) -> Self {
        ResizeStrategy {
            stft,
            target,
            mel,
            top_db,
            scale,
        }
    }

    /// Power image `[bins x frames]` and unit phasors, frame-major like the spectrogram.
    fn split_polar(spec: &ComplexSpectrogram) -> (SpectrogramImage, Vec<Complex<f32>>) {
        let power = SpectrogramImage::from_fn(spec.bins, spec.frames, |k, t| {
            spec.frame(t)[k].norm_sqr()
        });
        let phase = spec
            .data
            .iter()
            .map(|&c| {
                let mag = c.norm();
                if mag > 0.0 { c / mag } else { Complex::new(1.0, 0.0) }
            })
            .collect();
        (power, phase)
    }
}

impl SpectralStrategy for ResizeStrategy {
    fn enhance_segment(
        &self,
        samples: &[f32],
        model: &dyn EnhancementModel,
    ) -> Result<Vec<f32>, AppError> {
        let padded = pad_to_window(samples, self.stft.window_size());
        let spec = self.stft.forward(&padded)?;
        let (power, phase) = Self::split_polar(&spec);
        let (frames, bins) = (spec.frames, spec.bins);
        drop(spec);

        let band_power = match &self.mel {
            Some(bank) => bank.to_mel(&power),
            None => power,
        };
        let (db, reference) = power_to_db(&band_power.data, self.top_db);
        let db = SpectrogramImage {
            height: band_power.height,
            width: band_power.width,
            data: db,
        };

        let resized = resize(&db, self.target).map(|v| self.scale.scale_in(v));
        let input = ModelTensor::new([1, self.target.0, self.target.1], resized.data)?;
        let estimate = model.enhance(&input)?;
        check_shape(&input, &estimate)?;

        let predicted = SpectrogramImage {
            height: self.target.0,
            width: self.target.1,
            data: estimate.data,
        }
        .map(|v| self.scale.inverse_scale_out(v));
        let denoised_db = restore(&predicted, &db);
        let denoised_band = SpectrogramImage {
            height: db.height,
            width: db.width,
            data: db_to_power(&denoised_db.data, reference),
        };
        let denoised_power = match &self.mel {
            Some(bank) => bank.to_linear(&denoised_band),
            None => denoised_band,
        };

        let mut out = ComplexSpectrogram::zeros(frames, bins);
        for t in 0..frames {
            for (k, bin) in out.frame_mut(t).iter_mut().enumerate() {
                *bin = phase[t * bins + k] * denoised_power.get(k, t).max(0.0).sqrt();
            }
        }
        let mut audio = self.stft.inverse(&out, padded.len())?;
        audio.truncate(samples.len());
        Ok(audio)
    }

    fn name(&self) -> &'static str {
        "resize"
    }
}
