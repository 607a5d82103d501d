//! Centered short-time Fourier transform with a one-sided frequency axis.
//!
//! Frames are taken from the signal reflect-padded by `window_size / 2` on
//! both sides, and the inverse uses windowed overlap-add normalized by the
//! summed squared window. Analysis followed by synthesis is the identity as
//! long as every output sample is covered by a window with non-zero energy,
//! which [`check_overlap`] enforces when a transform is built.

use crate::domain::errors::AppError;
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;
use std::sync::Arc;

/// Largest window the transform accepts.
pub const MAX_WINDOW_SIZE: usize = 1 << 20;

const WINDOW_SUM_FLOOR: f32 = 1e-11;

/// Smallest steady-state sum of squared window values a hop may leave.
const OVERLAP_ENERGY_FLOOR: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowFunction {
    #[default]
    Hamming,
    Hann,
}

impl WindowFunction {
    /// Periodic window of length `size`.
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| {
                let c = (2.0 * PI * i as f32 / size as f32).cos();
                match self {
                    WindowFunction::Hamming => 0.54 - 0.46 * c,
                    WindowFunction::Hann => 0.5 - 0.5 * c,
                }
            })
            .collect()
    }
}

/// Complex spectrogram stored frame-major: `data[frame * bins + bin]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSpectrogram {
    pub frames: usize,
    pub bins: usize,
    pub data: Vec<Complex<f32>>,
}

impl ComplexSpectrogram {
    pub fn zeros(frames: usize, bins: usize) -> Self {
        ComplexSpectrogram {
            frames,
            bins,
            data: vec![Complex::new(0.0, 0.0); frames * bins],
        }
    }

    pub fn frame(&self, frame: usize) -> &[Complex<f32>] {
        &self.data[frame * self.bins..(frame + 1) * self.bins]
    }

    pub fn frame_mut(&mut self, frame: usize) -> &mut [Complex<f32>] {
        &mut self.data[frame * self.bins..(frame + 1) * self.bins]
    }
}

#[derive(Clone)]
pub struct Stft {
    window_size: usize,
    hop_length: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
}

impl fmt::Debug for Stft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stft")
            .field("window_size", &self.window_size)
            .field("hop_length", &self.hop_length)
            .finish()
    }
}

impl Stft {
    pub fn new(
        window_size: usize,
        hop_length: usize,
        window_function: WindowFunction,
    ) -> Result<Self, AppError> {
        if window_size < 2 || window_size > MAX_WINDOW_SIZE {
            return Err(AppError::InvalidConfiguration(format!(
                "window_size must be in 2..={}, got {}",
                MAX_WINDOW_SIZE, window_size
            )));
        }
        check_overlap(window_size, hop_length, window_function)?;
        let mut planner = FftPlanner::new();
        Ok(Stft {
            window_size,
            hop_length,
            window: window_function.coefficients(window_size),
            fft: planner.plan_fft_forward(window_size),
            ifft: planner.plan_fft_inverse(window_size),
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    pub fn bins(&self) -> usize {
        self.window_size / 2 + 1
    }

    fn pad(&self) -> usize {
        self.window_size / 2
    }

    /// Frame count for a signal of `len` samples.
    pub fn frame_count(&self, len: usize) -> usize {
        let padded = len + 2 * self.pad();
        if padded < self.window_size {
            return 1;
        }
        1 + (padded - self.window_size) / self.hop_length
    }

    pub fn forward(&self, signal: &[f32]) -> Result<ComplexSpectrogram, AppError> {
        if signal.is_empty() {
            return Err(AppError::InvalidConfiguration(
                "cannot transform an empty signal".into(),
            ));
        }
        let pad = self.pad();
        let padded: Vec<f32> = (0..signal.len() + 2 * pad)
            .map(|i| signal[reflect_index(i as isize - pad as isize, signal.len())])
            .collect();

        let frames = self.frame_count(signal.len());
        let bins = self.bins();
        let mut spec = ComplexSpectrogram::zeros(frames, bins);
        let mut buffer = vec![Complex::new(0.0, 0.0); self.window_size];

        for t in 0..frames {
            let start = t * self.hop_length;
            buffer.iter_mut().enumerate().for_each(|(i, b)| {
                let sample = padded.get(start + i).copied().unwrap_or(0.0);
                *b = Complex::new(sample * self.window[i], 0.0);
            });
            self.fft.process(&mut buffer);
            spec.frame_mut(t).copy_from_slice(&buffer[..bins]);
        }
        Ok(spec)
    }

    /// Inverse transform producing exactly `length` samples.
    ///
    /// Fails if any requested sample lies outside every frame's window.
    pub fn inverse(&self, spec: &ComplexSpectrogram, length: usize) -> Result<Vec<f32>, AppError> {
        if spec.bins != self.bins() {
            return Err(AppError::Reconstruction(format!(
                "spectrogram has {} bins, transform expects {}",
                spec.bins,
                self.bins()
            )));
        }
        let n = self.window_size;
        let pad = self.pad();
        let out_len = n + self.hop_length * spec.frames.saturating_sub(1);
        let mut audio = vec![0.0f32; out_len];
        let mut window_sum = vec![0.0f32; out_len];
        let mut buffer = vec![Complex::new(0.0, 0.0); n];
        let scale = 1.0 / n as f32;

        for t in 0..spec.frames {
            let frame = spec.frame(t);
            buffer[0] = Complex::new(frame[0].re, 0.0);
            for k in 1..spec.bins {
                buffer[k] = frame[k];
                let mirror = n - k;
                if mirror == k {
                    buffer[k].im = 0.0;
                } else {
                    buffer[mirror] = frame[k].conj();
                }
            }
            self.ifft.process(&mut buffer);

            let start = t * self.hop_length;
            for (i, value) in buffer.iter().enumerate() {
                let w = self.window[i];
                audio[start + i] += value.re * scale * w;
                window_sum[start + i] += w * w;
            }
        }

        (0..length)
            .map(|i| {
                let j = i + pad;
                match (audio.get(j), window_sum.get(j)) {
                    (Some(&a), Some(&w)) if w > WINDOW_SUM_FLOOR => Ok(a / w),
                    _ => Err(AppError::Reconstruction(format!(
                        "sample {} of {} is not covered by any of {} frames",
                        i, length, spec.frames
                    ))),
                }
            })
            .collect()
    }
}

/// Minimum of `sum_k w[p + k * hop]^2` over every phase `p` of one hop.
pub fn min_overlap_energy(window: &[f32], hop_length: usize) -> f32 {
    (0..hop_length.min(window.len()))
        .map(|p| window.iter().skip(p).step_by(hop_length).map(|w| w * w).sum::<f32>())
        .fold(f32::INFINITY, f32::min)
}

/// Rejects window/hop pairs the centered overlap-add inverse cannot invert.
///
/// Two things must hold: the last frame has to reach the end of the signal,
/// which needs `hop_length <= window_size / 2 + 1`, and the squared windows
/// must not sum to zero anywhere in the steady state (NOLA).
pub fn check_overlap(
    window_size: usize,
    hop_length: usize,
    window_function: WindowFunction,
) -> Result<(), AppError> {
    if hop_length == 0 || hop_length > window_size / 2 + 1 {
        return Err(AppError::InvalidConfiguration(format!(
            "hop_length must be in 1..={} for window_size {}, got {}",
            window_size / 2 + 1,
            window_size,
            hop_length
        )));
    }
    let energy = min_overlap_energy(&window_function.coefficients(window_size), hop_length);
    if energy < OVERLAP_ENERGY_FLOOR {
        return Err(AppError::InvalidConfiguration(format!(
            "{:?} window of {} with hop {} leaves squared-window sum {:e}, below {:e}",
            window_function, window_size, hop_length, energy, OVERLAP_ENERGY_FLOOR
        )));
    }
    Ok(())
}

/// Mirror an out-of-range index back into `0..len` without repeating the edge sample.
fn reflect_index(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let m = i.rem_euclid(period);
    if m < len as isize {
        m as usize
    } else {
        (period - m) as usize
    }
}
