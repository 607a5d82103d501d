//! Magnitude power-law compression that leaves phase untouched.

use super::stft::ComplexSpectrogram;
use num_complex::Complex;

pub const DEFAULT_COMPRESS_EXPONENT: f32 = 0.3;

fn rescale(c: Complex<f32>, exponent: f32) -> Complex<f32> {
    let mag = c.norm();
    if mag == 0.0 {
        return Complex::new(0.0, 0.0);
    }
    Complex::from_polar(mag.powf(exponent), c.arg())
}

/// `|X|^e * exp(j * angle(X))` for every bin.
pub fn compress(spec: &ComplexSpectrogram, exponent: f32) -> ComplexSpectrogram {
    ComplexSpectrogram {
        frames: spec.frames,
        bins: spec.bins,
        data: spec.data.iter().map(|&c| rescale(c, exponent)).collect(),
    }
}

pub fn decompress(spec: &ComplexSpectrogram, exponent: f32) -> ComplexSpectrogram {
    ComplexSpectrogram {
        frames: spec.frames,
        bins: spec.bins,
        data: spec.data.iter().map(|&c| rescale(c, 1.0 / exponent)).collect(),
    }
}
