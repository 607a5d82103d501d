//! Triangular mel filterbank on the Slaney mel scale.
//!
//! Filters have unit peak and neighbouring slopes sum to one, so a band value
//! is the weighted mean power under its triangle and the inverse interpolates
//! band values back onto linear bins. A flat spectrum maps through both
//! directions unchanged.

use super::resize::SpectrogramImage;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;

fn logstep() -> f64 {
    (6.4f64).ln() / 27.0
}

pub fn hz_to_mel(hz: f64) -> f64 {
    let min_log_mel = MIN_LOG_HZ / F_SP;
    if hz >= MIN_LOG_HZ {
        min_log_mel + (hz / MIN_LOG_HZ).ln() / logstep()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    let min_log_mel = MIN_LOG_HZ / F_SP;
    if mel >= min_log_mel {
        MIN_LOG_HZ * (logstep() * (mel - min_log_mel)).exp()
    } else {
        F_SP * mel
    }
}

#[derive(Debug, Clone)]
pub struct MelFilterbank {
    n_mels: usize,
    bins: usize,
    /// `weights[m * bins + k]`
    weights: Vec<f32>,
    centers_hz: Vec<f64>,
    bin_hz: Vec<f64>,
}

impl MelFilterbank {
    pub fn new(sample_rate: u32, window_size: usize, n_mels: usize) -> Self {
        let bins = window_size / 2 + 1;
        let bin_hz: Vec<f64> = (0..bins)
            .map(|k| k as f64 * f64::from(sample_rate) / window_size as f64)
            .collect();
        let max_mel = hz_to_mel(f64::from(sample_rate) / 2.0);
        let edges: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(max_mel * i as f64 / (n_mels + 1) as f64))
            .collect();

        let mut weights = vec![0.0f32; n_mels * bins];
        for m in 0..n_mels {
            let (lo, mid, hi) = (edges[m], edges[m + 1], edges[m + 2]);
            for (k, &f) in bin_hz.iter().enumerate() {
                let lower = (f - lo) / (mid - lo);
                let upper = (hi - f) / (hi - mid);
                weights[m * bins + k] = lower.min(upper).max(0.0) as f32;
            }
        }

        MelFilterbank {
            n_mels,
            bins,
            weights,
            centers_hz: edges[1..=n_mels].to_vec(),
            bin_hz,
        }
    }

    pub fn n_mels(&self) -> usize {
        self.n_mels
    }

    fn weight(&self, m: usize, k: usize) -> f32 {
        self.weights[m * self.bins + k]
    }

    fn nearest_bin(&self, hz: f64) -> usize {
        nearest(&self.bin_hz, hz)
    }

    fn nearest_band(&self, hz: f64) -> usize {
        nearest(&self.centers_hz, hz)
    }

    /// Linear power `[bins x frames]` to mel power `[n_mels x frames]`.
    pub fn to_mel(&self, power: &SpectrogramImage) -> SpectrogramImage {
        SpectrogramImage::from_fn(self.n_mels, power.width, |m, t| {
            let (mut acc, mut norm) = (0.0f32, 0.0f32);
            for k in 0..self.bins {
                let w = self.weight(m, k);
                acc += w * power.get(k, t);
                norm += w;
            }
            if norm > 0.0 {
                acc / norm
            } else {
                power.get(self.nearest_bin(self.centers_hz[m]), t)
            }
        })
    }

    /// Mel power `[n_mels x frames]` back to linear power `[bins x frames]`.
    pub fn to_linear(&self, mel: &SpectrogramImage) -> SpectrogramImage {
        SpectrogramImage::from_fn(self.bins, mel.width, |k, t| {
            let (mut acc, mut norm) = (0.0f32, 0.0f32);
            for m in 0..self.n_mels {
                let w = self.weight(m, k);
                acc += w * mel.get(m, t);
                norm += w;
            }
            if norm > 0.0 {
                acc / norm
            } else {
                mel.get(self.nearest_band(self.bin_hz[k]), t)
            }
        })
    }
}

fn nearest(points: &[f64], hz: f64) -> usize {
    points
        .iter()
        .enumerate()
        .min_by(|a, b| (a.1 - hz).abs().total_cmp(&(b.1 - hz).abs()))
        .map_or(0, |(i, _)| i)
}
