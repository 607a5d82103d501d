//! Per-segment energy normalization.
//!
//! Each channel of a segment is scaled to unit mean power before it reaches
//! the model and scaled back by the same factor afterwards.

use crate::domain::errors::AppError;
use serde::{Deserialize, Serialize};

/// What to do with a channel segment that has no energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SilencePolicy {
    /// Copy the segment through unchanged and skip the model.
    #[default]
    Passthrough,
    /// Fail the file with `DegenerateSignal`.
    Error,
}

/// `sqrt(len / sum(x^2))`. `start` and `channel` only label the error.
pub fn compute_gain(samples: &[f32], start: usize, channel: usize) -> Result<f32, AppError> {
    let energy: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    let gain = (samples.len() as f64 / energy).sqrt() as f32;
    if energy == 0.0 || !gain.is_finite() || gain == 0.0 {
        return Err(AppError::DegenerateSignal { start, channel });
    }
    Ok(gain)
}

pub fn apply_gain(samples: &[f32], gain: f32) -> Vec<f32> {
    samples.iter().map(|&s| s * gain).collect()
}

pub fn remove_gain(samples: &mut [f32], gain: f32) {
    samples.iter_mut().for_each(|s| *s /= gain);
}
