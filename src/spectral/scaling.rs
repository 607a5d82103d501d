use serde::{Deserialize, Serialize};

const AMIN_POWER: f32 = 1e-10;

/// Affine maps between dB values and the model's input/output ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    #[serde(default = "default_in_offset")]
    pub in_offset: f32,
    #[serde(default = "default_in_scale")]
    pub in_scale: f32,
    #[serde(default = "default_out_scale")]
    pub out_scale: f32,
    #[serde(default = "default_out_offset")]
    pub out_offset: f32,
}

fn default_in_offset() -> f32 {
    46.0
}

fn default_in_scale() -> f32 {
    50.0
}

fn default_out_scale() -> f32 {
    82.0
}

fn default_out_offset() -> f32 {
    6.0
}

impl Default for ScaleParams {
    fn default() -> Self {
        ScaleParams {
            in_offset: default_in_offset(),
            in_scale: default_in_scale(),
            out_scale: default_out_scale(),
            out_offset: default_out_offset(),
        }
    }
}

impl ScaleParams {
    pub fn scale_in(&self, db: f32) -> f32 {
        (db + self.in_offset) / self.in_scale
    }

    pub fn inverse_scale_out(&self, value: f32) -> f32 {
        value * self.out_scale + self.out_offset
    }
}

/// Power values in dB relative to their maximum, floored at `max - top_db`.
/// Returns the dB values and the reference power needed to undo the conversion.
pub fn power_to_db(power: &[f32], top_db: f32) -> (Vec<f32>, f32) {
    let reference = power.iter().copied().fold(AMIN_POWER, f32::max);
    let ref_db = 10.0 * reference.log10();
    let db: Vec<f32> = power
        .iter()
        .map(|&p| 10.0 * p.max(AMIN_POWER).log10() - ref_db)
        .collect();
    let floor = db.iter().copied().fold(f32::NEG_INFINITY, f32::max) - top_db;
    (db.into_iter().map(|v| v.max(floor)).collect(), reference)
}

pub fn db_to_power(db: &[f32], reference: f32) -> Vec<f32> {
    db.iter().map(|&v| reference * 10f32.powf(v / 10.0)).collect()
}
