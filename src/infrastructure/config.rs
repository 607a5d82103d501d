use crate::domain::errors::AppError;
use crate::preprocessing::normalizer::SilencePolicy;
use crate::spectral::compression::DEFAULT_COMPRESS_EXPONENT;
use crate::spectral::scaling::ScaleParams;
use crate::spectral::stft::{MAX_WINDOW_SIZE, WindowFunction, check_overlap};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub representation: RepresentationConfig,
    pub model: ModelConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_segment_len")]
    pub segment_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_hop_length")]
    pub hop_length: usize,
    #[serde(default)]
    pub window: WindowFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepresentationConfig {
    CompressedComplex {
        #[serde(default = "default_compress_exponent")]
        compress_exponent: f32,
    },
    Resize {
        #[serde(default = "default_target_dim")]
        target_height: usize,
        #[serde(default = "default_target_dim")]
        target_width: usize,
        #[serde(default)]
        mel_bins: Option<usize>,
        #[serde(default = "default_top_db")]
        top_db: f32,
        #[serde(default)]
        scale: ScaleParams,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelBackend {
    Torchscript,
    Identity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub backend: ModelBackend,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default)]
    pub half_precision: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub output_prefix: String,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub silence_policy: SilencePolicy,
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_segment_len() -> usize {
    16000
}

fn default_window_size() -> usize {
    400
}

fn default_hop_length() -> usize {
    100
}

fn default_compress_exponent() -> f32 {
    DEFAULT_COMPRESS_EXPONENT
}

fn default_target_dim() -> usize {
    128
}

fn default_top_db() -> f32 {
    80.0
}

fn default_device() -> String {
    "cuda_if_available".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["wav".to_string()]
}

fn default_show_progress() -> bool {
    true
}

impl Default for AudioConfig {
    fn default() -> Self {
        AudioConfig {
            sample_rate: default_sample_rate(),
            segment_len: default_segment_len(),
        }
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        TransformConfig {
            window_size: default_window_size(),
            hop_length: default_hop_length(),
            window: WindowFunction::default(),
        }
    }
}

impl Default for RepresentationConfig {
    fn default() -> Self {
        RepresentationConfig::CompressedComplex {
            compress_exponent: default_compress_exponent(),
        }
    }
}

fn invalid(msg: impl Into<String>) -> AppError {
    AppError::InvalidConfiguration(msg.into())
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let config_str = fs::read_to_string(path)?;
        Self::from_toml(&config_str)
    }

    pub fn from_toml(config_str: &str) -> Result<Self, AppError> {
        let config: Config = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.audio.sample_rate == 0 {
            return Err(invalid("audio.sample_rate must be positive"));
        }
        if self.audio.segment_len == 0 {
            return Err(invalid("audio.segment_len must be positive"));
        }
        let window = self.transform.window_size;
        if window < 2 || window > MAX_WINDOW_SIZE {
            return Err(invalid(format!(
                "transform.window_size must be in 2..={}",
                MAX_WINDOW_SIZE
            )));
        }
        check_overlap(window, self.transform.hop_length, self.transform.window)?;

        match &self.representation {
            RepresentationConfig::CompressedComplex { compress_exponent } => {
                if !(*compress_exponent > 0.0 && *compress_exponent <= 1.0) {
                    return Err(invalid("representation.compress_exponent must be in (0, 1]"));
                }
            }
            RepresentationConfig::Resize {
                target_height,
                target_width,
                mel_bins,
                top_db,
                scale,
            } => {
                if *target_height == 0 || *target_width == 0 {
                    return Err(invalid("representation target shape must be non-zero"));
                }
                if let Some(mels) = mel_bins {
                    let bins = window / 2 + 1;
                    if *mels == 0 || *mels > bins {
                        return Err(invalid(format!(
                            "representation.mel_bins must be in 1..={}",
                            bins
                        )));
                    }
                }
                if !(*top_db > 0.0) {
                    return Err(invalid("representation.top_db must be positive"));
                }
                if scale.in_scale == 0.0 {
                    return Err(invalid("representation.scale.in_scale must be non-zero"));
                }
            }
        }

        if self.model.backend == ModelBackend::Torchscript && self.model.path.is_none() {
            return Err(invalid("model.path is required for the torchscript backend"));
        }
        if self.batch.extensions.is_empty() {
            return Err(invalid("batch.extensions must list at least one extension"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [model]
        backend = "identity"

        [batch]
        input_dir = "noisy"
        output_dir = "enhanced"
    "#;

    #[test]
    fn test_defaults_match_reference_pipeline() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.segment_len, 16000);
        assert_eq!(config.transform.window_size, 400);
        assert_eq!(config.transform.hop_length, 100);
        assert_eq!(config.transform.window, WindowFunction::Hamming);
        assert_eq!(
            config.representation,
            RepresentationConfig::CompressedComplex { compress_exponent: 0.3 }
        );
        assert_eq!(config.batch.silence_policy, SilencePolicy::Passthrough);
        assert_eq!(config.batch.extensions, vec!["wav".to_string()]);
    }

    #[test]
    fn test_resize_representation() {
        let toml_str = r#"
            [transform]
            window_size = 255
            hop_length = 63
            window = "hann"

            [representation]
            kind = "resize"
            mel_bins = 64

            [model]
            backend = "torchscript"
            path = "weights/unet.pt"
            device = "cpu"

            [batch]
            input_dir = "noisy"
            output_dir = "filtered"
            output_prefix = "filtered_"
        "#;
        let config = Config::from_toml(toml_str).unwrap();
        match config.representation {
            RepresentationConfig::Resize {
                target_height,
                target_width,
                mel_bins,
                scale,
                ..
            } => {
                assert_eq!((target_height, target_width), (128, 128));
                assert_eq!(mel_bins, Some(64));
                assert_eq!(scale, ScaleParams::default());
            }
            other => panic!("unexpected representation {:?}", other),
        }
        assert_eq!(config.batch.output_prefix, "filtered_");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            "[audio]\nsegment_len = 0\n",
            "[transform]\nwindow_size = 400\nhop_length = 0\n",
            "[transform]\nwindow_size = 400\nhop_length = 800\n",
            "[transform]\nwindow_size = 400\nhop_length = 300\n",
            "[transform]\nwindow_size = 400\nhop_length = 400\nwindow = \"hann\"\n",
            "[representation]\nkind = \"compressed_complex\"\ncompress_exponent = 1.5\n",
            "[representation]\nkind = \"resize\"\ntarget_height = 0\n",
            "[representation]\nkind = \"resize\"\nmel_bins = 500\n",
        ];
        for case in cases {
            let toml_str = format!("{}\n{}", case, MINIMAL);
            let err = Config::from_toml(&toml_str).unwrap_err();
            assert!(
                matches!(err, AppError::InvalidConfiguration(_)),
                "{} -> {:?}",
                case,
                err
            );
        }
    }

    #[test]
    fn test_torchscript_requires_path() {
        let toml_str = MINIMAL.replace("\"identity\"", "\"torchscript\"");
        assert!(matches!(
            Config::from_toml(&toml_str),
            Err(AppError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_unknown_representation_is_parse_error() {
        let toml_str = format!("[representation]\nkind = \"wavelet\"\n{}", MINIMAL);
        assert!(matches!(Config::from_toml(&toml_str), Err(AppError::Config(_))));
    }
}
