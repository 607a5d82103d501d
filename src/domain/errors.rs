use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error(
        "Sample rate mismatch{}: expected {expected} Hz, got {actual} Hz",
        .path.as_ref().map(|p| format!(" in {:?}", p)).unwrap_or_default()
    )]
    SampleRateMismatch {
        path: Option<PathBuf>,
        expected: u32,
        actual: u32,
    },
    #[error("Degenerate signal: zero energy in segment starting at {start} (channel {channel})")]
    DegenerateSignal { start: usize, channel: usize },
    #[error("Model inference failed: {0}")]
    ModelInference(String),
    #[error("Model could not be loaded: {0}")]
    ModelLoad(String),
    #[error("Model output shape {actual:?} does not match expected {expected:?}")]
    ShapeMismatch {
        expected: [usize; 3],
        actual: [usize; 3],
    },
    #[error("Cancelled after {completed_segments} segments")]
    Cancelled { completed_segments: usize },
    #[error("Reconstruction failed: {0}")]
    Reconstruction(String),
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Progress template error: {0}")]
    Progress(#[from] indicatif::style::TemplateError),
    #[cfg(feature = "torch")]
    #[error("Torch error: {0}")]
    Torch(#[from] tch::TchError),
}

impl AppError {
    /// Errors that make the whole run pointless, as opposed to per-file failures.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::InvalidConfiguration(_) | AppError::ModelLoad(_) | AppError::Cancelled { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_mismatch_names_file_only_when_known() {
        let from_file = AppError::SampleRateMismatch {
            path: Some(PathBuf::from("noisy/a.wav")),
            expected: 16000,
            actual: 8000,
        };
        assert_eq!(
            from_file.to_string(),
            "Sample rate mismatch in \"noisy/a.wav\": expected 16000 Hz, got 8000 Hz"
        );

        let in_memory = AppError::SampleRateMismatch {
            path: None,
            expected: 16000,
            actual: 8000,
        };
        assert_eq!(
            in_memory.to_string(),
            "Sample rate mismatch: expected 16000 Hz, got 8000 Hz"
        );
    }

    #[test]
    fn test_reconstruction_errors_are_per_file() {
        assert!(!AppError::Reconstruction("segment out of order".into()).is_fatal());
        assert!(AppError::InvalidConfiguration("bad hop".into()).is_fatal());
    }
}
