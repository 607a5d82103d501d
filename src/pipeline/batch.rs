use crate::domain::errors::AppError;
use crate::infrastructure::config::{BatchConfig, Config};
use crate::infrastructure::wav::{read_waveform, write_waveform};
use crate::pipeline::enhancer::Enhancer;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Enhanced { samples: usize, channels: usize, segments: usize },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Enhanced { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.succeeded()
    }
}

#[derive(Serialize)]
struct RunManifest<'a> {
    tool: &'static str,
    version: &'static str,
    config: &'a Config,
    files: &'a [FileReport],
}

/// Enhances every matching file of a directory, one file at a time.
pub struct BatchProcessor<'a> {
    enhancer: &'a Enhancer,
    batch: &'a BatchConfig,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(enhancer: &'a Enhancer, batch: &'a BatchConfig) -> Self {
        BatchProcessor { enhancer, batch }
    }

    pub fn setup_output_dir(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.batch.output_dir)?;
        Ok(())
    }

    /// Input files in name order, filtered by extension.
    pub fn collect_inputs(&self) -> Result<Vec<PathBuf>, AppError> {
        let mut inputs = Vec::new();
        for entry in fs::read_dir(&self.batch.input_dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| {
                    self.batch
                        .extensions
                        .iter()
                        .any(|wanted| wanted.eq_ignore_ascii_case(ext))
                });
            if matches {
                inputs.push(path);
            }
        }
        inputs.sort();
        Ok(inputs)
    }

    pub fn output_path(&self, input: &Path) -> Result<PathBuf, AppError> {
        let name = input.file_name().and_then(|s| s.to_str()).ok_or_else(|| {
            AppError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid file name {:?}", input),
            ))
        })?;
        Ok(self
            .batch
            .output_dir
            .join(format!("{}{}", self.batch.output_prefix, name)))
    }

    /// Reads, enhances and writes a single file. Nothing is written on failure.
    pub fn process_file(&self, input: &Path, output: &Path) -> Result<FileStatus, AppError> {
        let (waveform, spec) = read_waveform(input, self.enhancer.sample_rate())?;
        let enhanced = self.enhancer.enhance(&waveform)?;
        drop(waveform);
        write_waveform(output, &enhanced, spec)?;
        Ok(FileStatus::Enhanced {
            samples: enhanced.len(),
            channels: enhanced.channels.len(),
            segments: enhanced.segment_count,
        })
    }

    /// Per-file errors are recorded and skipped; listing, output-directory and
    /// fatal errors abort the run.
    pub fn run(&self) -> Result<BatchReport, AppError> {
        self.setup_output_dir()?;
        let inputs = self.collect_inputs()?;
        info!(
            "Enhancing {} files from {:?} ({})",
            inputs.len(),
            self.batch.input_dir,
            self.enhancer.describe()
        );

        let pb = if self.batch.show_progress {
            ProgressBar::new(inputs.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .progress_chars("#>-"),
        );
        pb.set_message("Enhancing audio files");

        let mut report = BatchReport::default();
        for input in inputs {
            let output = self.output_path(&input)?;
            let status = match self.process_file(&input, &output) {
                Ok(status) => {
                    info!("Enhanced audio saved to {:?}", output);
                    status
                }
                Err(err) if err.is_fatal() => {
                    pb.abandon_with_message("Enhancement aborted");
                    return Err(err);
                }
                Err(err) => {
                    warn!("Skipping {:?}: {}", input, err);
                    FileStatus::Failed {
                        error: err.to_string(),
                    }
                }
            };
            report.files.push(FileReport {
                input,
                output,
                status,
            });
            pb.inc(1);
        }
        pb.finish_with_message("Enhancement completed!");
        Ok(report)
    }

    pub fn write_manifest(&self, config: &Config, report: &BatchReport) -> Result<PathBuf, AppError> {
        let manifest = RunManifest {
            tool: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            config,
            files: &report.files,
        };
        let json = serde_json::to_string_pretty(&manifest)?;
        let path = self.batch.output_dir.join(MANIFEST_FILE);
        let mut file = File::create(&path)?;
        file.write_all(json.as_bytes())?;
        Ok(path)
    }
}
