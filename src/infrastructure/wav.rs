//! WAV reading and writing on top of hound.
//!
//! Samples are normalized to f32 in [-1.0, 1.0] on read and converted back to
//! the source sample format on write.

use crate::domain::entities::{EnhancedWaveform, Waveform};
use crate::domain::errors::AppError;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs;
use std::path::{Path, PathBuf};

/// Reads a WAV file, refusing it before decoding if its rate is not `expected_rate`.
pub fn read_waveform(path: &Path, expected_rate: u32) -> Result<(Waveform, WavSpec), AppError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    if spec.sample_rate != expected_rate {
        return Err(AppError::SampleRateMismatch {
            path: Some(path.to_path_buf()),
            expected: expected_rate,
            actual: spec.sample_rate,
        });
    }

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| f32::from(v) / 128.0))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| f32::from(v) / 32768.0))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8388608.0))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2147483648.0))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<_, _>>()?,
        (format, bits) => {
            return Err(AppError::UnsupportedFormat(format!(
                "{:?} {}-bit audio in {:?}",
                format, bits, path
            )));
        }
    };

    let waveform = Waveform::from_interleaved(&samples, usize::from(spec.channels), spec.sample_rate);
    Ok((waveform, spec))
}

/// Writes `waveform` with the layout of `source_spec`.
///
/// Data goes to a temporary sibling first and is renamed into place only once
/// complete, so a failure never leaves a truncated file at `path`.
pub fn write_waveform(
    path: &Path,
    waveform: &EnhancedWaveform,
    source_spec: WavSpec,
) -> Result<(), AppError> {
    let spec = WavSpec {
        channels: waveform.channels.len() as u16,
        sample_rate: waveform.sample_rate,
        ..source_spec
    };
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let result = write_samples(&partial, &waveform.interleaved(), spec)
        .and_then(|()| fs::rename(&partial, path).map_err(AppError::from));
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

fn write_samples(path: &Path, samples: &[f32], spec: WavSpec) -> Result<(), AppError> {
    let mut writer = WavWriter::create(path, spec)?;
    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => {
            for &s in samples {
                writer.write_sample(s)?;
            }
        }
        (SampleFormat::Int, 8) => {
            for &s in samples {
                writer.write_sample(quantize(s, 128.0) as i8)?;
            }
        }
        (SampleFormat::Int, 16) => {
            for &s in samples {
                writer.write_sample(quantize(s, 32768.0) as i16)?;
            }
        }
        (SampleFormat::Int, 24) => {
            for &s in samples {
                writer.write_sample(quantize(s, 8388608.0) as i32)?;
            }
        }
        (SampleFormat::Int, 32) => {
            for &s in samples {
                writer.write_sample(quantize(s, 2147483648.0) as i32)?;
            }
        }
        (format, bits) => {
            return Err(AppError::UnsupportedFormat(format!(
                "cannot write {:?} {}-bit audio",
                format, bits
            )));
        }
    }
    writer.finalize()?;
    Ok(())
}

fn quantize(sample: f32, full_scale: f64) -> i64 {
    let scaled = (f64::from(sample) * full_scale).round();
    scaled.clamp(-full_scale, full_scale - 1.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn float_spec(channels: u16, sample_rate: u32) -> WavSpec {
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        }
    }

    #[test]
    fn test_write_then_read_float() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let enhanced = EnhancedWaveform {
            channels: vec![vec![0.25, -0.5, 0.75], vec![0.0, 0.1, -0.1]],
            sample_rate: 16000,
            segment_count: 1,
        };
        write_waveform(&path, &enhanced, float_spec(2, 16000)).unwrap();

        let (wave, spec) = read_waveform(&path, 16000).unwrap();
        assert_eq!(spec.channels, 2);
        assert_eq!(wave.channels, enhanced.channels);
        assert!(!dir.path().join("stereo.wav.part").exists());
    }

    #[test]
    fn test_pcm16_roundtrip_within_quantization() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let enhanced = EnhancedWaveform {
            channels: vec![vec![0.5, -0.25, 1.5, -1.5]],
            sample_rate: 16000,
            segment_count: 1,
        };
        write_waveform(&path, &enhanced, spec).unwrap();

        let (wave, _) = read_waveform(&path, 16000).unwrap();
        let expected = [0.5, -0.25, 32767.0 / 32768.0, -1.0];
        for (a, b) in wave.channels[0].iter().zip(expected) {
            assert!((a - b).abs() < 1e-4, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_wrong_sample_rate_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("8k.wav");
        let enhanced = EnhancedWaveform {
            channels: vec![vec![0.1; 80]],
            sample_rate: 8000,
            segment_count: 1,
        };
        write_waveform(&path, &enhanced, float_spec(1, 8000)).unwrap();

        let err = read_waveform(&path, 16000).unwrap_err();
        assert!(matches!(
            err,
            AppError::SampleRateMismatch { expected: 16000, actual: 8000, .. }
        ));
    }
}
