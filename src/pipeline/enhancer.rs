use crate::domain::entities::{EnhancedWaveform, Waveform};
use crate::domain::errors::AppError;
use crate::inference::model::EnhancementModel;
use crate::infrastructure::config::{Config, RepresentationConfig};
use crate::pipeline::assembler::Assembler;
use crate::pipeline::strategy::{CompressedComplexStrategy, ResizeStrategy, SpectralStrategy};
use crate::preprocessing::normalizer::{SilencePolicy, apply_gain, compute_gain, remove_gain};
use crate::preprocessing::segmenter::Segmenter;
use crate::spectral::mel::MelFilterbank;
use crate::spectral::stft::Stft;
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Runs one waveform through segment, normalize, model, denormalize and assemble.
pub struct Enhancer {
    segmenter: Segmenter,
    strategy: Box<dyn SpectralStrategy>,
    model: Box<dyn EnhancementModel>,
    silence_policy: SilencePolicy,
    sample_rate: u32,
    cancel: Option<Arc<AtomicBool>>,
}

impl Enhancer {
    pub fn new(
        segmenter: Segmenter,
        strategy: Box<dyn SpectralStrategy>,
        model: Box<dyn EnhancementModel>,
        silence_policy: SilencePolicy,
        sample_rate: u32,
    ) -> Self {
        Enhancer {
            segmenter,
            strategy,
            model,
            silence_policy,
            sample_rate,
            cancel: None,
        }
    }

    pub fn from_config(config: &Config, model: Box<dyn EnhancementModel>) -> Result<Self, AppError> {
        config.validate()?;
        let stft = Stft::new(
            config.transform.window_size,
            config.transform.hop_length,
            config.transform.window,
        )?;
        let strategy: Box<dyn SpectralStrategy> = match &config.representation {
            RepresentationConfig::CompressedComplex { compress_exponent } => {
                Box::new(CompressedComplexStrategy::new(stft, *compress_exponent))
            }
            RepresentationConfig::Resize {
                target_height,
                target_width,
                mel_bins,
                top_db,
                scale,
            } => {
                let mel = mel_bins.map(|n| {
                    MelFilterbank::new(config.audio.sample_rate, config.transform.window_size, n)
                });
                Box::new(ResizeStrategy::new(
                    stft,
                    (*target_height, *target_width),
                    mel,
                    *top_db,
                    *scale,
                ))
            }
        };
        Ok(Enhancer::new(
            Segmenter::new(config.audio.segment_len)?,
            strategy,
            model,
            config.batch.silence_policy,
            config.audio.sample_rate,
        ))
    }

    /// Checked before every segment; once set, processing stops with `Cancelled`.
    ///
    /// Library callers own the flag. The `segenhance` binary never sets one, so
    /// a batch run there always goes to completion.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn describe(&self) -> String {
        format!(
            "{} representation, {} model, {}-sample segments",
            self.strategy.name(),
            self.model.name(),
            self.segmenter.segment_len()
        )
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    pub fn enhance(&self, waveform: &Waveform) -> Result<EnhancedWaveform, AppError> {
        if waveform.sample_rate != self.sample_rate {
            return Err(AppError::SampleRateMismatch {
                path: None,
                expected: self.sample_rate,
                actual: waveform.sample_rate,
            });
        }

        let mut assembler = Assembler::new(waveform.channel_count(), waveform.len());
        for segment in self.segmenter.split(waveform) {
            if self.cancelled() {
                return Err(AppError::Cancelled {
                    completed_segments: segment.span.index,
                });
            }

            // Per-segment buffers live only inside this block.
            let enhanced = segment
                .channels
                .iter()
                .enumerate()
                .map(|(channel, samples)| {
                    self.enhance_channel(samples, segment.span.start, channel)
                })
                .collect::<Result<Vec<_>, _>>()?;
            assembler.push(segment.span, enhanced)?;
        }
        assembler.finish(waveform.sample_rate)
    }

    fn enhance_channel(
        &self,
        samples: &[f32],
        start: usize,
        channel: usize,
    ) -> Result<Vec<f32>, AppError> {
        let gain = match compute_gain(samples, start, channel) {
            Ok(gain) => gain,
            Err(err @ AppError::DegenerateSignal { .. }) => match self.silence_policy {
                SilencePolicy::Passthrough => {
                    warn!(
                        "silent segment at sample {} (channel {}), passing through",
                        start, channel
                    );
                    return Ok(samples.to_vec());
                }
                SilencePolicy::Error => return Err(err),
            },
            Err(err) => return Err(err),
        };
        debug!(
            "segment at {} (channel {}): {} samples, gain {:.4}",
            start,
            channel,
            samples.len(),
            gain
        );

        let normalized = apply_gain(samples, gain);
        let mut enhanced = self
            .strategy
            .enhance_segment(&normalized, self.model.as_ref())?;
        remove_gain(&mut enhanced, gain);
        Ok(enhanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::model::{IdentityModel, ModelTensor};
    use crate::spectral::stft::WindowFunction;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;
    use std::cell::Cell;
    use std::rc::Rc;

    fn noise(len: usize, seed: u64, amplitude: f32) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len).map(|_| rng.random_range(-amplitude..amplitude)).collect()
    }

    fn enhancer(segment_len: usize, model: Box<dyn EnhancementModel>, policy: SilencePolicy) -> Enhancer {
        let stft = Stft::new(400, 100, WindowFunction::Hamming).unwrap();
        Enhancer::new(
            Segmenter::new(segment_len).unwrap(),
            Box::new(CompressedComplexStrategy::new(stft, 0.3)),
            model,
            policy,
            16000,
        )
    }

    struct FailingModel;

    impl EnhancementModel for FailingModel {
        fn enhance(&self, _input: &ModelTensor) -> Result<ModelTensor, AppError> {
            Err(AppError::ModelInference("device lost".into()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    /// Counts calls so tests can see which segments reached the model.
    struct CountingModel(Rc<Cell<usize>>);

    impl EnhancementModel for CountingModel {
        fn enhance(&self, input: &ModelTensor) -> Result<ModelTensor, AppError> {
            self.0.set(self.0.get() + 1);
            Ok(input.clone())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[test]
    fn test_length_preserved_with_short_tail() {
        let samples = noise(80000, 1, 0.3);
        let wave = Waveform::mono(samples.clone(), 16000);
        let out = enhancer(24000, Box::new(IdentityModel), SilencePolicy::Passthrough)
            .enhance(&wave)
            .unwrap();
        assert_eq!(out.len(), 80000);
        assert_eq!(out.segment_count, 4);
        let err = samples
            .iter()
            .zip(&out.channels[0])
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(err < 1e-3, "max error {}", err);
    }

    #[test]
    fn test_tail_shorter_than_window() {
        let wave = Waveform::mono(noise(16123, 2, 0.5), 16000);
        let out = enhancer(16000, Box::new(IdentityModel), SilencePolicy::Passthrough)
            .enhance(&wave)
            .unwrap();
        assert_eq!(out.len(), 16123);
        assert_eq!(out.segment_count, 2);
    }

    #[test]
    fn test_multichannel_keeps_channels_apart() {
        let left = noise(5000, 3, 0.1);
        let right = noise(5000, 4, 0.8);
        let wave = Waveform::new(vec![left.clone(), right.clone()], 16000);
        let out = enhancer(2048, Box::new(IdentityModel), SilencePolicy::Passthrough)
            .enhance(&wave)
            .unwrap();
        assert_eq!(out.channels.len(), 2);
        for (input, output) in [left, right].iter().zip(&out.channels) {
            let err = input
                .iter()
                .zip(output)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0f32, f32::max);
            assert!(err < 1e-3);
        }
    }

    #[test]
    fn test_silent_segment_passes_through_without_model() {
        let mut samples = noise(3000, 5, 0.5);
        samples.extend(std::iter::repeat_n(0.0, 1000));
        let wave = Waveform::mono(samples, 16000);

        let calls = Rc::new(Cell::new(0));
        let out = enhancer(
            1000,
            Box::new(CountingModel(calls.clone())),
            SilencePolicy::Passthrough,
        )
        .enhance(&wave)
        .unwrap();
        assert_eq!(calls.get(), 3);
        assert_eq!(out.len(), 4000);
        assert!(out.channels[0][3000..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_silent_segment_errors_under_strict_policy() {
        let wave = Waveform::mono(vec![0.0; 2000], 16000);
        let err = enhancer(1000, Box::new(IdentityModel), SilencePolicy::Error)
            .enhance(&wave)
            .unwrap_err();
        assert!(matches!(err, AppError::DegenerateSignal { start: 0, channel: 0 }));
    }

    #[test]
    fn test_model_failure_surfaces() {
        let wave = Waveform::mono(noise(4000, 6, 0.5), 16000);
        let err = enhancer(1000, Box::new(FailingModel), SilencePolicy::Passthrough)
            .enhance(&wave)
            .unwrap_err();
        assert!(matches!(err, AppError::ModelInference(_)));
    }

    #[test]
    fn test_enhancer_is_reusable_after_failure() {
        let enhancer = enhancer(1000, Box::new(IdentityModel), SilencePolicy::Error);
        assert!(enhancer.enhance(&Waveform::mono(vec![0.0; 1000], 16000)).is_err());
        let out = enhancer
            .enhance(&Waveform::mono(noise(2500, 7, 0.5), 16000))
            .unwrap();
        assert_eq!(out.len(), 2500);
    }

    #[test]
    fn test_cancel_flag_stops_between_segments() {
        let flag = Arc::new(AtomicBool::new(true));
        let enhancer = enhancer(1000, Box::new(IdentityModel), SilencePolicy::Passthrough)
            .with_cancel_flag(flag.clone());
        let wave = Waveform::mono(noise(4000, 8, 0.5), 16000);
        let err = enhancer.enhance(&wave).unwrap_err();
        assert!(matches!(err, AppError::Cancelled { completed_segments: 0 }));

        flag.store(false, Ordering::Relaxed);
        assert!(enhancer.enhance(&wave).is_ok());
    }

    #[test]
    fn test_wrong_sample_rate_rejected() {
        let wave = Waveform::mono(noise(1000, 9, 0.5), 8000);
        let err = enhancer(1000, Box::new(IdentityModel), SilencePolicy::Passthrough)
            .enhance(&wave)
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::SampleRateMismatch { path: None, actual: 8000, .. }
        ));
    }

    #[test]
    fn test_from_config_builds_resize_variant() {
        let config = Config::from_toml(
            r#"
            [transform]
            window_size = 255
            hop_length = 63
            window = "hann"

            [representation]
            kind = "resize"

            [model]
            backend = "identity"

            [batch]
            input_dir = "in"
            output_dir = "out"
            "#,
        )
        .unwrap();
        let enhancer = Enhancer::from_config(&config, Box::new(IdentityModel)).unwrap();
        assert!(enhancer.describe().starts_with("resize"));
        let out = enhancer
            .enhance(&Waveform::mono(noise(20000, 10, 0.5), 16000))
            .unwrap();
        assert_eq!(out.len(), 20000);
    }
}
