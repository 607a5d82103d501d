use crate::domain::entities::{EnhancedWaveform, SegmentSpan};
use crate::domain::errors::AppError;

/// Positional concatenation of enhanced segments.
#[derive(Debug)]
pub struct Assembler {
    channels: Vec<Vec<f32>>,
    expected_len: usize,
    segments: usize,
}

impl Assembler {
    pub fn new(channel_count: usize, expected_len: usize) -> Self {
        Assembler {
            channels: vec![Vec::with_capacity(expected_len); channel_count],
            expected_len,
            segments: 0,
        }
    }

    /// Next assembled position; the following segment must start here.
    pub fn position(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn push(&mut self, span: SegmentSpan, channels: Vec<Vec<f32>>) -> Result<(), AppError> {
        if span.start != self.position() {
            return Err(AppError::Reconstruction(format!(
                "segment {} starts at {} but assembly is at {}",
                span.index,
                span.start,
                self.position()
            )));
        }
        if channels.len() != self.channels.len() || channels.iter().any(|c| c.len() != span.len) {
            return Err(AppError::Reconstruction(format!(
                "segment {} does not match its span of {} samples over {} channels",
                span.index,
                span.len,
                self.channels.len()
            )));
        }
        for (out, chunk) in self.channels.iter_mut().zip(channels) {
            out.extend(chunk);
        }
        self.segments += 1;
        Ok(())
    }

    pub fn finish(self, sample_rate: u32) -> Result<EnhancedWaveform, AppError> {
        if self.position() != self.expected_len {
            return Err(AppError::Reconstruction(format!(
                "assembled {} samples, expected {}",
                self.position(),
                self.expected_len
            )));
        }
        Ok(EnhancedWaveform {
            channels: self.channels,
            sample_rate,
            segment_count: self.segments,
        })
    }
}
