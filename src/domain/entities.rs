/// Planar multi-channel audio at a fixed sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Waveform { channels, sample_rate }
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Waveform { channels: vec![samples], sample_rate }
    }

    /// Splits interleaved frames (`L R L R ...`) into one buffer per channel.
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Self {
        let channel_count = channel_count.max(1);
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Waveform { channels, sample_rate }
    }

    /// Number of samples per channel.
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn segment(&self, span: SegmentSpan) -> Segment<'_> {
        Segment {
            span,
            channels: self
                .channels
                .iter()
                .map(|c| &c[span.start..span.end()])
                .collect(),
        }
    }
}

/// Position of a segment inside its waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentSpan {
    pub index: usize,
    pub start: usize,
    pub len: usize,
}

impl SegmentSpan {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Borrowed view of one chunk of every channel.
#[derive(Debug, Clone)]
pub struct Segment<'a> {
    pub span: SegmentSpan,
    pub channels: Vec<&'a [f32]>,
}

impl Segment<'_> {
    pub fn len(&self) -> usize {
        self.span.len
    }

    pub fn is_empty(&self) -> bool {
        self.span.len == 0
    }
}

/// Output of the pipeline for a single input file.
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancedWaveform {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
    pub segment_count: usize,
}

impl EnhancedWaveform {
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn interleaved(&self) -> Vec<f32> {
        let frames = self.len();
        let mut out = Vec::with_capacity(frames * self.channels.len());
        for i in 0..frames {
            for channel in &self.channels {
                out.push(channel[i]);
            }
        }
        out
    }
}
