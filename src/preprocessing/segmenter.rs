use crate::domain::entities::{Segment, SegmentSpan, Waveform};
use crate::domain::errors::AppError;

/// Splits a waveform into consecutive fixed-length chunks; the last one may be shorter.
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    segment_len: usize,
}

impl Segmenter {
    pub fn new(segment_len: usize) -> Result<Self, AppError> {
        if segment_len == 0 {
            return Err(AppError::InvalidConfiguration(
                "segment_len must be positive".into(),
            ));
        }
        Ok(Segmenter { segment_len })
    }

    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    /// Spans covering `[0, total_len)`. Each call starts a fresh iterator.
    pub fn spans(&self, total_len: usize) -> Spans {
        Spans {
            segment_len: self.segment_len,
            total_len,
            next_start: 0,
            index: 0,
        }
    }

    pub fn split<'a>(self, waveform: &'a Waveform) -> impl Iterator<Item = Segment<'a>> + 'a {
        self.spans(waveform.len()).map(move |span| waveform.segment(span))
    }

    pub fn segment_count(&self, total_len: usize) -> usize {
        total_len.div_ceil(self.segment_len)
    }
}

#[derive(Debug, Clone)]
pub struct Spans {
    segment_len: usize,
    total_len: usize,
    next_start: usize,
    index: usize,
}

impl Iterator for Spans {
    type Item = SegmentSpan;

    fn next(&mut self) -> Option<SegmentSpan> {
        if self.next_start >= self.total_len {
            return None;
        }
        let start = self.next_start;
        let end = (start + self.segment_len).min(self.total_len);
        let span = SegmentSpan {
            index: self.index,
            start,
            len: end - start,
        };
        self.next_start = end;
        self.index += 1;
        Some(span)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total_len - self.next_start.min(self.total_len)).div_ceil(self.segment_len);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Spans {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    #[test]
    fn test_five_seconds_in_one_second_chunks() {
        let segmenter = Segmenter::new(16000).unwrap();
        let lens: Vec<usize> = segmenter.spans(80000).map(|s| s.len).collect();
        assert_eq!(lens, vec![16000; 5]);
    }

    #[test]
    fn test_final_segment_is_short() {
        let segmenter = Segmenter::new(24000).unwrap();
        let spans: Vec<SegmentSpan> = segmenter.spans(80000).collect();
        let lens: Vec<usize> = spans.iter().map(|s| s.len).collect();
        assert_eq!(lens, vec![24000, 24000, 24000, 8000]);
        assert_eq!(spans[3].start, 72000);
        assert_eq!(segmenter.segment_count(80000), 4);
    }

    #[test]
    fn test_zero_length_rejected() {
        assert!(matches!(
            Segmenter::new(0),
            Err(AppError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_empty_waveform_has_no_segments() {
        let segmenter = Segmenter::new(100).unwrap();
        assert_eq!(segmenter.spans(0).count(), 0);
    }

    #[test]
    fn test_segments_reassemble_exactly() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let total = rng.random_range(1..5000);
            let seg_len = rng.random_range(1..700);
            let samples: Vec<f32> = (0..total).map(|_| rng.random_range(-1.0..1.0)).collect();
            let wave = Waveform::mono(samples.clone(), 16000);
            let segmenter = Segmenter::new(seg_len).unwrap();

            let mut rebuilt = Vec::new();
            let mut expected_start = 0;
            for segment in segmenter.split(&wave) {
                assert_eq!(segment.span.start, expected_start);
                assert!(segment.len() <= seg_len && !segment.is_empty());
                rebuilt.extend_from_slice(segment.channels[0]);
                expected_start = segment.span.end();
            }
            assert_eq!(rebuilt, samples);
        }
    }

    #[test]
    fn test_spans_are_restartable() {
        let segmenter = Segmenter::new(7).unwrap();
        let first: Vec<SegmentSpan> = segmenter.spans(30).collect();
        let second: Vec<SegmentSpan> = segmenter.spans(30).collect();
        assert_eq!(first, second);
        assert_eq!(segmenter.spans(30).len(), 5);
    }
}
