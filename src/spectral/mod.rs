pub mod compression;
pub mod mel;
pub mod resize;
pub mod scaling;
pub mod stft;

use std::borrow::Cow;

/// Zero-pads the tail of `samples` up to `window_size`; longer input is borrowed as is.
pub fn pad_to_window(samples: &[f32], window_size: usize) -> Cow<'_, [f32]> {
    if samples.len() >= window_size {
        return Cow::Borrowed(samples);
    }
    let mut padded = Vec::with_capacity(window_size);
    padded.extend_from_slice(samples);
    padded.resize(window_size, 0.0);
    Cow::Owned(padded)
}
