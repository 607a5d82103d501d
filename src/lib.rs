//! Segment-wise speech enhancement.
//!
//! A recording is cut into fixed-length segments; each segment is
//! energy-normalized, transformed into a spectral representation, passed
//! through an [`EnhancementModel`](inference::model::EnhancementModel),
//! transformed back, de-normalized and concatenated in order.

pub mod domain;
pub mod inference;
pub mod infrastructure;
pub mod pipeline;
pub mod preprocessing;
pub mod spectral;

pub use domain::entities::{EnhancedWaveform, Segment, SegmentSpan, Waveform};
pub use domain::errors::AppError;
pub use infrastructure::config::Config;
pub use pipeline::batch::{BatchProcessor, BatchReport};
pub use pipeline::enhancer::Enhancer;
