pub mod buffer;
pub mod params;

pub use buffer::*;
pub use params::*;

use std::path::PathBuf;

/// Scalar luminance value of one pixel.
pub type Intensity = u32;

/// Number of distinct intensities produced by 8-bit decoding.
pub const PIXEL_RANGE: usize = 256;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot load image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("cannot write image {path}: {reason}")]
    Encode { path: PathBuf, reason: String },

    #[error("intensity {value} at index {index} is outside [0, {levels})")]
    RangeViolation {
        value: Intensity,
        index: usize,
        levels: usize,
    },

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("histogram counted {counted} elements, expected {expected}")]
    CountMismatch { counted: u64, expected: u64 },

    #[error("image has no pixels")]
    EmptyImage,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
