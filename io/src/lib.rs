//! Image file I/O for intensity buffers
//!
//! - `decode`: any format the `image` crate reads, averaged to one intensity per pixel
//! - `encode`: single-channel 8-bit output, clamped to the configured range

pub mod decode;
pub mod encode;

pub use decode::{decode, intensity_from_rgb};
pub use encode::{encode, to_gray_image};

pub use heq_core::{Error, Result};
