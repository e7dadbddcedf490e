//! Image decoding
//!
//! Intensity is the unweighted mean of the three color channels, truncated.

use crate::{Error, Result};
use heq_core::{Intensity, IntensityBuffer};
use image::RgbImage;
use std::path::Path;

/// Read an image file into a flat intensity buffer.
pub fn decode<P: AsRef<Path>>(path: P) -> Result<IntensityBuffer> {
    let path = path.as_ref();
    let decode_err = |reason: String| Error::Decode {
        path: path.to_path_buf(),
        reason,
    };

    let img = image::open(path).map_err(|e| decode_err(e.to_string()))?;
    let rgb = img.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(decode_err("image has no pixels".into()));
    }

    tracing::debug!(
        "Decoded {} ({}x{})",
        path.display(),
        rgb.width(),
        rgb.height()
    );
    intensity_from_rgb(&rgb)
}

/// Convert an RGB image to intensities with `(r + g + b) / 3`.
pub fn intensity_from_rgb(rgb: &RgbImage) -> Result<IntensityBuffer> {
    let values = rgb
        .pixels()
        .map(|p| (p[0] as Intensity + p[1] as Intensity + p[2] as Intensity) / 3)
        .collect();
    IntensityBuffer::from_vec(rgb.width(), rgb.height(), values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_channel_average_truncates() {
        let mut rgb = RgbImage::new(2, 1);
        rgb.put_pixel(0, 0, Rgb([255, 255, 255]));
        rgb.put_pixel(1, 0, Rgb([1, 1, 2]));
        let buf = intensity_from_rgb(&rgb).unwrap();
        assert_eq!(buf.as_slice(), &[255, 1]);
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let err = decode("/non/existent/input.png").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }
}
