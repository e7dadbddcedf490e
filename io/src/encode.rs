//! Image encoding
//!
//! Output is written to a temporary file next to the target and renamed into
//! place, so a failed write leaves no partial image behind.

use crate::{Error, Result};
use heq_core::{EqualizeParams, IntensityBuffer};
use image::{GrayImage, ImageFormat};
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Clamp every value to `[out_min, out_max]` and pack it into 8-bit luma.
pub fn to_gray_image(buffer: &IntensityBuffer, params: &EqualizeParams) -> Result<GrayImage> {
    let bytes: Vec<u8> = buffer
        .as_slice()
        .iter()
        .map(|&v| params.clamp(v).min(u8::MAX as u32) as u8)
        .collect();

    GrayImage::from_raw(buffer.width(), buffer.height(), bytes).ok_or_else(|| {
        Error::DimensionMismatch(format!(
            "{}x{} buffer does not fit its pixel data",
            buffer.width(),
            buffer.height()
        ))
    })
}

/// Write `buffer` as a single-channel image; the format follows the extension.
pub fn encode<P: AsRef<Path>>(
    buffer: &IntensityBuffer,
    path: P,
    params: &EqualizeParams,
) -> Result<()> {
    let path = path.as_ref();
    let encode_err = |reason: String| Error::Encode {
        path: path.to_path_buf(),
        reason,
    };

    let format = ImageFormat::from_path(path).map_err(|e| encode_err(e.to_string()))?;
    let gray = to_gray_image(buffer, params)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir).map_err(|e| encode_err(e.to_string()))?;

    let mut writer = BufWriter::new(tmp);
    gray.write_to(&mut writer, format)
        .map_err(|e| encode_err(e.to_string()))?;
    writer.flush().map_err(|e| encode_err(e.to_string()))?;

    let tmp = writer
        .into_inner()
        .map_err(|e| encode_err(e.error().to_string()))?;
    tmp.persist(path).map_err(|e| encode_err(e.error.to_string()))?;

    tracing::debug!("Wrote {}", path.display());
    Ok(())
}
