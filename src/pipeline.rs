//! File-level driver: decode, equalize in one mode, encode.

use heq_core::{Error as CoreError, IntensityBuffer};
use heq_runtime::{Coordinator, Error, Mode, Result, RunReport};
use std::path::{Path, PathBuf};

/// Result of equalizing one input file in one mode.
#[derive(Debug)]
pub struct FileRun {
    pub output: PathBuf,
    pub report: RunReport,
    pub buffer: IntensityBuffer,
    /// Set when the write failed; the in-memory result is still valid.
    pub encode_error: Option<CoreError>,
}

/// `<output_dir>/<stem>_<mode>.png`
pub fn output_path(output_dir: &Path, input: &Path, mode: Mode) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output_dir.join(format!("{}_{}.png", stem, mode.label()))
}

/// Decode `input`, equalize it with `mode` and write the result to `output`.
///
/// A decode failure returns before the worker group is touched.
pub fn equalize_file(
    coordinator: &Coordinator,
    mode: Mode,
    input: &Path,
    output: &Path,
) -> Result<FileRun> {
    let mut buffer = heq_io::decode(input)?;
    let report = coordinator.run(mode, &mut buffer)?;

    let encode_error = match heq_io::encode(&buffer, output, coordinator.params()) {
        Ok(()) => {
            tracing::info!("Result image saved: {}", output.display());
            None
        }
        Err(e) => {
            tracing::error!("{}", e);
            Some(e)
        }
    };

    Ok(FileRun {
        output: output.to_path_buf(),
        report,
        buffer,
        encode_error,
    })
}

/// Index of the first element where the two buffers differ.
pub fn first_mismatch(a: &IntensityBuffer, b: &IntensityBuffer) -> Option<usize> {
    if a.width() != b.width() || a.height() != b.height() {
        return Some(0);
    }
    a.as_slice()
        .iter()
        .zip(b.as_slice())
        .position(|(x, y)| x != y)
}

pub fn is_decode_failure(err: &Error) -> bool {
    matches!(err, Error::Core(CoreError::Decode { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_labels_mode() {
        let p = output_path(Path::new("out"), Path::new("in/girl.jpg"), Mode::Distributed);
        assert_eq!(p, PathBuf::from("out/girl_parallel.png"));
        let p = output_path(Path::new("out"), Path::new("girl.jpg"), Mode::Reference);
        assert_eq!(p, PathBuf::from("out/girl_sequential.png"));
    }

    #[test]
    fn test_first_mismatch() {
        let a = IntensityBuffer::from_vec(3, 1, vec![1, 2, 3]).unwrap();
        let mut b = a.clone();
        assert_eq!(first_mismatch(&a, &b), None);
        b.set(2, 0, 9);
        assert_eq!(first_mismatch(&a, &b), Some(2));
    }
}
