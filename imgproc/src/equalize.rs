use crate::cdf::CdfTable;
use crate::histogram::{accumulate, Histogram};
use crate::remap::remap;
use heq_core::{EqualizeParams, IntensityBuffer, Result};

/// Intermediate products of one equalization run.
#[derive(Debug, Clone, PartialEq)]
pub struct EqualizeReport {
    pub histogram: Histogram,
    pub cdf: CdfTable,
}

/// Single-worker equalization over the whole buffer.
///
/// Runs histogram, CDF and remap with no partitioning. Used as the oracle the
/// distributed coordinator is checked against.
pub fn equalize_reference(
    buffer: &mut IntensityBuffer,
    params: &EqualizeParams,
) -> Result<EqualizeReport> {
    params.validate()?;

    let histogram = accumulate(buffer.as_slice(), params.levels)?;
    let cdf = CdfTable::build(&histogram, buffer.len() as u64)?;
    remap(buffer.as_mut_slice(), &cdf, params)?;

    Ok(EqualizeReport { histogram, cdf })
}

#[cfg(test)]
mod tests {
    use super::*;
    use heq_core::Error;

    #[test]
    fn test_reference_small_scenario() {
        let mut buf = IntensityBuffer::from_vec(4, 1, vec![0, 0, 1, 3]).unwrap();
        let params = EqualizeParams::default().with_levels(4);
        let report = equalize_reference(&mut buf, &params).unwrap();

        assert_eq!(report.histogram.counts(), &[2, 1, 0, 1]);
        assert_eq!(report.cdf.as_slice(), &[0.5, 0.75, 0.75, 1.0]);
        assert_eq!(buf.as_slice(), &[10, 10, 15, 20]);
    }

    #[test]
    fn test_reference_leaves_buffer_on_range_violation() {
        let mut buf = IntensityBuffer::from_vec(3, 1, vec![1, 2, 300]).unwrap();
        let err = equalize_reference(&mut buf, &EqualizeParams::default()).unwrap_err();
        assert!(matches!(err, Error::RangeViolation { value: 300, .. }));
        assert_eq!(buf.as_slice(), &[1, 2, 300]);
    }

    #[test]
    fn test_reference_empty_image() {
        let mut buf = IntensityBuffer::new(0, 0);
        assert!(matches!(
            equalize_reference(&mut buf, &EqualizeParams::default()),
            Err(Error::EmptyImage)
        ));
    }
}
