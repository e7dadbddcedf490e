use crate::cdf::CdfTable;
use heq_core::{EqualizeParams, Error, Intensity, Result};

/// Rewrites `values` in place: `v -> clamp(floor(cdf[v] * scale), out_min, out_max)`.
pub fn remap(values: &mut [Intensity], cdf: &CdfTable, params: &EqualizeParams) -> Result<()> {
    let table = cdf.as_slice();
    for (index, v) in values.iter_mut().enumerate() {
        let Some(&c) = table.get(*v as usize) else {
            return Err(Error::RangeViolation {
                value: *v,
                index,
                levels: table.len(),
            });
        };
        *v = params.clamp((c * params.scale).floor() as Intensity);
    }
    Ok(())
}
