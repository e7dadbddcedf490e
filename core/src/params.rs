use crate::{Error, Intensity, Result, PIXEL_RANGE};

/// Parameters shared by every equalization mode.
///
/// The defaults reproduce the narrow output of the reference tool: the CDF is
/// scaled by 20 and the result clamped to `[1, 20]`. They are kept as
/// parameters because the range has no derivation behind it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualizeParams {
    /// Number of histogram bins `R`; every input intensity must be below it.
    pub levels: usize,
    /// Multiplier applied to `cdf[v]` before truncation.
    pub scale: f64,
    pub out_min: Intensity,
    pub out_max: Intensity,
}

impl Default for EqualizeParams {
    fn default() -> Self {
        Self {
            levels: PIXEL_RANGE,
            scale: 20.0,
            out_min: 1,
            out_max: 20,
        }
    }
}

impl EqualizeParams {
    pub fn with_levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_output_range(mut self, out_min: Intensity, out_max: Intensity) -> Self {
        self.out_min = out_min;
        self.out_max = out_max;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.levels == 0 {
            return Err(Error::InvalidConfig("levels must be >= 1".into()));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "scale must be a positive finite number, got {}",
                self.scale
            )));
        }
        if self.out_min > self.out_max {
            return Err(Error::InvalidConfig(format!(
                "output range [{}, {}] is empty",
                self.out_min, self.out_max
            )));
        }
        Ok(())
    }

    pub fn clamp(&self, value: Intensity) -> Intensity {
        value.clamp(self.out_min, self.out_max)
    }
}
