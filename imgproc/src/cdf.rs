use crate::histogram::Histogram;
use heq_core::{Error, Intensity, Result};

/// Cumulative distribution of a global histogram; the equalization lookup table.
#[derive(Debug, Clone, PartialEq)]
pub struct CdfTable {
    table: Vec<f64>,
}

impl CdfTable {
    /// Builds the table from the histogram of the whole image.
    ///
    /// `total` is the element count of the full image, never of one chunk:
    /// a CDF built from a partial histogram describes the wrong distribution.
    pub fn build(histogram: &Histogram, total: u64) -> Result<Self> {
        let probabilities = probabilities(histogram, total)?;

        let mut table = Vec::with_capacity(probabilities.len());
        let mut running = 0.0;
        for p in probabilities {
            running += p;
            table.push(running);
        }
        Ok(Self { table })
    }

    pub fn from_table(table: Vec<f64>) -> Self {
        Self { table }
    }

    pub fn levels(&self) -> usize {
        self.table.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.table
    }

    pub fn get(&self, value: Intensity) -> Option<f64> {
        self.table.get(value as usize).copied()
    }
}

/// `histogram[i] / total` for every bin.
pub fn probabilities(histogram: &Histogram, total: u64) -> Result<Vec<f64>> {
    if total == 0 {
        return Err(Error::EmptyImage);
    }
    let counted = histogram.total();
    if counted != total {
        return Err(Error::CountMismatch {
            counted,
            expected: total,
        });
    }

    let denom = total as f64;
    Ok(histogram
        .counts()
        .iter()
        .map(|&c| c as f64 / denom)
        .collect())
}
