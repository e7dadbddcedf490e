use heq_core::{Error, Intensity, Result};

/// Occurrence count per intensity over some buffer or chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    counts: Vec<u64>,
}

impl Histogram {
    pub fn new(levels: usize) -> Self {
        Self {
            counts: vec![0; levels],
        }
    }

    pub fn from_counts(counts: Vec<u64>) -> Self {
        Self { counts }
    }

    pub fn levels(&self) -> usize {
        self.counts.len()
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn count(&self, value: Intensity) -> u64 {
        self.counts.get(value as usize).copied().unwrap_or(0)
    }

    /// Number of elements counted.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Adds `other` bin by bin.
    pub fn merge(&mut self, other: &Histogram) -> Result<()> {
        if other.levels() != self.levels() {
            return Err(Error::DimensionMismatch(format!(
                "cannot merge a {}-bin histogram into a {}-bin one",
                other.levels(),
                self.levels()
            )));
        }
        for (dst, src) in self.counts.iter_mut().zip(&other.counts) {
            *dst += src;
        }
        Ok(())
    }
}

/// Counts each value of `values` into a fresh `levels`-bin histogram.
///
/// Values at or above `levels` are rejected rather than clamped, so a corrupt
/// buffer never silently skews the distribution.
pub fn accumulate(values: &[Intensity], levels: usize) -> Result<Histogram> {
    let mut hist = Histogram::new(levels);
    for (index, &value) in values.iter().enumerate() {
        match hist.counts.get_mut(value as usize) {
            Some(bin) => *bin += 1,
            None => {
                return Err(Error::RangeViolation {
                    value,
                    index,
                    levels,
                })
            }
        }
    }
    Ok(hist)
}

/// Sums histograms elementwise. The result does not depend on input order.
pub fn reduce<'a, I>(histograms: I) -> Result<Histogram>
where
    I: IntoIterator<Item = &'a Histogram>,
{
    let mut iter = histograms.into_iter();
    let mut global = match iter.next() {
        Some(first) => first.clone(),
        None => {
            return Err(Error::DimensionMismatch(
                "cannot reduce an empty set of histograms".into(),
            ))
        }
    };
    for hist in iter {
        global.merge(hist)?;
    }
    Ok(global)
}
