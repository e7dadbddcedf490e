use crate::{Error, Intensity, Result};

/// Row-major grayscale pixels, owned by exactly one pipeline stage at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntensityBuffer {
    width: u32,
    height: u32,
    values: Vec<Intensity>,
}

impl IntensityBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            values: vec![0; width as usize * height as usize],
        }
    }

    pub fn from_vec(width: u32, height: u32, values: Vec<Intensity>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(Error::DimensionMismatch(format!(
                "{}x{} buffer needs {} values, got {}",
                width,
                height,
                expected,
                values.len()
            )));
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, x: u32, y: u32) -> Intensity {
        self.values[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: Intensity) {
        self.values[y as usize * self.width as usize + x as usize] = value;
    }

    pub fn as_slice(&self) -> &[Intensity] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [Intensity] {
        &mut self.values
    }

    pub fn into_vec(self) -> Vec<Intensity> {
        self.values
    }

    /// Largest stored value, or `None` for an empty buffer.
    pub fn max_value(&self) -> Option<Intensity> {
        self.values.iter().copied().max()
    }
}
