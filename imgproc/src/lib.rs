pub mod cdf;
pub mod equalize;
pub mod histogram;
pub mod partition;
pub mod remap;

pub use cdf::*;
pub use equalize::*;
pub use histogram::{accumulate, reduce, Histogram};
pub use partition::*;
pub use remap::*;

pub use heq_core::{Error, Result};
