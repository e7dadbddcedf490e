mod shared_memory;

pub use shared_memory::{ThreadComm, World};

use crate::Result;
use heq_core::Intensity;
use heq_imgproc::{ChunkPlan, Histogram};

/// Rank of the coordinator: the only worker that plans, reduces and does I/O.
pub const ROOT: usize = 0;

/// Synchronous collectives over a fixed worker group.
///
/// Every rank must enter the same collectives in the same order. Arguments
/// marked "root only" are ignored on other ranks and must be `Some` on the root.
pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn is_root(&self) -> bool {
        self.rank() == ROOT
    }

    fn barrier(&self) -> Result<()>;

    /// Root's `value` is cloned to every rank.
    fn broadcast<T>(&self, value: Option<T>) -> Result<T>
    where
        T: Clone + Send + 'static;

    /// Copies chunk `rank` of the root's `data` (root only) to each rank.
    fn scatter(&self, plan: &ChunkPlan, data: Option<&[Intensity]>) -> Result<Vec<Intensity>>;

    /// Elementwise sum of every rank's histogram, returned on the root only.
    fn reduce(&self, local: &Histogram) -> Result<Option<Histogram>>;

    /// Copies each rank's `local` chunk into the root's `out` (root only).
    fn gather(
        &self,
        plan: &ChunkPlan,
        local: &[Intensity],
        out: Option<&mut [Intensity]>,
    ) -> Result<()>;

    /// Wakes every peer blocked in a collective with `Error::Aborted`.
    fn abort(&self);
}
