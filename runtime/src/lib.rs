pub mod comm;
pub mod coordinator;
pub mod group;
pub mod stage;

pub use comm::{Communicator, ThreadComm, ROOT};
pub use coordinator::{Coordinator, Mode, RunReport};
pub use group::{GroupConfig, WorkerGroup};
pub use stage::{Stage, StageTracker};

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Runtime error: {0}")]
    RuntimeError(String),

    #[error("Collective error: {0}")]
    Collective(String),

    #[error("{op} timed out after {after:?} waiting for peers")]
    Timeout { op: &'static str, after: Duration },

    #[error("{op} aborted: a peer worker failed")]
    Aborted { op: &'static str },

    #[error("Protocol violation: cannot move from {from} to {to}")]
    Protocol { from: Stage, to: Stage },

    #[error("Worker panicked: {0}")]
    WorkerPanic(String),

    #[error(transparent)]
    Core(#[from] heq_core::Error),
}

impl Error {
    /// True for errors that only echo a failure raised on another worker.
    pub fn is_secondary(&self) -> bool {
        matches!(self, Error::Aborted { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
