pub use heq_core as core;
pub use heq_imgproc as imgproc;
pub use heq_io as io;
pub use heq_runtime as runtime;

pub mod pipeline;

pub use heq_core::{EqualizeParams, IntensityBuffer};
pub use heq_runtime::{Coordinator, GroupConfig, Mode, WorkerGroup};

/// Build a coordinator over a fresh worker group.
///
/// Both configurations are validated before any thread is started.
pub fn coordinator(group: GroupConfig, params: EqualizeParams) -> runtime::Result<Coordinator> {
    params.validate()?;
    Coordinator::new(WorkerGroup::new(group)?, params)
}
