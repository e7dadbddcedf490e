use crate::comm::{Communicator, ThreadComm, World};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupConfig {
    /// Number of ranks, coordinator included.
    pub workers: usize,
    /// Longest a rank may wait at one barrier before the run fails.
    pub timeout: Duration,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            timeout: Duration::from_secs(30),
        }
    }
}

impl GroupConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(heq_core::Error::InvalidConfig("worker count must be >= 1".into()).into());
        }
        if self.timeout.is_zero() {
            return Err(
                heq_core::Error::InvalidConfig("collective timeout must be non-zero".into()).into(),
            );
        }
        Ok(())
    }
}

/// A fixed-size group of cooperating workers.
///
/// Rank 0 runs on the caller's thread; ranks `1..workers` run on a private
/// thread pool with one thread per rank, so every rank can block in a
/// collective at the same time.
pub struct WorkerGroup {
    config: GroupConfig,
    pool: Option<rayon::ThreadPool>,
    collectives: Arc<AtomicUsize>,
}

impl WorkerGroup {
    pub fn new(config: GroupConfig) -> Result<Self> {
        config.validate()?;

        let pool = if config.workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.workers - 1)
                .thread_name(|idx| format!("heq-worker-{}", idx + 1))
                .build()
                .map_err(|e| Error::RuntimeError(format!("Failed to build thread pool: {}", e)))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            config,
            pool,
            collectives: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn size(&self) -> usize {
        self.config.workers
    }

    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// Collective calls made by any rank over the lifetime of this group.
    pub fn collectives_started(&self) -> usize {
        self.collectives.load(Ordering::Relaxed)
    }

    /// Runs `root` as the coordinator and `worker` on every other rank.
    ///
    /// Returns the coordinator's value once all ranks have finished. When any
    /// rank fails, the communicator is aborted and the first error that is not
    /// an echo of another rank's failure is returned.
    pub fn run<O, R, W>(&self, root: R, worker: W) -> Result<O>
    where
        R: FnOnce(&ThreadComm) -> Result<O>,
        W: Fn(&ThreadComm) -> Result<()> + Sync,
    {
        let world = World::new(self.size(), self.config.timeout, self.collectives.clone())?;
        let mut comms = world.communicators().into_iter();
        let root_comm = comms
            .next()
            .ok_or_else(|| Error::RuntimeError("worker group has no coordinator".into()))?;

        let Some(pool) = &self.pool else {
            return guarded(&root_comm, root);
        };

        let failures: Mutex<Vec<(usize, Error)>> = Mutex::new(Vec::new());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            pool.in_place_scope(|s| {
                for comm in comms {
                    let worker = &worker;
                    let failures = &failures;
                    s.spawn(move |_| {
                        if let Err(e) = guarded(&comm, worker) {
                            failures.lock().push((comm.rank(), e));
                        }
                    });
                }
                guarded(&root_comm, root)
            })
        }));

        let root_result = match outcome {
            Ok(result) => result,
            Err(payload) => return Err(Error::WorkerPanic(panic_message(payload.as_ref()))),
        };

        let mut failures = failures.into_inner();
        failures.sort_by_key(|(rank, _)| *rank);
        let mut errors: Vec<Error> = failures.into_iter().map(|(_, e)| e).collect();

        match root_result {
            Ok(value) if errors.is_empty() => Ok(value),
            Ok(_) => Err(first_cause(errors)),
            Err(e) => {
                errors.insert(0, e);
                Err(first_cause(errors))
            }
        }
    }
}

struct AbortOnUnwind<'a>(&'a ThreadComm);

impl Drop for AbortOnUnwind<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.abort();
        }
    }
}

fn guarded<O>(comm: &ThreadComm, f: impl FnOnce(&ThreadComm) -> Result<O>) -> Result<O> {
    let _guard = AbortOnUnwind(comm);
    let result = f(comm);
    if let Err(e) = &result {
        tracing::debug!("rank {} failed: {}", comm.rank(), e);
        comm.abort();
    }
    result
}

fn first_cause(mut errors: Vec<Error>) -> Error {
    let idx = errors.iter().position(|e| !e.is_secondary()).unwrap_or(0);
    errors.swap_remove(idx)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
