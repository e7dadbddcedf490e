use crate::comm::Communicator;
use crate::group::WorkerGroup;
use crate::stage::{Stage, StageTracker};
use crate::Result;
use heq_core::{EqualizeParams, Error as CoreError, IntensityBuffer};
use heq_imgproc::{accumulate, equalize_reference, plan, remap, CdfTable, ChunkPlan, Histogram};
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Partitioned across the worker group with scatter/reduce/broadcast/gather.
    Distributed,
    /// Whole buffer on the calling thread, used to validate `Distributed`.
    Reference,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Distributed => "parallel",
            Mode::Reference => "sequential",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the coordinator knows after one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub mode: Mode,
    pub workers: usize,
    pub plan: ChunkPlan,
    pub histogram: Histogram,
    pub cdf: CdfTable,
    /// Coordinator's stage history; empty for reference runs.
    pub stages: Vec<Stage>,
    pub elapsed: Duration,
}

pub struct Coordinator {
    group: WorkerGroup,
    params: EqualizeParams,
}

impl Coordinator {
    pub fn new(group: WorkerGroup, params: EqualizeParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { group, params })
    }

    pub fn group(&self) -> &WorkerGroup {
        &self.group
    }

    pub fn params(&self) -> &EqualizeParams {
        &self.params
    }

    pub fn run(&self, mode: Mode, buffer: &mut IntensityBuffer) -> Result<RunReport> {
        match mode {
            Mode::Distributed => self.equalize(buffer),
            Mode::Reference => self.equalize_reference(buffer),
        }
    }

    /// Distributed equalization of `buffer` in place.
    ///
    /// Only this thread ever sees the full buffer; workers receive copies of
    /// their chunk and hand back remapped copies through the gather.
    pub fn equalize(&self, buffer: &mut IntensityBuffer) -> Result<RunReport> {
        if buffer.is_empty() {
            return Err(CoreError::EmptyImage.into());
        }

        let start = Instant::now();
        let params = self.params;
        let outcome = self.group.run(
            |comm| equalize_rank(comm, Some(&mut *buffer), &params),
            |comm| equalize_rank(comm, None, &params).map(|_| ()),
        )?;
        let elapsed = start.elapsed();

        let histogram = outcome.histogram.ok_or_else(|| {
            crate::Error::Collective("coordinator finished without a global histogram".into())
        })?;
        tracing::info!(
            "Distributed equalization of {} pixels on {} workers took {:?}",
            buffer.len(),
            self.group.size(),
            elapsed
        );

        Ok(RunReport {
            mode: Mode::Distributed,
            workers: self.group.size(),
            plan: outcome.plan,
            histogram,
            cdf: outcome.cdf,
            stages: outcome.stages,
            elapsed,
        })
    }

    /// Single-worker equalization of `buffer` in place.
    pub fn equalize_reference(&self, buffer: &mut IntensityBuffer) -> Result<RunReport> {
        let start = Instant::now();
        let report = equalize_reference(buffer, &self.params)?;
        let elapsed = start.elapsed();
        tracing::info!(
            "Reference equalization of {} pixels took {:?}",
            buffer.len(),
            elapsed
        );

        Ok(RunReport {
            mode: Mode::Reference,
            workers: 1,
            plan: plan(buffer.len(), 1)?,
            histogram: report.histogram,
            cdf: report.cdf,
            stages: Vec::new(),
            elapsed,
        })
    }
}

struct RankOutcome {
    plan: ChunkPlan,
    histogram: Option<Histogram>,
    cdf: CdfTable,
    stages: Vec<Stage>,
}

/// The program every rank executes. `buffer` is `Some` on the coordinator only.
fn equalize_rank<C: Communicator>(
    comm: &C,
    mut buffer: Option<&mut IntensityBuffer>,
    params: &EqualizeParams,
) -> Result<RankOutcome> {
    let mut stages = StageTracker::new(comm.rank());

    let root_plan = match buffer.as_deref() {
        Some(buf) => Some(plan(buf.len(), comm.size())?),
        None => None,
    };
    let plan = comm.broadcast(root_plan)?;
    stages.advance(Stage::PlanReady)?;

    let offset = plan.chunk(comm.rank()).map(|c| c.offset).unwrap_or(0);
    let mut local = comm.scatter(&plan, buffer.as_deref().map(IntensityBuffer::as_slice))?;
    stages.advance(Stage::Scattered)?;

    let local_hist =
        accumulate(&local, params.levels).map_err(|e| shift_violation(e, offset))?;
    stages.advance(Stage::LocallyAccumulated)?;

    let global = comm.reduce(&local_hist)?;
    stages.advance(Stage::GloballyReduced)?;

    let root_cdf = match &global {
        Some(hist) => Some(CdfTable::build(hist, plan.total() as u64)?),
        None => None,
    };
    let cdf = comm.broadcast(root_cdf)?;
    stages.advance(Stage::CdfReady)?;

    remap(&mut local, &cdf, params).map_err(|e| shift_violation(e, offset))?;
    stages.advance(Stage::LocallyRemapped)?;

    comm.gather(
        &plan,
        &local,
        buffer.as_deref_mut().map(IntensityBuffer::as_mut_slice),
    )?;
    stages.advance(Stage::Gathered)?;
    stages.advance(Stage::Done)?;

    Ok(RankOutcome {
        plan,
        histogram: global,
        cdf,
        stages: stages.into_history(),
    })
}

/// Reports range violations at their index in the full buffer.
fn shift_violation(err: CoreError, offset: usize) -> CoreError {
    match err {
        CoreError::RangeViolation {
            value,
            index,
            levels,
        } => CoreError::RangeViolation {
            value,
            index: index + offset,
            levels,
        },
        other => other,
    }
}
