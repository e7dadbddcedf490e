use crate::{Error, Result};
use std::fmt;

/// Per-worker progress through one distributed equalization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Init,
    PlanReady,
    Scattered,
    LocallyAccumulated,
    GloballyReduced,
    CdfReady,
    LocallyRemapped,
    Gathered,
    Done,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Init,
        Stage::PlanReady,
        Stage::Scattered,
        Stage::LocallyAccumulated,
        Stage::GloballyReduced,
        Stage::CdfReady,
        Stage::LocallyRemapped,
        Stage::Gathered,
        Stage::Done,
    ];

    pub fn next(self) -> Option<Stage> {
        let idx = Self::ALL.iter().position(|&s| s == self)?;
        Self::ALL.get(idx + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::PlanReady => "plan-ready",
            Stage::Scattered => "scattered",
            Stage::LocallyAccumulated => "locally-accumulated",
            Stage::GloballyReduced => "globally-reduced",
            Stage::CdfReady => "cdf-ready",
            Stage::LocallyRemapped => "locally-remapped",
            Stage::Gathered => "gathered",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enforces that a worker visits every stage exactly once, in order.
#[derive(Debug, Clone)]
pub struct StageTracker {
    rank: usize,
    history: Vec<Stage>,
}

impl StageTracker {
    pub fn new(rank: usize) -> Self {
        Self {
            rank,
            history: vec![Stage::Init],
        }
    }

    pub fn current(&self) -> Stage {
        *self.history.last().unwrap_or(&Stage::Init)
    }

    pub fn advance(&mut self, to: Stage) -> Result<()> {
        let from = self.current();
        if from.next() != Some(to) {
            return Err(Error::Protocol { from, to });
        }
        tracing::debug!("rank {}: {} -> {}", self.rank, from, to);
        self.history.push(to);
        Ok(())
    }

    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    pub fn into_history(self) -> Vec<Stage> {
        self.history
    }
}
