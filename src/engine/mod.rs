//! Batch firing engine.
//!
//! The run loop is a small state machine: `Idle -> ScanEnabled ->
//! SelectBatch -> FireBatch -> ScanEnabled ...`, terminating in
//! `Deadlocked` when a scan finds nothing enabled. Each batch is a
//! maximal conflict-free subset of the enabled transitions (no two
//! share a consumed input place), so the batch can be dispatched on
//! parallel workers and still commit as one indivisible step. Stop
//! signals and batch limits take effect between batches only, leaving
//! the marking consistent.

mod schedule;

use std::fs;
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::core::{FireError, Marking, PetriNet};
use crate::net::validate::{check_net, ValidationReport};

/// How competing enabled transitions are ordered before the greedy
/// conflict-free selection. Every policy is deterministic for a fixed
/// seed and net, which keeps runs reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Descending transition priority, transition id as tie-break.
    Priority,
    /// Transition id (creation) order.
    #[default]
    Fifo,
    /// Seeded shuffle.
    Random,
}

fn default_parallelism() -> usize {
    1
}

/// Execution configuration. Loadable from a TOML file; missing keys fall
/// back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Halt with [`RunOutcome::BatchLimit`] after this many batches.
    #[serde(default)]
    pub max_batches: Option<u64>,
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    /// Worker count for the fire step; 1 fires the batch in place.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Seed for the `random` conflict policy.
    #[serde(default)]
    pub seed: u64,
    /// External stop signal, observed between batches.
    #[serde(skip)]
    pub stop: StopHandle,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_batches: None,
            conflict_policy: ConflictPolicy::default(),
            parallelism: default_parallelism(),
            seed: 0,
            stop: StopHandle::default(),
        }
    }
}

impl RunOptions {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read options file: {path:?}"))?;
        let options: RunOptions = toml::from_str(&content)
            .with_context(|| format!("Failed to parse options file: {path:?}"))?;
        Ok(options)
    }
}

/// Cloneable handle that requests a halt at the next batch boundary.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The engine's control state, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Idle,
    ScanEnabled,
    SelectBatch,
    FireBatch,
    Deadlocked,
}

/// Why a run ended. Deadlock is the normal terminal state of a net, not
/// a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Deadlocked,
    BatchLimit,
    Stopped,
}

/// Result of one run: how it ended, how much fired, and the final
/// marking for inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub batches: u64,
    pub firings: u64,
    pub marking: Marking,
}

impl RunReport {
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create report file: {path:?}"))?;
        serde_json::to_writer_pretty(file, self)
            .with_context(|| format!("Failed to write report file: {path:?}"))?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("structural validation failed: {report}")]
    Invalid { report: ValidationReport },
    #[error(transparent)]
    Fire(#[from] FireError),
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

fn advance(phase: &mut EnginePhase, next: EnginePhase) {
    log::trace!("engine phase: {:?} -> {:?}", phase, next);
    *phase = next;
}

/// Execute the net until deadlock, batch limit, or stop signal.
///
/// Validates first: a net with structural violations refuses to fire at
/// all. The returned report carries the final marking.
pub fn run(net: &PetriNet, options: &RunOptions) -> Result<RunReport, EngineError> {
    let report = check_net(net);
    if !report.is_valid() {
        report.log_report();
        return Err(EngineError::Invalid { report });
    }

    let pool = match options.parallelism {
        0 | 1 => None,
        workers => Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()?,
        ),
    };
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut phase = EnginePhase::Idle;
    let mut batches = 0u64;
    let mut firings = 0u64;

    let outcome = loop {
        if options.stop.is_stopped() {
            break RunOutcome::Stopped;
        }
        if let Some(max) = options.max_batches {
            if batches >= max {
                break RunOutcome::BatchLimit;
            }
        }

        advance(&mut phase, EnginePhase::ScanEnabled);
        let mut plans = net.enabled_plans();
        if plans.is_empty() {
            advance(&mut phase, EnginePhase::Deadlocked);
            break RunOutcome::Deadlocked;
        }

        advance(&mut phase, EnginePhase::SelectBatch);
        schedule::order_plans(net, &mut plans, options.conflict_policy, &mut rng);
        let batch = schedule::select_batch(plans);
        log::debug!("batch {}: firing {} transition(s)", batches, batch.len());

        advance(&mut phase, EnginePhase::FireBatch);
        match &pool {
            Some(pool) => {
                pool.install(|| batch.par_iter().try_for_each(|plan| net.fire_plan(plan)))?
            }
            None => {
                for plan in &batch {
                    net.fire_plan(plan)?;
                }
            }
        }
        firings += batch.len() as u64;
        batches += 1;
    };

    log::info!(
        "run finished: {:?} after {} batch(es), {} firing(s)",
        outcome,
        batches,
        firings
    );
    Ok(RunReport {
        outcome,
        batches,
        firings,
        marking: net.marking(),
    })
}
