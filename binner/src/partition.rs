//! Fork-join scheduling of partition tasks.
//!
//! The input is split into contiguous ranges, one per worker. Each worker gets
//! a shared borrow of its slice and owns whatever it produces; results travel
//! back to the caller in worker-index order once every task has finished.

use std::any::Any;
use std::fmt;
use std::ops::Range;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;
use tracing::{debug, span, trace, Level};

use crate::error::{BinningError, Result};
use crate::geometry::{BoundingBox, GridSpec, Sample};
use crate::grid::{accumulate_partition, PartialGrid};

/// How partition tasks are executed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Partitions run one after another on the calling thread.
    Sequential,
    /// One scoped OS thread per partition.
    #[default]
    ScopedThreads,
    /// A dedicated rayon pool with one thread per partition.
    RayonPool,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::ScopedThreads => "scoped-threads",
            ExecutionMode::RayonPool => "rayon-pool",
        };
        f.write_str(name)
    }
}

/// Splits `0..len` into `workers` contiguous, non-overlapping ranges of
/// `len / workers` elements; the last range also takes the remainder.
/// Zero workers behaves like one.
pub fn partition_ranges(len: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let chunk = len / workers;
    (0..workers)
        .map(|w| {
            let start = w * chunk;
            let end = if w + 1 == workers { len } else { start + chunk };
            start..end
        })
        .collect()
}

/// Runs `task` once per partition of `samples` and returns the results in
/// partition order. At most `samples.len()` partitions are used (one for an
/// empty input). A panicking task makes the whole call fail with
/// [`BinningError::WorkerFailure`]; the remaining tasks still run to
/// completion first.
pub fn fan_out<T, F>(samples: &[Sample], workers: usize, mode: ExecutionMode, task: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize, &[Sample]) -> T + Sync,
{
    // Never more partitions than samples, so the thread count stays bounded by the input.
    let ranges = partition_ranges(samples.len(), workers.min(samples.len().max(1)));
    let _span = span!(Level::DEBUG, "fan_out", %mode, partitions = ranges.len()).entered();
    trace!("Partition ranges: {:?}", ranges);

    let outcomes: Vec<std::thread::Result<T>> = match mode {
        ExecutionMode::Sequential => ranges
            .iter()
            .enumerate()
            .map(|(w, r)| catch_unwind(AssertUnwindSafe(|| task(w, &samples[r.clone()]))))
            .collect(),
        ExecutionMode::ScopedThreads => std::thread::scope(|scope| {
            let task = &task;
            let mut handles = Vec::with_capacity(ranges.len());
            let mut spawn_error = None;
            for (w, r) in ranges.iter().enumerate() {
                let slice = &samples[r.clone()];
                let spawned = std::thread::Builder::new()
                    .name(format!("binner-worker-{w}"))
                    .spawn_scoped(scope, move || task(w, slice));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(source) => {
                        spawn_error = Some(BinningError::Spawn { worker: w, source });
                        break;
                    }
                }
            }
            // Already running workers are joined even when a later spawn failed.
            let joined: Vec<std::thread::Result<T>> = handles.into_iter().map(|h| h.join()).collect();
            match spawn_error {
                Some(err) => Err(err),
                None => Ok(joined),
            }
        })?,
        ExecutionMode::RayonPool => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(ranges.len())
                .thread_name(|i| format!("binner-worker-{i}"))
                .build()?;
            pool.install(|| {
                ranges
                    .par_iter()
                    .enumerate()
                    .map(|(w, r)| catch_unwind(AssertUnwindSafe(|| task(w, &samples[r.clone()]))))
                    .collect()
            })
        }
    };

    let mut results = Vec::with_capacity(outcomes.len());
    for (worker, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(value) => results.push(value),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                debug!("Worker {} failed: {}", worker, message);
                return Err(BinningError::WorkerFailure { worker, message });
            }
        }
    }
    Ok(results)
}

/// Accumulates every partition of `samples` into its own [`PartialGrid`].
pub fn run(
    samples: &[Sample],
    bbox: &BoundingBox,
    spec: &GridSpec,
    workers: usize,
    mode: ExecutionMode,
) -> Result<Vec<PartialGrid>> {
    fan_out(samples, workers, mode, |_, slice| accumulate_partition(slice, bbox, spec))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked with a non-string payload".to_string()
    }
}
