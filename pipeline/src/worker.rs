//! Producer and consumer loops.
//!
//! Both loops work in bursts. Before each burst a loop computes how much of
//! its per-tick quota is left (`target_rate ± bias/2`, floored at zero, minus
//! what it already moved since the sampler last reset the counters) and moves
//! at most `batch_size` of that. A spent quota just yields.

use std::thread;
use tracing::debug;

use crate::driver::Pipeline;
use crate::io::{ItemSink, ItemSource};
use crate::{PipelineError, Result};

/// What a worker loop did over the run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopReport {
    pub bursts: u64,
    pub items: u64,
    /// Bursts cut short by a full (producer) or empty (consumer) queue.
    pub truncated: u64,
    /// The item source ran dry (producer only).
    pub exhausted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Producer,
    Consumer,
}

/// Items per tick for one side, given the regulator's bias.
pub(crate) fn quota(target_rate: i64, bias: i64, side: Side) -> u64 {
    let half = bias / 2;
    let rate = match side {
        Side::Producer => target_rate.saturating_add(half),
        Side::Consumer => target_rate.saturating_sub(half),
    };
    rate.max(0) as u64
}

/// Transfers allowed in the next burst.
pub(crate) fn burst_len(quota: u64, moved: u64, batch_size: usize) -> usize {
    quota.saturating_sub(moved).min(batch_size as u64) as usize
}

/// Moves items from `source` into the queue until halted or until the
/// source is exhausted.
///
/// An item the queue refuses is held back and offered first in the next
/// burst, so nothing taken from the source is dropped while the loop runs.
pub fn run_producer<T, S>(pipeline: &Pipeline<T>, source: &mut S) -> LoopReport
where
    T: Send + 'static,
    S: ItemSource<T> + ?Sized,
{
    let halt = pipeline.halt();
    let counters = pipeline.counters();
    let admission = pipeline.admission();
    let batch_size = pipeline.config().run.batch_size;
    debug!(admission = admission.name(), batch_size, "producer loop started");

    let mut report = LoopReport::default();
    let mut pending: Option<T> = None;

    while !halt.is_raised() {
        let budget = burst_len(
            pipeline.quota(Side::Producer),
            counters.accepted(),
            batch_size,
        );
        if budget == 0 {
            thread::yield_now();
            continue;
        }

        let mut moved = 0u64;
        let mut source_done = false;
        for _ in 0..budget {
            let Some(item) = pending.take().or_else(|| source.next_item()) else {
                source_done = true;
                break;
            };
            match admission.push(item, halt) {
                Ok(()) => moved += 1,
                Err(refused) => {
                    pending = Some(refused);
                    report.truncated += 1;
                    break;
                }
            }
        }

        counters.add_accepted(moved);
        admission.end_burst();
        report.bursts += 1;
        report.items += moved;

        if source_done {
            // A halt-aware source also returns `None` once halt is raised.
            report.exhausted = !halt.is_raised();
            if report.exhausted {
                debug!(items = report.items, "item source exhausted");
            }
            break;
        }
        thread::yield_now();
    }

    if pending.is_some() {
        debug!("producer stopped holding one refused item");
    }
    debug!(
        bursts = report.bursts,
        items = report.items,
        truncated = report.truncated,
        "producer loop stopped"
    );
    report
}

/// Moves items from the queue into `sink` until halted.
///
/// A sink error raises halt, so the rest of the pipeline winds down, and is
/// returned as [`PipelineError::Sink`].
pub fn run_consumer<T, K>(pipeline: &Pipeline<T>, sink: &mut K) -> Result<LoopReport>
where
    T: Send + 'static,
    K: ItemSink<T> + ?Sized,
{
    let halt = pipeline.halt();
    let counters = pipeline.counters();
    let admission = pipeline.admission();
    let batch_size = pipeline.config().run.batch_size;
    debug!(admission = admission.name(), batch_size, "consumer loop started");

    let mut report = LoopReport::default();

    while !halt.is_raised() {
        let budget = burst_len(
            pipeline.quota(Side::Consumer),
            counters.emitted(),
            batch_size,
        );
        if budget == 0 {
            thread::yield_now();
            continue;
        }

        let mut moved = 0u64;
        let mut failure = None;
        for _ in 0..budget {
            let Some(item) = admission.pop(halt) else {
                report.truncated += 1;
                break;
            };
            if let Err(e) = sink.emit(item) {
                failure = Some(e);
                break;
            }
            moved += 1;
        }

        counters.add_emitted(moved);
        admission.end_burst();
        report.bursts += 1;
        report.items += moved;

        if let Some(e) = failure {
            pipeline.shutdown();
            return Err(PipelineError::Sink(e));
        }
        thread::yield_now();
    }

    sink.flush().map_err(PipelineError::Sink)?;
    debug!(
        bursts = report.bursts,
        items = report.items,
        truncated = report.truncated,
        "consumer loop stopped"
    );
    Ok(report)
}
