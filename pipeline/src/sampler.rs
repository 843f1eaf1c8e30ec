//! Run pacing, telemetry and termination.

use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::driver::Pipeline;
use crate::telemetry::TelemetrySink;
use crate::{PipelineError, Result};

/// One telemetry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub elapsed_ms: u64,
    pub queue_len: usize,
    /// Items accepted by the queue since the previous sample.
    pub accepted: u64,
    /// Items emitted to the sink since the previous sample.
    pub emitted: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub elapsed: Duration,
    /// Halt was raised by someone else before the last tick.
    pub interrupted: bool,
    pub peak_queue_len: usize,
}

/// Samples the pipeline on a fixed schedule and ends the run.
///
/// Tick `n` is taken at `start + n * tick`, so a late wakeup shortens the next
/// sleep instead of pushing every later tick back.
#[derive(Debug, Clone)]
pub struct Sampler {
    tick: Duration,
    ticks: u64,
}

impl Sampler {
    pub fn new(run: &RunConfig) -> Self {
        Sampler {
            tick: run.tick(),
            ticks: run.ticks,
        }
    }

    /// Samples until the tick count is reached or halt is raised elsewhere,
    /// then raises halt.
    pub fn run<T, W>(&self, pipeline: &Pipeline<T>, telemetry: &mut W) -> Result<RunSummary>
    where
        T: Send + 'static,
        W: TelemetrySink + ?Sized,
    {
        let halt = pipeline.halt();
        let result = self.sample(pipeline, telemetry);
        if halt.raise() {
            debug!("sampler raised halt");
        }
        let summary = result?;
        telemetry.flush().map_err(PipelineError::Telemetry)?;

        info!(
            ticks = summary.ticks,
            elapsed = ?summary.elapsed,
            interrupted = summary.interrupted,
            peak_queue_len = summary.peak_queue_len,
            "sampling finished"
        );
        Ok(summary)
    }

    fn sample<T, W>(&self, pipeline: &Pipeline<T>, telemetry: &mut W) -> Result<RunSummary>
    where
        T: Send + 'static,
        W: TelemetrySink + ?Sized,
    {
        let halt = pipeline.halt();
        let queue = pipeline.queue();
        telemetry.header().map_err(PipelineError::Telemetry)?;

        let start = Instant::now();
        let mut deadline = start;
        let mut summary = RunSummary {
            ticks: 0,
            elapsed: Duration::ZERO,
            interrupted: false,
            peak_queue_len: 0,
        };

        while summary.ticks < self.ticks {
            let flow = pipeline.counters().take();
            let sample = Sample {
                elapsed_ms: start.elapsed().as_millis() as u64,
                queue_len: queue.len(),
                accepted: flow.accepted,
                emitted: flow.emitted,
            };
            telemetry
                .record(&sample)
                .map_err(PipelineError::Telemetry)?;
            summary.peak_queue_len = summary.peak_queue_len.max(sample.queue_len);
            summary.ticks += 1;

            deadline += self.tick;
            if halt.sleep_until(deadline) {
                summary.interrupted = summary.ticks < self.ticks;
                break;
            }
        }

        summary.elapsed = start.elapsed();
        Ok(summary)
    }
}
