//! The shared pipeline context and the run driver.

use flowbuf::{BoundedQueue, LockedQueue, RingQueue};
use std::sync::Arc;
use std::thread::{self, Scope, ScopedJoinHandle};
use tracing::{debug, info};

use crate::admission::Admission;
use crate::config::{PipelineConfig, QueueKind};
use crate::counters::{FlowCounters, FlowSnapshot};
use crate::halt::Halt;
use crate::io::{ItemSink, ItemSource};
use crate::regulator::{self, Regulator, Setpoint};
use crate::sampler::{RunSummary, Sampler};
use crate::scheduler::SetpointScheduler;
use crate::telemetry::TelemetrySink;
use crate::worker::{self, LoopReport, Side};
use crate::{PipelineError, Result};

/// State shared by every loop of one run.
///
/// Each loop borrows the pipeline for the length of [`run`](Pipeline::run);
/// the scoped threads guarantee none of them outlives it.
#[derive(Debug)]
pub struct Pipeline<T> {
    config: PipelineConfig,
    admission: Admission<T>,
    counters: FlowCounters,
    regulator: Regulator,
    halt: Arc<Halt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub summary: RunSummary,
    pub producer: LoopReport,
    pub consumer: LoopReport,
    pub regulator_updates: u64,
    pub regimes_applied: u64,
    pub totals: FlowSnapshot,
    /// Items still queued when the loops stopped.
    pub remaining: usize,
}

impl<T: Send + 'static> Pipeline<T> {
    /// Builds the queue and admission policy named by `config.queue.kind`.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let initial = config.queue.initial_capacity;
        let admission = match config.queue.kind {
            QueueKind::Locked => {
                Admission::Truncating(Arc::new(LockedQueue::with_capacity(initial)))
            }
            QueueKind::Blocking => Admission::Blocking(Arc::new(LockedQueue::with_capacity(initial))),
            QueueKind::Ring => {
                Admission::Truncating(Arc::new(RingQueue::new(config.queue.ring_slots)?))
            }
        };
        Self::with_admission(config, admission)
    }

    /// Uses a caller-built queue; `config.queue` is ignored.
    pub fn with_admission(config: PipelineConfig, admission: Admission<T>) -> Result<Self> {
        config.validate()?;
        let regulator = Regulator::new(
            config.gain,
            Setpoint {
                measured: config.control.low_occupancy as i64,
                controlled: config.control.target_rate,
            },
        );
        Ok(Pipeline {
            config,
            admission,
            counters: FlowCounters::new(),
            regulator,
            halt: Arc::new(Halt::new()),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn admission(&self) -> &Admission<T> {
        &self.admission
    }

    pub fn queue(&self) -> &dyn BoundedQueue<T> {
        self.admission.queue()
    }

    pub fn counters(&self) -> &FlowCounters {
        &self.counters
    }

    pub fn regulator(&self) -> &Regulator {
        &self.regulator
    }

    pub fn halt(&self) -> &Halt {
        &self.halt
    }

    /// Handle for stopping the run from outside, e.g. a signal handler.
    pub fn halt_handle(&self) -> Arc<Halt> {
        self.halt.clone()
    }

    pub(crate) fn quota(&self, side: Side) -> u64 {
        worker::quota(self.config.control.target_rate, self.regulator.output(), side)
    }

    /// Raises halt and wakes any loop blocked on the queue.
    pub fn shutdown(&self) {
        if self.halt.raise() {
            debug!("pipeline halt raised");
        }
        self.admission.release_waiters();
    }

    /// Runs the producer, consumer, regulator and scheduler loops on scoped
    /// threads and the sampler on the calling thread. Returns once every loop
    /// has stopped.
    pub fn run<S, K, W>(&self, source: &mut S, sink: &mut K, telemetry: &mut W) -> Result<RunReport>
    where
        S: ItemSource<T> + Send,
        K: ItemSink<T> + Send,
        W: TelemetrySink + ?Sized,
    {
        let scheduler = SetpointScheduler::new(&self.config.control);
        let sampler = Sampler::new(&self.config.run);
        info!(
            queue = self.queue().name(),
            admission = self.admission.name(),
            gain = self.regulator.gain(),
            duration = ?self.config.run.duration(),
            "pipeline starting"
        );

        thread::scope(|scope| {
            let scheduler_thread = self.spawn_worker(scope, "scheduler", move || scheduler.run(self))?;
            let regulator_thread =
                self.spawn_worker(scope, "regulator", move || regulator::run_regulator(self))?;
            let consumer_thread =
                self.spawn_worker(scope, "consumer", move || worker::run_consumer(self, sink))?;
            let producer_thread =
                self.spawn_worker(scope, "producer", move || worker::run_producer(self, source))?;

            let sampled = sampler.run(self, telemetry);
            self.shutdown();

            let producer = join(producer_thread, "producer");
            let consumer = join(consumer_thread, "consumer");
            let regulator_updates = join(regulator_thread, "regulator");
            let regimes_applied = join(scheduler_thread, "scheduler");

            let report = RunReport {
                summary: sampled?,
                producer: producer?,
                consumer: consumer??,
                regulator_updates: regulator_updates?,
                regimes_applied: regimes_applied?,
                totals: self.counters.totals(),
                remaining: self.queue().len(),
            };
            info!(
                accepted = report.totals.accepted,
                emitted = report.totals.emitted,
                remaining = report.remaining,
                "pipeline stopped"
            );
            Ok(report)
        })
    }

    fn spawn_worker<'scope, 'env, F, R>(
        &self,
        scope: &'scope Scope<'scope, 'env>,
        name: &'static str,
        body: F,
    ) -> Result<ScopedJoinHandle<'scope, R>>
    where
        F: FnOnce() -> R + Send + 'scope,
        R: Send + 'scope,
    {
        thread::Builder::new()
            .name(format!("backflow-{name}"))
            .spawn_scoped(scope, body)
            .map_err(|e| {
                self.shutdown();
                PipelineError::Spawn(name, e)
            })
    }
}

fn join<R>(handle: ScopedJoinHandle<'_, R>, name: &'static str) -> Result<R> {
    handle.join().map_err(|_| PipelineError::WorkerPanicked(name))
}
