//! # pipeline - A regulated producer/consumer pipeline
//!
//! A producer loop moves items from an [`ItemSource`] into a bounded queue and
//! a consumer loop drains them into an [`ItemSink`]. A proportional
//! [`Regulator`] watches queue occupancy and publishes a bias that splits
//! across both loops: the producer's per-tick quota is `rate + bias/2`, the
//! consumer's is `rate - bias/2`. A [`SetpointScheduler`] flips between two
//! occupancy regimes once per period, and the [`Sampler`] on the calling
//! thread paces the run, emits telemetry and raises the shared [`Halt`] when
//! the run is over.
//!
//! ```rust,no_run
//! use pipeline::{Pipeline, PipelineConfig, TelemetryWriter};
//!
//! let mut config = PipelineConfig::default();
//! config.gain = 0.05;
//! config.run.ticks = 2_000;
//!
//! let pipeline = Pipeline::<u64>::new(config)?;
//! let mut source = 0u64..;
//! let mut sink = Vec::new();
//! let mut telemetry = TelemetryWriter::new(std::io::stderr());
//!
//! let report = pipeline.run(&mut source, &mut sink, &mut telemetry)?;
//! println!("moved {} items", report.totals.emitted);
//! # Ok::<(), pipeline::PipelineError>(())
//! ```

use flowbuf::FlowBufError;
use thiserror::Error;

pub mod admission;
pub mod config;
pub mod counters;
pub mod driver;
pub mod halt;
pub mod io;
pub mod regulator;
pub mod sampler;
pub mod scheduler;
pub mod telemetry;
pub mod worker;

pub use admission::Admission;
pub use config::{ControlConfig, PipelineConfig, QueueConfig, QueueKind, RunConfig};
pub use counters::{FlowCounters, FlowSnapshot};
pub use driver::{Pipeline, RunReport};
pub use halt::Halt;
pub use io::{ItemSink, ItemSource, ReadSource, Sequence, WriteSink};
pub use regulator::{Regulator, Setpoint};
pub use sampler::{RunSummary, Sample, Sampler};
pub use scheduler::{Regime, SetpointScheduler};
pub use telemetry::{TelemetrySink, TelemetryWriter, TELEMETRY_HEADER};
pub use worker::LoopReport;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("queue error: {0}")]
    Queue(#[from] FlowBufError),
    #[error("item sink failed: {0}")]
    Sink(#[source] std::io::Error),
    #[error("telemetry sink failed: {0}")]
    Telemetry(#[source] std::io::Error),
    #[error("failed to spawn {0} thread: {1}")]
    Spawn(&'static str, #[source] std::io::Error),
    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
