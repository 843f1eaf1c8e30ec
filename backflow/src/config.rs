use pipeline::{PipelineConfig, QueueKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub pipeline: PipelineConfig,

    /// Used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub gain: Option<f64>,
    pub queue: Option<QueueKind>,
    pub ticks: Option<u64>,
    pub duration: Option<Duration>,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pipeline: PipelineConfig::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Applies `overrides`. A duration is turned into a tick count at the
    /// configured tick length and wins over an explicit tick count.
    pub fn apply(&mut self, overrides: &Overrides) {
        let pipeline = &mut self.pipeline;
        if let Some(gain) = overrides.gain {
            pipeline.gain = gain;
        }
        if let Some(kind) = overrides.queue {
            pipeline.queue.kind = kind;
        }
        if let Some(ticks) = overrides.ticks {
            pipeline.run.ticks = ticks;
        }
        if let Some(duration) = overrides.duration {
            let tick_ms = pipeline.run.tick_ms.max(1) as u128;
            pipeline.run.ticks = (duration.as_millis() / tick_ms).max(1) as u64;
        }
    }
}

pub fn parse_queue_kind(value: &str) -> Result<QueueKind, String> {
    match value {
        "locked" => Ok(QueueKind::Locked),
        "blocking" => Ok(QueueKind::Blocking),
        "ring" => Ok(QueueKind::Ring),
        other => Err(format!(
            "unknown queue kind {other:?}, expected locked, blocking or ring"
        )),
    }
}
