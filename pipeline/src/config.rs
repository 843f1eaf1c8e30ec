use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{PipelineError, Result};

/// Queue implementation and admission policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueKind {
    /// Lock-based queue, failed transfers truncate the burst.
    #[default]
    Locked,
    /// Lock-based queue, failed transfers wait on the watermarks.
    Blocking,
    /// Lock-free fixed-size ring, failed transfers truncate the burst.
    Ring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub gain: f64,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub control: ControlConfig,

    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub kind: QueueKind,
    /// Limit of the lock-based queue until the scheduler applies a regime.
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
    #[serde(default = "default_ring_slots")]
    pub ring_slots: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Items per tick each loop aims for with zero bias.
    #[serde(default = "default_target_rate")]
    pub target_rate: i64,
    #[serde(default = "default_low_occupancy")]
    pub low_occupancy: usize,
    #[serde(default = "default_high_occupancy")]
    pub high_occupancy: usize,
    /// Capacity applied per regime, as a multiple of its occupancy target.
    #[serde(default = "default_headroom")]
    pub headroom: f64,
    #[serde(default = "default_regime_period_ms")]
    pub regime_period_ms: u64,
    #[serde(default = "default_regulator_interval_ms")]
    pub regulator_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_initial_capacity() -> usize {
    flowbuf::DEFAULT_LIMIT
}

fn default_ring_slots() -> usize {
    flowbuf::DEFAULT_SLOTS
}

fn default_target_rate() -> i64 {
    2_000
}

fn default_low_occupancy() -> usize {
    10_000
}

fn default_high_occupancy() -> usize {
    50_000
}

fn default_headroom() -> f64 {
    1.2
}

fn default_regime_period_ms() -> u64 {
    1_000
}

fn default_regulator_interval_ms() -> u64 {
    1
}

fn default_tick_ms() -> u64 {
    1
}

fn default_ticks() -> u64 {
    10_000
}

fn default_batch_size() -> usize {
    100
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            gain: 0.0,
            queue: QueueConfig::default(),
            control: ControlConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            kind: QueueKind::default(),
            initial_capacity: default_initial_capacity(),
            ring_slots: default_ring_slots(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        ControlConfig {
            target_rate: default_target_rate(),
            low_occupancy: default_low_occupancy(),
            high_occupancy: default_high_occupancy(),
            headroom: default_headroom(),
            regime_period_ms: default_regime_period_ms(),
            regulator_interval_ms: default_regulator_interval_ms(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            tick_ms: default_tick_ms(),
            ticks: default_ticks(),
            batch_size: default_batch_size(),
        }
    }
}

impl ControlConfig {
    pub fn regime_period(&self) -> Duration {
        Duration::from_millis(self.regime_period_ms)
    }

    pub fn regulator_interval(&self) -> Duration {
        Duration::from_millis(self.regulator_interval_ms)
    }
}

impl RunConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Wall-clock length of a run that is not stopped early.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.tick_ms.saturating_mul(self.ticks))
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PipelineError::InvalidConfig(msg));

        if !self.gain.is_finite() {
            return invalid(format!("gain must be finite, got {}", self.gain));
        }
        if self.run.batch_size == 0 {
            return invalid("run.batch_size must be positive".to_string());
        }
        if self.run.tick_ms == 0 || self.run.ticks == 0 {
            return invalid("run.tick_ms and run.ticks must be positive".to_string());
        }
        if self.control.regime_period_ms == 0 || self.control.regulator_interval_ms == 0 {
            return invalid(
                "control.regime_period_ms and control.regulator_interval_ms must be positive"
                    .to_string(),
            );
        }
        if self.control.low_occupancy >= self.control.high_occupancy {
            return invalid(format!(
                "control.low_occupancy ({}) must be below control.high_occupancy ({})",
                self.control.low_occupancy, self.control.high_occupancy
            ));
        }
        if !self.control.headroom.is_finite() || self.control.headroom < 1.0 {
            return invalid(format!(
                "control.headroom must be at least 1.0, got {}",
                self.control.headroom
            ));
        }
        if self.control.target_rate < 0 {
            return invalid(format!(
                "control.target_rate must not be negative, got {}",
                self.control.target_rate
            ));
        }
        if self.queue.kind == QueueKind::Ring && self.queue.ring_slots == 0 {
            return invalid("queue.ring_slots must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    fn test_defaults_match_documented_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.gain, 0.0);
        assert_eq!(config.queue.kind, QueueKind::Locked);
        assert_eq!(config.control.target_rate, 2_000);
        assert_eq!(config.control.low_occupancy, 10_000);
        assert_eq!(config.control.high_occupancy, 50_000);
        assert_eq!(config.run.batch_size, 100);
        assert_eq!(config.run.duration(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[rstest]
    fn test_missing_sections_take_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            gain = 0.25

            [queue]
            kind = "blocking"

            [run]
            ticks = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.gain, 0.25);
        assert_eq!(config.queue.kind, QueueKind::Blocking);
        assert_eq!(config.queue.initial_capacity, flowbuf::DEFAULT_LIMIT);
        assert_eq!(config.run.ticks, 50);
        assert_eq!(config.run.tick_ms, 1);
        assert_eq!(config.control, ControlConfig::default());
    }

    #[rstest]
    #[case::zero_batch(|c: &mut PipelineConfig| c.run.batch_size = 0)]
    #[case::zero_ticks(|c: &mut PipelineConfig| c.run.ticks = 0)]
    #[case::zero_tick(|c: &mut PipelineConfig| c.run.tick_ms = 0)]
    #[case::zero_period(|c: &mut PipelineConfig| c.control.regime_period_ms = 0)]
    #[case::zero_interval(|c: &mut PipelineConfig| c.control.regulator_interval_ms = 0)]
    #[case::inverted_regimes(|c: &mut PipelineConfig| c.control.low_occupancy = 50_000)]
    #[case::low_headroom(|c: &mut PipelineConfig| c.control.headroom = 0.9)]
    #[case::nan_gain(|c: &mut PipelineConfig| c.gain = f64::NAN)]
    #[case::negative_rate(|c: &mut PipelineConfig| c.control.target_rate = -1)]
    #[case::empty_ring(|c: &mut PipelineConfig| {
        c.queue.kind = QueueKind::Ring;
        c.queue.ring_slots = 0;
    })]
    fn test_validate_rejects(#[case] breakage: fn(&mut PipelineConfig)) {
        let mut config = PipelineConfig::default();
        breakage(&mut config);
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}
