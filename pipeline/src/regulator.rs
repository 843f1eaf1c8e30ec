//! Proportional occupancy regulator.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;
use tracing::debug;

use crate::driver::Pipeline;

/// Measured/controlled target pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setpoint {
    pub measured: i64,
    pub controlled: i64,
}

/// Proportional controller from queue occupancy to a rate bias.
///
/// `update` computes `controlled - trunc(gain * (measured - measured_target))`.
/// The measured value is written by the regulator loop, the targets by the
/// scheduler and the output by `update`; every field is a separate atomic, so
/// a reader racing [`setpoint`](Regulator::setpoint) may see one old and one
/// new target for a single update.
#[derive(Debug)]
pub struct Regulator {
    gain: f64,
    measured: AtomicI64,
    output: AtomicI64,
    measured_target: AtomicI64,
    controlled_target: AtomicI64,
}

impl Regulator {
    pub fn new(gain: f64, setpoint: Setpoint) -> Self {
        Regulator {
            gain,
            measured: AtomicI64::new(0),
            output: AtomicI64::new(0),
            measured_target: AtomicI64::new(setpoint.measured),
            controlled_target: AtomicI64::new(setpoint.controlled),
        }
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn observe(&self, measured: i64) {
        self.measured.store(measured, Ordering::Relaxed);
    }

    pub fn measured(&self) -> i64 {
        self.measured.load(Ordering::Relaxed)
    }

    /// Recomputes and publishes the bias from the latest measured value.
    pub fn update(&self) -> i64 {
        let error = self.measured() - self.measured_target.load(Ordering::Relaxed);
        let correction = (self.gain * error as f64) as i64;
        let bias = self
            .controlled_target
            .load(Ordering::Relaxed)
            .saturating_sub(correction);
        self.output.store(bias, Ordering::Relaxed);
        bias
    }

    pub fn output(&self) -> i64 {
        self.output.load(Ordering::Relaxed)
    }

    pub fn setpoint(&self, setpoint: Setpoint) {
        self.measured_target
            .store(setpoint.measured, Ordering::Relaxed);
        self.controlled_target
            .store(setpoint.controlled, Ordering::Relaxed);
    }

    pub fn setpoint_pair(&self) -> Setpoint {
        Setpoint {
            measured: self.measured_target.load(Ordering::Relaxed),
            controlled: self.controlled_target.load(Ordering::Relaxed),
        }
    }
}

/// Regulator loop: observe the queue length and update, once per interval,
/// until halted. Returns the number of updates made.
pub fn run_regulator<T: Send + 'static>(pipeline: &Pipeline<T>) -> u64 {
    let interval = pipeline.config().control.regulator_interval();
    let regulator = pipeline.regulator();
    let queue = pipeline.queue();
    debug!(gain = regulator.gain(), ?interval, "regulator loop started");

    let mut updates = 0u64;
    let mut deadline = Instant::now();
    loop {
        regulator.observe(queue.len() as i64);
        regulator.update();
        updates += 1;

        deadline += interval;
        if pipeline.halt().sleep_until(deadline) {
            break;
        }
    }

    debug!(updates, bias = regulator.output(), "regulator loop stopped");
    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case::above_target(0.5, 120, 100, 50, 40)]
    #[case::below_target(0.5, 80, 100, 50, 60)]
    #[case::on_target(3.0, 100, 100, 50, 50)]
    #[case::zero_gain(0.0, 90_000, 10_000, 2_000, 2_000)]
    #[case::truncates_toward_zero(0.3, 105, 100, 10, 9)]
    #[case::negative_bias(1.0, 60_000, 10_000, 2_000, -48_000)]
    fn test_update_formula(
        #[case] gain: f64,
        #[case] measured: i64,
        #[case] measured_target: i64,
        #[case] controlled_target: i64,
        #[case] expected: i64,
    ) {
        let regulator = Regulator::new(
            gain,
            Setpoint {
                measured: measured_target,
                controlled: controlled_target,
            },
        );
        regulator.observe(measured);
        assert_eq!(regulator.update(), expected);
        assert_eq!(regulator.output(), expected);
    }

    #[rstest]
    fn test_setpoint_switch_takes_effect_on_next_update() {
        let regulator = Regulator::new(
            0.5,
            Setpoint {
                measured: 100,
                controlled: 50,
            },
        );
        regulator.observe(10_000);
        regulator.update();

        let next = Setpoint {
            measured: 10_000,
            controlled: 200,
        };
        regulator.setpoint(next);
        assert_eq!(regulator.setpoint_pair(), next);
        assert_eq!(regulator.update(), 200);
    }

    #[rstest]
    fn test_output_starts_at_zero() {
        let regulator = Regulator::new(
            1.0,
            Setpoint {
                measured: 10,
                controlled: 5,
            },
        );
        assert_eq!(regulator.output(), 0);
        assert_eq!(regulator.measured(), 0);
    }
}
