//! Alternating occupancy regimes.

use flowbuf::{BoundedQueue, CapacityUpdate};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::ControlConfig;
use crate::driver::Pipeline;
use crate::regulator::{Regulator, Setpoint};

/// Queue limit plus regulator targets applied together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regime {
    pub capacity: usize,
    pub setpoint: Setpoint,
}

impl Regime {
    fn with_headroom(occupancy: usize, target_rate: i64, headroom: f64) -> Self {
        Regime {
            capacity: (occupancy as f64 * headroom) as usize,
            setpoint: Setpoint {
                measured: occupancy as i64,
                controlled: target_rate,
            },
        }
    }
}

/// Flips between a low and a high occupancy regime once per period,
/// starting with the low one. Nothing else changes the queue limit.
#[derive(Debug, Clone)]
pub struct SetpointScheduler {
    regimes: [Regime; 2],
    period: Duration,
}

impl SetpointScheduler {
    pub fn new(control: &ControlConfig) -> Self {
        SetpointScheduler {
            regimes: [
                Regime::with_headroom(control.low_occupancy, control.target_rate, control.headroom),
                Regime::with_headroom(
                    control.high_occupancy,
                    control.target_rate,
                    control.headroom,
                ),
            ],
            period: control.regime_period(),
        }
    }

    pub fn regimes(&self) -> &[Regime; 2] {
        &self.regimes
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Regime in force during the `switch`-th period.
    pub fn regime(&self, switch: u64) -> &Regime {
        &self.regimes[(switch % 2) as usize]
    }

    /// Sets the queue limit, then the regulator targets.
    pub fn apply<T>(
        &self,
        regime: &Regime,
        queue: &dyn BoundedQueue<T>,
        regulator: &Regulator,
    ) -> CapacityUpdate {
        let update = queue.set_capacity(regime.capacity);
        regulator.setpoint(regime.setpoint);
        update
    }

    /// Scheduler loop. Applies a regime, sleeps until the end of its period
    /// and moves to the other one, until halted. Returns how many regimes
    /// were applied.
    pub fn run<T: Send + 'static>(&self, pipeline: &Pipeline<T>) -> u64 {
        let queue = pipeline.queue();
        let mut warned_fixed = false;
        let mut applied = 0u64;
        let mut deadline = Instant::now();

        loop {
            let regime = self.regime(applied);
            let update = self.apply(regime, queue, pipeline.regulator());
            debug!(
                regime = applied % 2,
                capacity = regime.capacity,
                occupancy_target = regime.setpoint.measured,
                rate_target = regime.setpoint.controlled,
                "applied regime"
            );
            if update == CapacityUpdate::Fixed && !warned_fixed {
                warn!(
                    queue = queue.name(),
                    capacity = queue.capacity(),
                    "queue capacity is fixed, regime limits are not enforced"
                );
                warned_fixed = true;
            }
            applied += 1;

            deadline += self.period;
            if pipeline.halt().sleep_until(deadline) {
                break;
            }
        }

        debug!(applied, "scheduler loop stopped");
        applied
    }
}
