//! The periodic connection-manager driver (C10): every whole tick that elapses, give the caller
//! a chance to run maintenance (timeout scans, keepalive checks) without coupling that cadence to
//! how often the event loop happens to wake up for socket readiness.

use std::time::{Duration, Instant};

use cip_support::time::TickAccumulator;

pub struct PeriodicDriver {
    ticks: TickAccumulator,
}

impl PeriodicDriver {
    pub fn new(tick: Duration, now: Instant) -> PeriodicDriver {
        PeriodicDriver {
            ticks: TickAccumulator::new(tick, now),
        }
    }

    /// Advance the clock to `now` and invoke `on_tick` once per whole tick that elapsed.
    pub fn drive(&mut self, now: Instant, mut on_tick: impl FnMut()) {
        let drained = self.ticks.advance(now);
        for _ in 0..drained {
            on_tick();
        }
    }

    /// Time until the next tick is due — a natural poll timeout for the event loop.
    pub fn remaining(&self) -> Duration {
        self.ticks.remaining()
    }
}
