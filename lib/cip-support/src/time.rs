use std::time::{Duration, Instant};

/// Monotonic wall-clock accumulator used by the periodic driver (§4.10). Drains whole ticks so a
/// burst of scheduling jitter is compensated in a single call rather than spread across iterations.
#[derive(Debug, Clone, Copy)]
pub struct TickAccumulator {
    tick: Duration,
    elapsed: Duration,
    last: Instant,
}

impl TickAccumulator {
    #[inline]
    pub fn new(tick: Duration, now: Instant) -> TickAccumulator {
        TickAccumulator {
            tick,
            elapsed: Duration::ZERO,
            last: now,
        }
    }

    #[inline]
    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Time remaining until the next tick is due, for use as a poll timeout.
    #[inline]
    pub fn remaining(&self) -> Duration {
        self.tick.saturating_sub(self.elapsed)
    }

    /// Advance the accumulator to `now`, returning the number of whole ticks that have elapsed.
    #[inline]
    pub fn advance(&mut self, now: Instant) -> u32 {
        self.elapsed += now.duration_since(self.last);
        self.last = now;

        let mut drained = 0;
        while self.elapsed >= self.tick {
            self.elapsed -= self.tick;
            drained += 1;
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_whole_ticks_and_keeps_remainder() {
        let start = Instant::now();
        let mut acc = TickAccumulator::new(Duration::from_millis(10), start);

        let drained = acc.advance(start + Duration::from_millis(35));

        assert_eq!(drained, 3);
        assert!(acc.elapsed <= Duration::from_millis(10));
    }

    #[test]
    fn no_drain_before_a_full_tick() {
        let start = Instant::now();
        let mut acc = TickAccumulator::new(Duration::from_millis(10), start);

        let drained = acc.advance(start + Duration::from_millis(4));

        assert_eq!(drained, 0);
        assert_eq!(acc.remaining(), Duration::from_millis(6));
    }
}
