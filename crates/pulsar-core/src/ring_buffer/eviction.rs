//! FIFO eviction policies: capacity bound and horizon-based pruning (spec
//! §4.F "Ring Buffer Manager" invariant).

use super::SensorBuffer;

impl SensorBuffer {
    /// Pop oldest samples while over the capacity bound.
    pub(super) fn evict_over_capacity(&mut self) {
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Drop samples older than `now_ms - horizon_ms` — the buffer never
    /// needs to retain more history than the largest temporal duration that
    /// reads it.
    pub(super) fn prune_before_horizon(&mut self, now_ms: i64) {
        if self.horizon_ms == 0 {
            return;
        }
        let cutoff = now_ms - self.horizon_ms as i64;
        while let Some(front) = self.samples.front() {
            if front.timestamp_ms < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }
}
