//! Ring Buffer Manager (spec §4.F): one bounded, timestamp-ordered buffer
//! per sensor referenced by any temporal condition. Adapted from the
//! Arrow-batch windowing module this crate's teacher used for columnar
//! retention — here each buffer holds scalar samples instead of batches,
//! but the FIFO-eviction-plus-horizon-pruning shape carries over directly.

mod eviction;
mod types;

#[cfg(test)]
mod tests;

use std::collections::{HashMap, VecDeque};

pub use types::{BufferParams, Sample};

/// A single sensor's bounded, time-ordered sample history.
pub struct SensorBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
    horizon_ms: u64,
}

impl SensorBuffer {
    pub fn new(params: BufferParams) -> Self {
        Self {
            samples: VecDeque::new(),
            capacity: params.capacity,
            horizon_ms: params.horizon_ms,
        }
    }

    /// Push a new sample. Returns `false` (and drops the sample) if its
    /// timestamp is strictly less than the last stored timestamp —
    /// the caller counts this as a monotonicity violation.
    fn push(&mut self, sample: Sample, now_ms: i64) -> bool {
        if let Some(last) = self.samples.back() {
            if sample.timestamp_ms < last.timestamp_ms {
                return false;
            }
        }
        self.samples.push_back(sample);
        self.evict_over_capacity();
        self.prune_before_horizon(now_ms);
        true
    }

    /// The subsequence of samples with `timestamp_ms` in
    /// `[now_ms - duration_ms, now_ms]`, oldest first (spec §4.F `window`).
    pub fn window(&self, duration_ms: u64, now_ms: i64) -> Vec<Sample> {
        let lower = now_ms - duration_ms as i64;
        self.samples
            .iter()
            .filter(|s| s.timestamp_ms >= lower && s.timestamp_ms <= now_ms)
            .copied()
            .collect()
    }

    /// The most recently pushed sample's value, if any.
    pub fn latest(&self) -> Option<f64> {
        self.samples.back().map(|s| s.value)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Owns one [`SensorBuffer`] per sensor that appears in a `ThresholdOverTime`
/// condition anywhere in the compiled rule set.
pub struct RingBufferManager {
    buffers: HashMap<String, SensorBuffer>,
    capacity: usize,
    monotonicity_violations: u64,
}

impl RingBufferManager {
    /// `horizons` maps sensor name to the largest temporal duration (ms)
    /// that reads it; every other sensor gets no buffer at all, since only
    /// temporal conditions need retained history.
    pub fn new(capacity: usize, horizons: &HashMap<String, u64>) -> Self {
        let buffers = horizons
            .iter()
            .map(|(sensor, &horizon_ms)| {
                (
                    sensor.clone(),
                    SensorBuffer::new(BufferParams {
                        capacity,
                        horizon_ms,
                    }),
                )
            })
            .collect();
        Self {
            buffers,
            capacity,
            monotonicity_violations: 0,
        }
    }

    /// Apply one cycle's sensor readings. Unrecognized sensors (not
    /// referenced by any temporal condition) are ignored — they have no
    /// buffer to update.
    pub fn update(&mut self, samples: &HashMap<String, (f64, i64)>, now_ms: i64) {
        for (sensor, &(value, timestamp_ms)) in samples {
            if let Some(buffer) = self.buffers.get_mut(sensor) {
                if !buffer.push(Sample { timestamp_ms, value }, now_ms) {
                    self.monotonicity_violations += 1;
                }
            }
        }
    }

    pub fn window(&self, sensor: &str, duration_ms: u64, now_ms: i64) -> Vec<Sample> {
        self.buffers
            .get(sensor)
            .map(|b| b.window(duration_ms, now_ms))
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        for buffer in self.buffers.values_mut() {
            buffer.clear();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn monotonicity_violations(&self) -> u64 {
        self.monotonicity_violations
    }
}
