//! A single timestamped sample and the per-sensor retention horizon derived
//! from the temporal conditions that read it.

/// One `(timestamp_ms, value)` sample in a sensor's ring (spec §3 "Ring
/// buffer").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp_ms: i64,
    pub value: f64,
}

/// Construction parameters for a [`super::SensorBuffer`](super::SensorBuffer).
pub struct BufferParams {
    pub capacity: usize,
    /// Largest duration, in ms, referenced by any temporal condition that
    /// reads this sensor. `0` means no temporal condition reads it, so no
    /// horizon-based pruning applies beyond the capacity bound.
    pub horizon_ms: u64,
}
