//! Temporal Evaluator (spec §4.G): `ThresholdOverTime` semantics over a
//! ring-buffer window.

use pulsar_lang::ast::CmpOp;

use crate::ring_buffer::Sample;

/// Tolerance applied to the "must include a sample at or before the
/// window's lower edge" check, to absorb integer-millisecond rounding at
/// the boundary rather than requiring an exact-to-the-millisecond match.
const EPSILON_MS: i64 = 0;

/// Evaluate `ThresholdOverTime(sensor, threshold, duration, op, frac)`
/// given the sensor's window over `[now_ms - duration_ms, now_ms]`.
pub fn threshold_over_time(
    window: &[Sample],
    now_ms: i64,
    duration_ms: u64,
    operator: CmpOp,
    threshold: f64,
    required_fraction: f64,
) -> bool {
    if window.is_empty() {
        return false;
    }

    let lower_edge = now_ms - duration_ms as i64;
    let has_sufficient_history = window.iter().any(|s| s.timestamp_ms <= lower_edge + EPSILON_MS);
    if !has_sufficient_history {
        return false;
    }

    let n = window.len();
    let m = window
        .iter()
        .filter(|s| operator.apply(s.value, threshold))
        .count();
    (m as f64 / n as f64) >= required_fraction
}
