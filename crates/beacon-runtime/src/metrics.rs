use std::fmt::Write as _;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Shared runtime metrics store for the Cycle Orchestrator (spec §4.H
/// AMBIENT observability). Counters are lock-free atomics updated from the
/// single cycle task; readers (the metrics endpoint, tests) only load.
#[derive(Default)]
pub struct RuntimeMetrics {
    last_cycle_ms: AtomicI64,
    cycles_total: AtomicU64,
    skipped_cycles_total: AtomicU64,
    overrun_cycles_total: AtomicU64,
    monotonicity_violations_total: AtomicU64,
    evaluation_skips_total: AtomicU64,
    adapter_retries_total: AtomicU64,
}

impl RuntimeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self, now_ms: i64) {
        self.last_cycle_ms.store(now_ms, Ordering::Relaxed);
        self.cycles_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped_cycle(&self) {
        self.skipped_cycles_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_overrun_cycle(&self) {
        self.overrun_cycles_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_monotonicity_violations(&self, count: u64) {
        self.monotonicity_violations_total
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_evaluation_skips(&self, count: u64) {
        self.evaluation_skips_total
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_adapter_retry(&self) {
        self.adapter_retries_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            last_cycle_ms: self.last_cycle_ms.load(Ordering::Relaxed),
            cycles_total: self.cycles_total.load(Ordering::Relaxed),
            skipped_cycles_total: self.skipped_cycles_total.load(Ordering::Relaxed),
            overrun_cycles_total: self.overrun_cycles_total.load(Ordering::Relaxed),
            monotonicity_violations_total: self
                .monotonicity_violations_total
                .load(Ordering::Relaxed),
            evaluation_skips_total: self.evaluation_skips_total.load(Ordering::Relaxed),
            adapter_retries_total: self.adapter_retries_total.load(Ordering::Relaxed),
        }
    }

    pub fn render_prometheus(&self) -> String {
        let snap = self.snapshot();
        let mut out = String::with_capacity(512);
        render_gauge(&mut out, "beacon_last_cycle_ms", snap.last_cycle_ms);
        render_counter(&mut out, "beacon_cycles_total", snap.cycles_total);
        render_counter(
            &mut out,
            "beacon_skipped_cycles_total",
            snap.skipped_cycles_total,
        );
        render_counter(
            &mut out,
            "beacon_overrun_cycles_total",
            snap.overrun_cycles_total,
        );
        render_counter(
            &mut out,
            "beacon_monotonicity_violations_total",
            snap.monotonicity_violations_total,
        );
        render_counter(
            &mut out,
            "beacon_evaluation_skips_total",
            snap.evaluation_skips_total,
        );
        render_counter(
            &mut out,
            "beacon_adapter_retries_total",
            snap.adapter_retries_total,
        );
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub last_cycle_ms: i64,
    pub cycles_total: u64,
    pub skipped_cycles_total: u64,
    pub overrun_cycles_total: u64,
    pub monotonicity_violations_total: u64,
    pub evaluation_skips_total: u64,
    pub adapter_retries_total: u64,
}

fn render_counter(out: &mut String, name: &str, value: u64) {
    let _ = writeln!(out, "# TYPE {name} counter");
    let _ = writeln!(out, "{name} {value}");
}

fn render_gauge(out: &mut String, name: &str, value: i64) {
    let _ = writeln!(out, "# TYPE {name} gauge");
    let _ = writeln!(out, "{name} {value}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = RuntimeMetrics::new();
        metrics.record_cycle(1_000);
        metrics.inc_skipped_cycle();
        metrics.inc_overrun_cycle();
        metrics.add_monotonicity_violations(2);
        metrics.add_evaluation_skips(3);
        metrics.inc_adapter_retry();

        let snap = metrics.snapshot();
        assert_eq!(snap.last_cycle_ms, 1_000);
        assert_eq!(snap.cycles_total, 1);
        assert_eq!(snap.skipped_cycles_total, 1);
        assert_eq!(snap.overrun_cycles_total, 1);
        assert_eq!(snap.monotonicity_violations_total, 2);
        assert_eq!(snap.evaluation_skips_total, 3);
        assert_eq!(snap.adapter_retries_total, 1);
    }

    #[test]
    fn prometheus_render_includes_all_metrics() {
        let metrics = RuntimeMetrics::new();
        let body = metrics.render_prometheus();
        assert!(body.contains("beacon_cycles_total"));
        assert!(body.contains("beacon_evaluation_skips_total"));
    }
}
