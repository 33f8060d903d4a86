/// Domain-aware logging macros.
///
/// Each macro injects a `domain` field automatically so callers never need to
/// remember the string literal. Domains: `sys` (orchestrator lifecycle),
/// `adapter` (store reads/writes), `cycle` (per-cycle evaluation), `conf`
/// (config/bootstrap).
///
/// # Usage
///
/// ```ignore
/// use crate::log_macros::*;
///
/// beacon_info!(sys, layers = 3, rules = 12, "bootstrap complete");
/// beacon_warn!(adapter, error = %e, "store read failed");
/// beacon_debug!(cycle, skips = 2, "cycle evaluated");
/// ```
///
/// The macros accept any tracing-compatible field syntax after the domain
/// identifier. The domain identifier is **not** a string — it is a bare
/// identifier that the macro converts to a `&str` literal.

#[doc(hidden)]
macro_rules! beacon_log {
    ($level:ident, $domain:ident, $($field:tt)*) => {
        tracing::$level!(domain = stringify!($domain), $($field)*)
    };
}

macro_rules! beacon_error {
    ($domain:ident, $($rest:tt)*) => {
        beacon_log!(error, $domain, $($rest)*)
    };
}

macro_rules! beacon_warn {
    ($domain:ident, $($rest:tt)*) => {
        beacon_log!(warn, $domain, $($rest)*)
    };
}

macro_rules! beacon_info {
    ($domain:ident, $($rest:tt)*) => {
        beacon_log!(info, $domain, $($rest)*)
    };
}

macro_rules! beacon_debug {
    ($domain:ident, $($rest:tt)*) => {
        beacon_log!(debug, $domain, $($rest)*)
    };
}

#[allow(unused_macros)]
macro_rules! beacon_trace {
    ($domain:ident, $($rest:tt)*) => {
        beacon_log!(trace, $domain, $($rest)*)
    };
}
