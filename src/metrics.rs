//! Lightweight metrics helpers.
//!
//! Thin wrappers over the `metrics` crate macros. No exporter is embedded; the
//! application can install any compatible recorder.
//!
//! Provided metrics:
//! * `vanity_requests_total` (counter, label `status`)
//! * `vanity_request_duration_seconds` (histogram)
//! * `vanity_store_lookups_total` (counter, label `outcome` = hit / miss / error)
use std::time::Instant;

use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::Lazy;

pub const VANITY_REQUESTS_TOTAL: &str = "vanity_requests_total";
pub const VANITY_REQUEST_DURATION_SECONDS: &str = "vanity_request_duration_seconds";
pub const VANITY_STORE_LOOKUPS_TOTAL: &str = "vanity_store_lookups_total";

static DESCRIBED: Lazy<()> = Lazy::new(|| {
    describe_counter!(
        VANITY_REQUESTS_TOTAL,
        Unit::Count,
        "Total number of vanity import requests answered, by status."
    );
    describe_histogram!(
        VANITY_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Latency of vanity import requests."
    );
    describe_counter!(
        VANITY_STORE_LOOKUPS_TOTAL,
        Unit::Count,
        "Key-value store lookups, by outcome."
    );
});

/// Register metric descriptions with the installed recorder.
pub fn init_metrics() -> eyre::Result<()> {
    Lazy::force(&DESCRIBED);
    tracing::debug!("Vanity metrics described");
    Ok(())
}

/// Count an answered request.
pub fn increment_request_total(status: u16) {
    counter!(VANITY_REQUESTS_TOTAL, "status" => status.to_string()).increment(1);
}

/// Count a store lookup by outcome.
pub fn increment_store_lookup(outcome: &'static str) {
    counter!(VANITY_STORE_LOOKUPS_TOTAL, "outcome" => outcome).increment(1);
}

/// RAII helper measuring request duration.
pub struct RequestTimer {
    start: Instant,
}

impl RequestTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }
}

impl Default for RequestTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        histogram!(VANITY_REQUEST_DURATION_SECONDS).record(self.start.elapsed().as_secs_f64());
    }
}
