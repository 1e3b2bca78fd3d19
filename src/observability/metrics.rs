//! Request statistics aggregation.
//!
//! # Responsibilities
//! - Fold one observation per completed request into process-wide counters
//! - Track total/error counts, latency sum, min and max
//! - Tally requests per method and per status code
//! - Produce point-in-time snapshots and a text report
//!
//! # Design Decisions
//! - Numeric counters are independent atomics; min/max use CAS retry loops
//! - Both tally maps share one mutex, held only for the two increments
//! - `min_latency_ms` starts at `u64::MAX` (unset) and is reported as `None`
//! - Average latency is exact: 0 with no requests, `total / count` otherwise

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const UNSET_MIN: u64 = u64::MAX;

static GLOBAL: LazyLock<Arc<Metrics>> = LazyLock::new(|| Arc::new(Metrics::new()));

/// The process-wide aggregator used by [`Telemetry::global`](crate::middleware::Telemetry::global).
pub fn global() -> Arc<Metrics> {
    GLOBAL.clone()
}

#[derive(Debug, Default)]
struct Tallies {
    methods: HashMap<String, u64>,
    status_codes: HashMap<u16, u64>,
}

/// Concurrent request statistics.
#[derive(Debug)]
pub struct Metrics {
    total_requests: AtomicU64,
    error_count: AtomicU64,
    total_latency_ms: AtomicU64,
    min_latency_ms: AtomicU64,
    max_latency_ms: AtomicU64,
    tallies: Mutex<Tallies>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            min_latency_ms: AtomicU64::new(UNSET_MIN),
            max_latency_ms: AtomicU64::new(0),
            tallies: Mutex::new(Tallies::default()),
        }
    }

    /// Record one completed request.
    ///
    /// Latency is truncated to whole milliseconds. Safe to call from any
    /// number of tasks at once.
    pub fn record_request(&self, method: &str, status_code: u16, latency: Duration) {
        let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX - 1);

        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if status_code >= 400 {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);

        update_min(&self.min_latency_ms, latency_ms);
        update_max(&self.max_latency_ms, latency_ms);

        let mut tallies = self.lock_tallies();
        *tallies.methods.entry(method.to_string()).or_insert(0) += 1;
        *tallies.status_codes.entry(status_code).or_insert(0) += 1;
    }

    /// Copy the current counters.
    ///
    /// Each field is read atomically but the set is not read under one lock,
    /// so a snapshot taken while requests complete may be off by the
    /// in-flight observations.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let (method_counts, status_code_counts) = {
            let tallies = self.lock_tallies();
            (
                tallies
                    .methods
                    .iter()
                    .map(|(k, v)| (k.clone(), *v))
                    .collect::<BTreeMap<_, _>>(),
                tallies
                    .status_codes
                    .iter()
                    .map(|(k, v)| (*k, *v))
                    .collect::<BTreeMap<_, _>>(),
            )
        };

        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_latency_ms = self.total_latency_ms.load(Ordering::Relaxed);
        let min = self.min_latency_ms.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_requests,
            error_count: self.error_count.load(Ordering::Relaxed),
            total_latency_ms,
            min_latency_ms: (min != UNSET_MIN).then_some(min),
            max_latency_ms: self.max_latency_ms.load(Ordering::Relaxed),
            average_latency_ms: total_latency_ms.checked_div(total_requests).unwrap_or(0),
            method_counts,
            status_code_counts,
        }
    }

    /// Print the text report to stdout.
    pub fn print_report(&self) {
        println!("{}", self.snapshot());
    }

    fn lock_tallies(&self) -> MutexGuard<'_, Tallies> {
        // Increments never leave the maps half-written, so a poisoned lock is still usable.
        self.tallies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn update_min(slot: &AtomicU64, value: u64) {
    let mut current = slot.load(Ordering::Relaxed);
    while value < current {
        match slot.compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

fn update_max(slot: &AtomicU64, value: u64) {
    let mut current = slot.load(Ordering::Relaxed);
    while value > current {
        match slot.compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub error_count: u64,
    pub total_latency_ms: u64,
    /// `None` until the first request is recorded.
    pub min_latency_ms: Option<u64>,
    pub max_latency_ms: u64,
    pub average_latency_ms: u64,
    pub method_counts: BTreeMap<String, u64>,
    pub status_code_counts: BTreeMap<u16, u64>,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Server Metrics ===")?;
        writeln!(f, "Total Requests: {}", self.total_requests)?;
        writeln!(f, "Errors: {}", self.error_count)?;
        writeln!(f, "Average Latency (ms): {}", self.average_latency_ms)?;
        match self.min_latency_ms {
            Some(min) => writeln!(f, "Min/Max Latency (ms): {}/{}", min, self.max_latency_ms)?,
            None => writeln!(f, "Min/Max Latency (ms): -/-")?,
        }

        writeln!(f)?;
        writeln!(f, "Requests by Method:")?;
        for (method, count) in &self.method_counts {
            writeln!(f, "  {}: {}", method, count)?;
        }

        writeln!(f)?;
        writeln!(f, "Requests by Status Code:")?;
        for (status, count) in &self.status_code_counts {
            writeln!(f, "  {}: {}", status, count)?;
        }

        write!(f, "======================")
    }
}
