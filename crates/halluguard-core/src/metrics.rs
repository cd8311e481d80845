//! Process-wide validation counters.
//!
//! Counters are bumped at the call site and published as one
//! `tracing::info!` event by [`Metrics::flush`], normally once per run.
//! They accumulate across runs in the same process; per-run numbers live in
//! [`RunStats`](crate::domain::RunStats).

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    EntriesValidated,
    AttemptsMade,
    RetriesIssued,
    ClientFailures,
}

impl Counter {
    const ALL: [Counter; 4] = [
        Counter::EntriesValidated,
        Counter::AttemptsMade,
        Counter::RetriesIssued,
        Counter::ClientFailures,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::EntriesValidated => "entries_validated",
            Self::AttemptsMade => "attempts_made",
            Self::RetriesIssued => "retries_issued",
            Self::ClientFailures => "client_failures",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub entries_validated: u64,
    pub attempts_made: u64,
    pub retries_issued: u64,
    pub client_failures: u64,
}

pub struct Metrics {
    counters: [AtomicU64; 4],
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            counters: [
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ],
        }
    }

    pub fn inc(&self, counter: Counter) {
        self.counters[counter.slot()].fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = counter.name(), "counter incremented");
    }

    pub fn inc_entries_validated(&self) {
        self.inc(Counter::EntriesValidated);
    }

    pub fn inc_attempts(&self) {
        self.inc(Counter::AttemptsMade);
    }

    pub fn inc_retries(&self) {
        self.inc(Counter::RetriesIssued);
    }

    pub fn inc_client_failures(&self) {
        self.inc(Counter::ClientFailures);
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.counters[counter.slot()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            entries_validated: self.get(Counter::EntriesValidated),
            attempts_made: self.get(Counter::AttemptsMade),
            retries_issued: self.get(Counter::RetriesIssued),
            client_failures: self.get(Counter::ClientFailures),
        }
    }

    /// Publish the current values as a single event.
    pub fn flush(&self) {
        let s = self.snapshot();
        tracing::info!(
            metric = "flush",
            entries_validated = s.entries_validated,
            attempts_made = s.attempts_made,
            retries_issued = s.retries_issued,
            client_failures = s.client_failures,
        );
    }

    pub fn reset(&self) {
        for counter in Counter::ALL {
            self.counters[counter.slot()].store(0, Ordering::Relaxed);
        }
    }
}
