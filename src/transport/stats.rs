//! Shared upload counters, available behind the `locking-default` feature.
//!
//! Mirrors the crate's general stance on locking: a `parking_lot::Mutex`
//! guarding a small, cheaply-copied struct, never held across an `.await`.

use parking_lot::Mutex;

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    uploads: u64,
    bytes_sent: u64,
}

/// A small set of counters a [`super::Fan`] updates as uploads complete.
/// Useful for callers that want basic observability without wiring up a
/// metrics backend.
#[derive(Debug, Default)]
pub struct Stats(Mutex<Counters>);

impl Stats {
    /// A fresh, zeroed counter set.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_upload(&self, bytes: u64) {
        let mut counters = self.0.lock();
        counters.uploads += 1;
        counters.bytes_sent += bytes;
    }

    /// Number of uploads completed so far.
    pub fn uploads(&self) -> u64 {
        self.0.lock().uploads
    }

    /// Total bytes sent across all completed uploads.
    pub fn bytes_sent(&self) -> u64 {
        self.0.lock().bytes_sent
    }
}
