//! A simple RAII timer for measuring the duration of a scope.

use crate::sinks::ProtocolMetricsSink;
use std::time::Instant;

/// Observes a commit-evaluation duration on `sink` when dropped.
pub struct Timer<'a> {
    sink: &'a dyn ProtocolMetricsSink,
    start: Instant,
}

impl<'a> Timer<'a> {
    /// Starts a timer that reports to `sink` once dropped.
    pub fn new(sink: &'a dyn ProtocolMetricsSink) -> Self {
        Self {
            sink,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.sink
            .observe_commit_duration(self.start.elapsed().as_secs_f64());
    }
}
