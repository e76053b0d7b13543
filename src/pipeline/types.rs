use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Events buffered before a batch is forced out.
    pub batch_size: usize,
    /// Cadence of time-based batch flushes; the frequency flusher runs at
    /// twice this interval.
    pub flush_interval: Duration,
    /// Bound on the event queue; producers drop instead of blocking.
    pub queue_capacity: usize,
    /// Smallest aggregated delta at which a discovered query becomes an
    /// index candidate.
    pub min_term_frequency: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            flush_interval: Duration::from_secs(30),
            queue_capacity: 10_000,
            min_term_frequency: 1,
        }
    }
}

impl PipelineConfig {
    /// Replaces zero fields with their defaults.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.batch_size == 0 {
            self.batch_size = defaults.batch_size;
        }
        if self.flush_interval.is_zero() {
            self.flush_interval = defaults.flush_interval;
        }
        if self.queue_capacity == 0 {
            self.queue_capacity = defaults.queue_capacity;
        }
        self
    }
}

#[derive(Debug, Serialize)]
pub struct PipelineStats {
    pub queue_length: usize,
    pub pending_updates: usize,
    pub batch_size: usize,
    pub flush_interval: String,
}
