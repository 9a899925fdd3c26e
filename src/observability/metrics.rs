use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters of one worker, updated from its thread and read from anywhere
pub struct WorkerMetrics {
    worker_id: String,
    buffers_logged: AtomicU64,
    samples_logged: AtomicU64,
    timeouts: AtomicU64,
    errors: AtomicU64,
    total_call_us: AtomicU64,
    calls: AtomicU64,
}

impl WorkerMetrics {
    pub fn new(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            buffers_logged: AtomicU64::new(0),
            samples_logged: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            total_call_us: AtomicU64::new(0),
            calls: AtomicU64::new(0),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn buffers_logged(&self) -> u64 {
        self.buffers_logged.load(Ordering::Relaxed)
    }

    pub fn samples_logged(&self) -> u64 {
        self.samples_logged.load(Ordering::Relaxed)
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn record_logged(&self, samples: usize) {
        self.buffers_logged.fetch_add(1, Ordering::Relaxed);
        self.samples_logged.fetch_add(samples as u64, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn start_call(&self) -> Instant {
        Instant::now()
    }

    pub fn finish_call(&self, start: Instant) {
        let elapsed_us = start.elapsed().as_micros() as u64;
        self.total_call_us.fetch_add(elapsed_us, Ordering::Relaxed);
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Mean time spent blocked in a device call
    pub fn avg_call_us(&self) -> u64 {
        let calls = self.calls.load(Ordering::Relaxed);
        if calls == 0 {
            return 0;
        }
        self.total_call_us.load(Ordering::Relaxed) / calls
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            worker_id: self.worker_id.clone(),
            buffers_logged: self.buffers_logged(),
            samples_logged: self.samples_logged(),
            timeouts: self.timeouts(),
            errors: self.errors(),
            avg_call_us: self.avg_call_us(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub worker_id: String,
    pub buffers_logged: u64,
    pub samples_logged: u64,
    pub timeouts: u64,
    pub errors: u64,
    pub avg_call_us: u64,
}
