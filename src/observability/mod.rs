pub mod metrics;
pub mod monitor;

pub use metrics::{MetricsSnapshot, WorkerMetrics};
pub use monitor::HarnessMonitor;
