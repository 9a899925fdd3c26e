use super::MetricsSnapshot;

/// Renders worker counters for the end-of-run summary
pub struct HarnessMonitor {
    snapshots: Vec<MetricsSnapshot>,
}

impl HarnessMonitor {
    pub fn new(snapshots: Vec<MetricsSnapshot>) -> Self {
        Self { snapshots }
    }

    pub fn generate_report(&self) -> String {
        if self.snapshots.is_empty() {
            return "No workers ran".to_string();
        }

        let mut report = String::from("=== Worker Metrics ===\n");

        for metrics in &self.snapshots {
            report.push_str(&format!("\n[{}]\n", metrics.worker_id));
            report.push_str(&format!(
                "  Buffers: {} logged ({} samples)\n",
                metrics.buffers_logged, metrics.samples_logged
            ));
            report.push_str(&format!("  Timeouts: {}\n", metrics.timeouts));
            report.push_str(&format!("  Errors: {}\n", metrics.errors));
            report.push_str(&format!("  Avg Call: {}μs\n", metrics.avg_call_us));
        }

        report
    }

    pub fn snapshots(&self) -> &[MetricsSnapshot] {
        &self.snapshots
    }
}
