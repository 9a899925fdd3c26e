use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::thread;

use crate::analysis::{self, AnalysisOutcome};
use crate::config::HarnessConfig;
use crate::core::{
    CancellationSignal, DeviceClock, ResultLog, SampleBuffer, ScheduleClock, TimeSpec,
};
use crate::engine::{RxWorker, TxWorker};
use crate::hal::{RxStreamer, TxStreamer};
use crate::observability::{HarnessMonitor, MetricsSnapshot};

/// Everything a finished run hands to the analysis stage
#[derive(Debug, Clone)]
pub struct HarnessOutput {
    pub time_spec: TimeSpec,
    pub tx_log: ResultLog,
    pub rx_log: ResultLog,
    pub tx_metrics: MetricsSnapshot,
    pub rx_metrics: MetricsSnapshot,
}

impl HarnessOutput {
    pub fn analyze(&self, config: &HarnessConfig) -> AnalysisOutcome {
        analysis::analyze(&self.tx_log, &self.rx_log, config.snr_mode)
    }

    pub fn monitor(&self) -> HarnessMonitor {
        HarnessMonitor::new(vec![self.tx_metrics.clone(), self.rx_metrics.clone()])
    }
}

/// Runs one synchronized transmit/receive pass
#[derive(Clone)]
pub struct Coordinator {
    schedule: ScheduleClock,
    config: HarnessConfig,
}

impl Coordinator {
    pub fn new(clock: Arc<dyn DeviceClock>, config: HarnessConfig) -> Self {
        Self {
            schedule: ScheduleClock::new(clock),
            config,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Start both workers on a shared start time, let them run for the
    /// configured window, cancel, and join.
    ///
    /// Returns only after both worker threads have exited, so the logs are
    /// final.
    pub fn run(
        &self,
        tx: Box<dyn TxStreamer>,
        rx: Box<dyn RxStreamer>,
        waveform: SampleBuffer,
    ) -> Result<HarnessOutput> {
        let time_spec = self.schedule.schedule(self.config.lead_time_s);
        let cancel = CancellationSignal::new();

        log::info!(
            "scheduled start at {:.6}s (now {:.6}s), running for {:.3}s",
            time_spec.as_secs(),
            self.schedule.now().as_secs(),
            self.config.test_duration_s
        );

        let rx_worker = RxWorker::new(rx, time_spec, cancel.clone())
            .with_timeout(self.config.recv_timeout())
            .with_error_policy(self.config.rx_error_policy);
        let tx_worker = TxWorker::new(
            tx,
            waveform,
            time_spec,
            cancel.clone(),
            self.schedule.clock(),
        )
        .with_policy(self.config.tx_start_policy);

        let rx_metrics = rx_worker.metrics();
        let tx_metrics = tx_worker.metrics();

        let rx_handle = thread::Builder::new()
            .name("rx_stream".to_string())
            .spawn(move || rx_worker.run())
            .context("failed to spawn receive worker")?;

        let tx_handle = match thread::Builder::new()
            .name("tx_stream".to_string())
            .spawn(move || tx_worker.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                cancel.set();
                let _ = rx_handle.join();
                return Err(e).context("failed to spawn transmit worker");
            }
        };

        log::debug!("workers started");

        thread::sleep(self.config.run_window());
        cancel.set();

        let rx_result = rx_handle.join();
        let tx_result = tx_handle.join();
        log::debug!("workers joined");

        let rx_log = rx_result.map_err(|_| anyhow!("receive worker panicked"))?;
        let tx_log = tx_result.map_err(|_| anyhow!("transmit worker panicked"))?;

        Ok(HarnessOutput {
            time_spec,
            tx_log,
            rx_log,
            tx_metrics: tx_metrics.snapshot(),
            rx_metrics: rx_metrics.snapshot(),
        })
    }

    /// [`Coordinator::run`] on the blocking thread pool, for async callers
    pub async fn run_async(
        self,
        tx: Box<dyn TxStreamer>,
        rx: Box<dyn RxStreamer>,
        waveform: SampleBuffer,
    ) -> Result<HarnessOutput> {
        tokio::task::spawn_blocking(move || self.run(tx, rx, waveform))
            .await
            .context("harness task failed")?
    }
}
