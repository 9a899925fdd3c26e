use std::sync::Arc;
use std::time::Duration;

use crate::core::{
    CancellationSignal, ErrorCode, LogSink, Metadata, ResultLog, SampleBuffer, TimeSpec,
};
use crate::hal::{RxStreamer, StreamCommand, StreamState};
use crate::observability::WorkerMetrics;
use crate::resilience::RxErrorPolicy;

/// Default upper bound on a single blocking receive
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Streams samples from a timed start until the run is cancelled
pub struct RxWorker {
    streamer: Box<dyn RxStreamer>,
    time_spec: TimeSpec,
    cancel: CancellationSignal,
    timeout: Duration,
    policy: RxErrorPolicy,
    state: StreamState,
    metrics: Arc<WorkerMetrics>,
}

impl RxWorker {
    pub fn new(
        streamer: Box<dyn RxStreamer>,
        time_spec: TimeSpec,
        cancel: CancellationSignal,
    ) -> Self {
        Self {
            streamer,
            time_spec,
            cancel,
            timeout: DEFAULT_RECV_TIMEOUT,
            policy: RxErrorPolicy::default(),
            state: StreamState::Idle,
            metrics: Arc::new(WorkerMetrics::new("rx")),
        }
    }

    /// Receive timeout; bounds how long cancellation can go unnoticed
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_error_policy(mut self, policy: RxErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn metrics(&self) -> Arc<WorkerMetrics> {
        self.metrics.clone()
    }

    /// Run to cancellation and hand back every valid buffer received
    pub fn run(self) -> ResultLog {
        let mut log = ResultLog::new();
        self.run_into(&mut log);
        log
    }

    /// Run to cancellation, appending valid buffers to `sink`.
    ///
    /// The stop command is issued exactly once before returning, whether or
    /// not the start command succeeded or any buffer arrived. Returns the
    /// final stream state.
    pub fn run_into<S: LogSink>(mut self, sink: &mut S) -> StreamState {
        let start = StreamCommand::StartContinuous { at: self.time_spec };
        log::info!("receive worker issuing {:?}", start);

        match self.streamer.issue_command(start) {
            Ok(()) => {
                self.advance(StreamState::Streaming);
                self.stream(sink);
            }
            Err(e) => log::error!("failed to start receive stream: {}", e),
        }

        if let Err(e) = self.streamer.issue_command(StreamCommand::StopContinuous) {
            log::warn!("failed to stop receive stream: {}", e);
        }
        self.advance(StreamState::Stopped);

        log::info!(
            "receive worker stopped: {} buffers ({} samples), {} timeouts, {} errors",
            self.metrics.buffers_logged(),
            self.metrics.samples_logged(),
            self.metrics.timeouts(),
            self.metrics.errors()
        );
        self.state
    }

    fn stream<S: LogSink>(&mut self, sink: &mut S) {
        let capacity = self.streamer.max_samples_per_call().max(1);
        let mut buffer = SampleBuffer::zeroed(capacity);

        while !self.cancel.is_set() {
            let call = self.metrics.start_call();
            let (count, metadata) = self.streamer.receive(&mut buffer, self.timeout);
            self.metrics.finish_call(call);

            match metadata.error_code {
                ErrorCode::None => {
                    if count == 0 {
                        continue;
                    }
                    log::trace!(
                        "recv packet at {:.6}s size: {}",
                        metadata.time_spec.as_secs(),
                        count
                    );
                    let mut filled = std::mem::replace(&mut buffer, SampleBuffer::zeroed(capacity));
                    filled.truncate(count);
                    if sink.append(filled, Metadata::ok(metadata.time_spec)) {
                        self.metrics.record_logged(count);
                    }
                }
                // Expected until the device clock reaches the start time
                ErrorCode::Timeout => self.metrics.record_timeout(),
                ErrorCode::Other => {
                    self.metrics.record_error();
                    log::warn!(
                        "receive error at {:.6}s: {}",
                        metadata.time_spec.as_secs(),
                        metadata.detail.unwrap_or("unspecified")
                    );
                    if self.policy.aborts() {
                        log::error!("aborting receive loop after device error");
                        break;
                    }
                }
            }
        }
    }

    fn advance(&mut self, target: StreamState) {
        if let Err(e) = self.state.transition_to(target) {
            log::error!("{}", e);
        }
    }
}
