use num_complex::Complex32;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::{CancellationSignal, SampleBuffer, TimeSpec};
use crate::hal::{
    DeviceError, DeviceResult, RxMetadata, RxStreamer, StreamCommand, TxMetadata, TxStreamer,
};

/// One scripted receive result
#[derive(Debug, Clone)]
pub enum RxStep {
    Samples(Vec<Complex32>),
    Timeout,
    Error(&'static str),
}

/// Call counters shared between a fake streamer and the test observing it
#[derive(Debug, Default)]
pub struct StreamCounters {
    start_commands: AtomicU64,
    stop_commands: AtomicU64,
    calls: AtomicU64,
    calls_after_stop: AtomicU64,
    calls_after_cancel: AtomicU64,
    dropped: AtomicBool,
    sends: Mutex<Vec<(usize, TxMetadata)>>,
}

impl StreamCounters {
    pub fn start_commands(&self) -> u64 {
        self.start_commands.load(Ordering::SeqCst)
    }

    pub fn stop_commands(&self) -> u64 {
        self.stop_commands.load(Ordering::SeqCst)
    }

    /// Receive or send calls made so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_after_stop(&self) -> u64 {
        self.calls_after_stop.load(Ordering::SeqCst)
    }

    /// Calls that began while the watched cancellation signal was already set
    pub fn calls_after_cancel(&self) -> u64 {
        self.calls_after_cancel.load(Ordering::SeqCst)
    }

    /// Whether the owning worker has released the streamer
    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Length and metadata of every send, in call order
    pub fn sends(&self) -> Vec<(usize, TxMetadata)> {
        self.sends
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record_send(&self, len: usize, metadata: TxMetadata) {
        self.sends
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((len, metadata));
    }

    fn record_call(&self, stopped: bool, cancel: Option<&CancellationSignal>) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if stopped {
            self.calls_after_stop.fetch_add(1, Ordering::SeqCst);
        }
        if cancel.map_or(false, |c| c.is_set()) {
            self.calls_after_cancel.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Receive streamer that replays a fixed script, then times out forever
pub struct ScriptedRxStreamer {
    steps: VecDeque<RxStep>,
    max_samples: usize,
    counters: Arc<StreamCounters>,
    watch: Option<CancellationSignal>,
    stopped: bool,
    next_time: f64,
}

impl ScriptedRxStreamer {
    pub fn new(steps: Vec<RxStep>, max_samples: usize) -> Self {
        Self {
            steps: steps.into(),
            max_samples,
            counters: Arc::new(StreamCounters::default()),
            watch: None,
            stopped: false,
            next_time: 0.0,
        }
    }

    /// Count calls made after `cancel` was raised
    pub fn watch_cancel(mut self, cancel: CancellationSignal) -> Self {
        self.watch = Some(cancel);
        self
    }

    pub fn counters(&self) -> Arc<StreamCounters> {
        self.counters.clone()
    }
}

impl RxStreamer for ScriptedRxStreamer {
    fn issue_command(&mut self, command: StreamCommand) -> DeviceResult<()> {
        if command.is_start() {
            self.counters.start_commands.fetch_add(1, Ordering::SeqCst);
        } else {
            self.counters.stop_commands.fetch_add(1, Ordering::SeqCst);
            self.stopped = true;
        }
        Ok(())
    }

    fn receive(&mut self, buffer: &mut SampleBuffer, timeout: Duration) -> (usize, RxMetadata) {
        self.counters.record_call(self.stopped, self.watch.as_ref());
        let stamp = TimeSpec::from_secs(self.next_time);

        match self.steps.pop_front() {
            Some(RxStep::Samples(samples)) => {
                let count = samples.len().min(buffer.len());
                buffer.as_mut_slice()[..count].copy_from_slice(&samples[..count]);
                self.next_time += count as f64;
                (count, RxMetadata::ok(stamp))
            }
            Some(RxStep::Timeout) => (0, RxMetadata::timeout(stamp)),
            Some(RxStep::Error(detail)) => (0, RxMetadata::other(stamp, detail)),
            None => {
                std::thread::sleep(timeout.min(Duration::from_millis(2)));
                (0, RxMetadata::timeout(stamp))
            }
        }
    }

    fn max_samples_per_call(&self) -> usize {
        self.max_samples
    }
}

impl Drop for ScriptedRxStreamer {
    fn drop(&mut self) {
        self.counters.dropped.store(true, Ordering::SeqCst);
    }
}

/// Transmit streamer that accepts everything after a scripted prefix of results
pub struct ScriptedTxStreamer {
    results: VecDeque<DeviceResult<usize>>,
    fail_all: bool,
    max_samples: usize,
    pace: Duration,
    counters: Arc<StreamCounters>,
    watch: Option<CancellationSignal>,
}

impl ScriptedTxStreamer {
    pub fn new(results: Vec<DeviceResult<usize>>) -> Self {
        Self {
            results: results.into(),
            fail_all: false,
            max_samples: usize::MAX,
            pace: Duration::from_micros(200),
            counters: Arc::new(StreamCounters::default()),
            watch: None,
        }
    }

    /// Fail every send with a device error
    pub fn failing() -> Self {
        let mut streamer = Self::new(Vec::new());
        streamer.fail_all = true;
        streamer
    }

    pub fn watch_cancel(mut self, cancel: CancellationSignal) -> Self {
        self.watch = Some(cancel);
        self
    }

    /// Advertise and enforce a per-send sample limit
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples.max(1);
        self
    }

    pub fn counters(&self) -> Arc<StreamCounters> {
        self.counters.clone()
    }
}

impl TxStreamer for ScriptedTxStreamer {
    fn send(&mut self, buffer: &SampleBuffer, metadata: &TxMetadata) -> DeviceResult<usize> {
        self.counters.record_call(false, self.watch.as_ref());
        self.counters.record_send(buffer.len(), *metadata);
        std::thread::sleep(self.pace);
        if self.fail_all {
            return Err(DeviceError::Other("tx failure".to_string()));
        }
        self.results
            .pop_front()
            .unwrap_or(Ok(buffer.len().min(self.max_samples)))
    }

    fn max_samples_per_call(&self) -> usize {
        self.max_samples
    }
}

impl Drop for ScriptedTxStreamer {
    fn drop(&mut self) {
        self.counters.dropped.store(true, Ordering::SeqCst);
    }
}
