use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::{
    CancellationSignal, DeviceClock, LogSink, Metadata, ResultLog, SampleBuffer, TimeSpec,
};
use crate::hal::{TxMetadata, TxStreamer};
use crate::observability::WorkerMetrics;

/// How the transmit worker lines its first send up with the start time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStartPolicy {
    /// Sleep until the clock reaches the start time, then send. The first
    /// packet may leave up to one sleep slice after the start time.
    #[default]
    WaitUntil,

    /// Send right away with the start time in the metadata and let the
    /// transport hold the packet back.
    Timestamped,
}

/// Repeatedly transmits one waveform until the run is cancelled
pub struct TxWorker {
    streamer: Box<dyn TxStreamer>,
    waveform: SampleBuffer,
    time_spec: TimeSpec,
    cancel: CancellationSignal,
    clock: Arc<dyn DeviceClock>,
    policy: TxStartPolicy,
    metrics: Arc<WorkerMetrics>,
}

impl TxWorker {
    pub fn new(
        streamer: Box<dyn TxStreamer>,
        waveform: SampleBuffer,
        time_spec: TimeSpec,
        cancel: CancellationSignal,
        clock: Arc<dyn DeviceClock>,
    ) -> Self {
        Self {
            streamer,
            waveform,
            time_spec,
            cancel,
            clock,
            policy: TxStartPolicy::default(),
            metrics: Arc::new(WorkerMetrics::new("tx")),
        }
    }

    pub fn with_policy(mut self, policy: TxStartPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn metrics(&self) -> Arc<WorkerMetrics> {
        self.metrics.clone()
    }

    /// Run to cancellation and hand back everything that was sent
    pub fn run(self) -> ResultLog {
        let mut log = ResultLog::new();
        self.run_into(&mut log);
        log
    }

    /// Run to cancellation, appending every sent packet to `sink`.
    ///
    /// The waveform is cut into packets no longer than the streamer accepts
    /// per call and sent cyclically. Samples left over by a partial or failed
    /// send go out in the next call, so the stream stays contiguous.
    pub fn run_into<S: LogSink>(mut self, sink: &mut S) {
        if self.waveform.is_empty() {
            log::warn!("transmit worker has an empty waveform; nothing to send");
            return;
        }

        let packet_len = self.streamer.max_samples_per_call().max(1);
        let packets: Vec<SampleBuffer> = self
            .waveform
            .as_slice()
            .chunks(packet_len)
            .map(|chunk| SampleBuffer::new(chunk.to_vec()))
            .collect();

        log::info!(
            "transmit worker starting: {} samples in {} packets, start at {:.6}s ({:?})",
            self.waveform.len(),
            packets.len(),
            self.time_spec.as_secs(),
            self.policy
        );

        if self.policy == TxStartPolicy::WaitUntil
            && !self.clock.sleep_until(self.time_spec, &self.cancel)
        {
            log::info!("transmit worker cancelled before start time");
            return;
        }

        let mut next_packet = 0;
        let mut leftover: Option<SampleBuffer> = None;
        let mut burst_started = false;

        while !self.cancel.is_set() {
            let buffer = leftover
                .take()
                .unwrap_or_else(|| packets[next_packet].clone());
            let metadata = if burst_started {
                TxMetadata::continuation()
            } else {
                TxMetadata::timed(self.time_spec)
            };

            let start = self.metrics.start_call();
            let result = self.streamer.send(&buffer, &metadata);
            self.metrics.finish_call(start);

            match result {
                Ok(sent) if sent > 0 => {
                    burst_started = true;
                    let stamp = metadata.time_spec.unwrap_or_else(|| self.clock.now());
                    log::trace!("sent packet at {:.6}s size: {}", stamp.as_secs(), sent);

                    let logged = if sent < buffer.len() {
                        leftover = Some(SampleBuffer::new(buffer.as_slice()[sent..].to_vec()));
                        buffer.truncated(sent)
                    } else {
                        next_packet = (next_packet + 1) % packets.len();
                        buffer
                    };
                    if sink.append(logged, Metadata::ok(stamp)) {
                        self.metrics.record_logged(sent);
                    }
                }
                Ok(_) => {
                    self.metrics.record_error();
                    log::debug!("transmit accepted no samples");
                    leftover = Some(buffer);
                }
                Err(e) => {
                    self.metrics.record_error();
                    log::debug!("transmit failed: {}", e);
                    leftover = Some(buffer);
                }
            }
        }

        log::info!(
            "transmit worker stopped: {} buffers sent, {} failures",
            self.metrics.buffers_logged(),
            self.metrics.errors()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ManualClock;
    use crate::hal::mock::ScriptedTxStreamer;
    use crate::hal::DeviceError;
    use std::time::Duration;

    fn spawn_worker(
        streamer: ScriptedTxStreamer,
        policy: TxStartPolicy,
        clock: Arc<dyn DeviceClock>,
        start: TimeSpec,
    ) -> (CancellationSignal, std::thread::JoinHandle<ResultLog>) {
        let cancel = CancellationSignal::new();
        let worker = TxWorker::new(
            Box::new(streamer),
            SampleBuffer::from_real(&[1.0, 1.0, 1.0, 1.0]),
            start,
            cancel.clone(),
            clock,
        )
        .with_policy(policy);
        let handle = std::thread::spawn(move || worker.run());
        (cancel, handle)
    }

    #[test]
    fn test_failed_sends_are_not_logged() {
        let streamer = ScriptedTxStreamer::new(vec![
            Err(DeviceError::Other("late".into())),
            Ok(0),
            Ok(4),
            Ok(2),
        ]);
        let counters = streamer.counters();
        let clock = Arc::new(ManualClock::new(TimeSpec::from_secs(1.0)));
        let (cancel, handle) =
            spawn_worker(streamer, TxStartPolicy::Timestamped, clock, TimeSpec::from_secs(0.0));

        while counters.calls() < 6 {
            std::thread::sleep(Duration::from_millis(1));
        }
        cancel.set();
        let log = handle.join().unwrap();

        // Two scripted failures, then every call succeeds
        assert_eq!(log.len() as u64, counters.calls() - 2);
        assert_eq!(log.entries()[0].buffer.len(), 4);
        assert_eq!(log.entries()[1].buffer.len(), 2);
        assert_eq!(log.entries()[0].metadata.time_spec, TimeSpec::from_secs(0.0));
    }

    #[test]
    fn test_wait_until_holds_first_send() {
        let streamer = ScriptedTxStreamer::new(Vec::new());
        let counters = streamer.counters();
        let clock = ManualClock::new(TimeSpec::from_secs(0.0));
        let (cancel, handle) = spawn_worker(
            streamer,
            TxStartPolicy::WaitUntil,
            Arc::new(clock.clone()),
            TimeSpec::from_secs(2.0),
        );

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(counters.calls(), 0);

        clock.set(TimeSpec::from_secs(2.0));
        while counters.calls() == 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
        cancel.set();
        let log = handle.join().unwrap();
        assert!(!log.is_empty());
    }

    #[test]
    fn test_cancel_before_start_sends_nothing() {
        let streamer = ScriptedTxStreamer::new(Vec::new());
        let counters = streamer.counters();
        let clock = Arc::new(ManualClock::new(TimeSpec::from_secs(0.0)));
        let (cancel, handle) =
            spawn_worker(streamer, TxStartPolicy::WaitUntil, clock, TimeSpec::from_secs(60.0));

        cancel.set();
        let log = handle.join().unwrap();
        assert!(log.is_empty());
        assert_eq!(counters.calls(), 0);
    }

    #[test]
    fn test_waveform_split_to_packet_limit() {
        let streamer = ScriptedTxStreamer::new(vec![Ok(3)]).with_max_samples(4);
        let counters = streamer.counters();
        let values: Vec<f32> = (0..10).map(|v| v as f32).collect();
        let cancel = CancellationSignal::new();
        let worker = TxWorker::new(
            Box::new(streamer),
            SampleBuffer::from_real(&values),
            TimeSpec::from_secs(5.0),
            cancel.clone(),
            Arc::new(ManualClock::new(TimeSpec::from_secs(0.0))),
        )
        .with_policy(TxStartPolicy::Timestamped);
        let handle = std::thread::spawn(move || worker.run());

        while counters.calls() < 8 {
            std::thread::sleep(Duration::from_millis(1));
        }
        cancel.set();
        let log = handle.join().unwrap();

        let sends = counters.sends();
        // Partial first send, its remainder, then whole packets in order
        let lengths: Vec<usize> = sends.iter().take(6).map(|(len, _)| *len).collect();
        assert_eq!(lengths, vec![4, 1, 4, 2, 4, 4]);

        let (_, first) = sends[0];
        assert_eq!(first.time_spec, Some(TimeSpec::from_secs(5.0)));
        assert!(first.start_of_burst);
        assert!(sends[1..]
            .iter()
            .all(|(_, m)| *m == TxMetadata::continuation()));

        let stream: Vec<f32> = log
            .buffers()
            .flat_map(|b| b.as_slice().iter().map(|s| s.re))
            .take(20)
            .collect();
        let expected: Vec<f32> = values.iter().copied().cycle().take(20).collect();
        assert_eq!(stream, expected);
    }
}
