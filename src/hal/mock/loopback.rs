use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use num_complex::Complex32;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::core::{CancellationSignal, DeviceClock, SampleBuffer, TimeSpec};
use crate::hal::{
    DeviceError, DeviceResult, RxMetadata, RxStreamer, StreamCommand, TxMetadata, TxStreamer,
};

/// Extra wait before a receive hands out samples, so packets pushed by the
/// transmit thread a little late are still merged into the right place.
const TRANSPORT_LATENCY: f64 = 0.002;

/// Settings of the simulated over-the-air path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopbackConfig {
    pub sample_rate: f64,
    pub samples_per_packet: usize,
    /// Propagation delay added between transmit and receive, in samples
    pub delay_samples: usize,
    /// Standard deviation of the additive Gaussian noise (per component)
    pub noise_std: f32,
    pub seed: u64,
    /// Packets the transport can hold before sends start failing
    pub queue_depth: usize,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            sample_rate: 1e6,
            samples_per_packet: 200,
            delay_samples: 0,
            noise_std: 0.0,
            seed: 0,
            queue_depth: 64,
        }
    }
}

struct Packet {
    time_spec: TimeSpec,
    samples: Vec<Complex32>,
}

/// Simulated device whose transmit output is wired to its receive input
pub struct LoopbackDevice {
    clock: Arc<dyn DeviceClock>,
    config: LoopbackConfig,
}

impl LoopbackDevice {
    pub fn new(clock: Arc<dyn DeviceClock>, config: LoopbackConfig) -> Self {
        Self { clock, config }
    }

    pub fn clock(&self) -> Arc<dyn DeviceClock> {
        self.clock.clone()
    }

    /// Open a connected transmit/receive streamer pair
    pub fn streamers(&self) -> (LoopbackTxStreamer, LoopbackRxStreamer) {
        let (packet_tx, packet_rx) = bounded(self.config.queue_depth.max(1));

        let tx = LoopbackTxStreamer {
            clock: self.clock.clone(),
            sample_rate: self.config.sample_rate,
            max_samples: self.config.samples_per_packet.max(1),
            packets: packet_tx,
            next_free: None,
            never: CancellationSignal::new(),
        };

        let noise = if self.config.noise_std > 0.0 {
            Normal::new(0.0f32, self.config.noise_std).ok()
        } else {
            None
        };

        let rx = LoopbackRxStreamer {
            clock: self.clock.clone(),
            sample_rate: self.config.sample_rate,
            samples_per_packet: self.config.samples_per_packet.max(1),
            delay_samples: self.config.delay_samples as i64,
            packets: packet_rx,
            pending: Vec::new(),
            start_at: None,
            cursor: 0,
            rng: StdRng::seed_from_u64(self.config.seed),
            noise,
        };

        (tx, rx)
    }
}

/// Transmit half of a [`LoopbackDevice`]
pub struct LoopbackTxStreamer {
    clock: Arc<dyn DeviceClock>,
    sample_rate: f64,
    max_samples: usize,
    packets: Sender<Packet>,
    /// Device time at which the current burst's next sample is due
    next_free: Option<TimeSpec>,
    never: CancellationSignal,
}

impl TxStreamer for LoopbackTxStreamer {
    fn send(&mut self, buffer: &SampleBuffer, metadata: &TxMetadata) -> DeviceResult<usize> {
        let count = buffer.len().min(self.max_samples);
        if count == 0 {
            return Ok(0);
        }

        // Timed sends play at the requested time; continuations follow the
        // previous packet back to back.
        let start = match (metadata.time_spec, self.next_free) {
            (Some(at), _) => at,
            (None, Some(next)) if !metadata.start_of_burst => next,
            (None, _) => self.clock.now(),
        };
        let airtime = count as f64 / self.sample_rate;

        self.clock.sleep_until(start, &self.never);

        let packet = Packet {
            time_spec: start,
            samples: buffer.as_slice()[..count].to_vec(),
        };

        match self.packets.try_send(packet) {
            Ok(()) => {}
            Err(TrySendError::Full(packet)) => {
                let wait = Duration::from_secs_f64(airtime).max(Duration::from_millis(1));
                if self.packets.send_timeout(packet, wait).is_err() {
                    return Err(DeviceError::Timeout("transport queue space".to_string()));
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                return Err(DeviceError::Other("receive side closed".to_string()));
            }
        }

        self.next_free = if metadata.end_of_burst {
            None
        } else {
            Some(start.offset(airtime))
        };

        log::trace!("loopback queued {} samples at {:.6}", count, start.as_secs());
        Ok(count)
    }

    fn max_samples_per_call(&self) -> usize {
        self.max_samples
    }
}

/// Receive half of a [`LoopbackDevice`]
pub struct LoopbackRxStreamer {
    clock: Arc<dyn DeviceClock>,
    sample_rate: f64,
    samples_per_packet: usize,
    delay_samples: i64,
    packets: Receiver<Packet>,
    /// Transmitted packets placed on the receive timeline by first sample index
    pending: Vec<(i64, Vec<Complex32>)>,
    start_at: Option<TimeSpec>,
    /// Index of the next sample to hand out, counted from `start_at`
    cursor: i64,
    rng: StdRng,
    noise: Option<Normal<f32>>,
}

impl LoopbackRxStreamer {
    fn drain_transport(&mut self) {
        let Some(start_at) = self.start_at else {
            // Nothing is listening yet; whatever was sent is lost
            while self.packets.try_recv().is_ok() {}
            return;
        };

        while let Ok(packet) = self.packets.try_recv() {
            let offset = (packet.time_spec.as_secs() - start_at.as_secs()) * self.sample_rate;
            let index = offset.round() as i64 + self.delay_samples;
            if index + (packet.samples.len() as i64) > self.cursor {
                self.pending.push((index, packet.samples));
            }
        }
    }

    fn fill(&mut self, out: &mut [Complex32]) {
        let first = self.cursor;
        let last = first + out.len() as i64;

        for sample in out.iter_mut() {
            *sample = Complex32::new(0.0, 0.0);
        }

        for (index, samples) in &self.pending {
            let begin = (*index).max(first);
            let end = (*index + samples.len() as i64).min(last);
            for i in begin..end {
                out[(i - first) as usize] += samples[(i - index) as usize];
            }
        }
        self.pending
            .retain(|(index, samples)| *index + samples.len() as i64 > last);

        if let Some(noise) = &self.noise {
            for sample in out.iter_mut() {
                sample.re += noise.sample(&mut self.rng);
                sample.im += noise.sample(&mut self.rng);
            }
        }

        self.cursor = last;
    }
}

impl RxStreamer for LoopbackRxStreamer {
    fn issue_command(&mut self, command: StreamCommand) -> DeviceResult<()> {
        match command {
            StreamCommand::StartContinuous { at } => self.start_at = Some(at),
            StreamCommand::StopContinuous => {
                if self.start_at.is_none() {
                    return Err(DeviceError::NotStarted);
                }
                self.start_at = None;
                self.pending.clear();
            }
        }
        self.cursor = 0;
        Ok(())
    }

    fn receive(&mut self, buffer: &mut SampleBuffer, timeout: Duration) -> (usize, RxMetadata) {
        let Some(start_at) = self.start_at else {
            std::thread::sleep(timeout);
            self.drain_transport();
            return (0, RxMetadata::timeout(self.clock.now()));
        };

        let count = self.samples_per_packet.min(buffer.len());
        let first_time = start_at.offset(self.cursor as f64 / self.sample_rate);
        let ready_at = first_time.offset(count as f64 / self.sample_rate + TRANSPORT_LATENCY);

        let now = self.clock.now();
        let wait = ready_at.remaining_from(now);
        if wait > timeout {
            std::thread::sleep(timeout);
            self.drain_transport();
            return (0, RxMetadata::timeout(self.clock.now()));
        }
        std::thread::sleep(wait);

        self.drain_transport();
        self.fill(&mut buffer.as_mut_slice()[..count]);
        (count, RxMetadata::ok(first_time))
    }

    fn max_samples_per_call(&self) -> usize {
        self.samples_per_packet
    }
}
