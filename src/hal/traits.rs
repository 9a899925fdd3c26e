use std::time::Duration;

use super::types::{DeviceResult, RxMetadata, StreamCommand, TxMetadata};
use crate::core::SampleBuffer;

/// Receive side of an opened device stream
pub trait RxStreamer: Send {
    /// Start or stop continuous streaming
    fn issue_command(&mut self, command: StreamCommand) -> DeviceResult<()>;

    /// Fill `buffer` with the next available samples.
    ///
    /// Blocks at most `timeout`. Returns the number of samples written and
    /// the metadata describing them; a timeout is reported through
    /// `ErrorCode::Timeout`, not as a failure.
    fn receive(&mut self, buffer: &mut SampleBuffer, timeout: Duration) -> (usize, RxMetadata);

    /// Largest number of samples a single receive may return
    fn max_samples_per_call(&self) -> usize;
}

/// Transmit side of an opened device stream
pub trait TxStreamer: Send {
    /// Queue `buffer` for transmission; returns the number of samples accepted
    fn send(&mut self, buffer: &SampleBuffer, metadata: &TxMetadata) -> DeviceResult<usize>;

    /// Largest number of samples a single send may accept
    fn max_samples_per_call(&self) -> usize;
}
