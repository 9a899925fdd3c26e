use serde::{Deserialize, Serialize};

use crate::core::{ErrorCode, TimeSpec};

/// Command accepted by a receive streamer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StreamCommand {
    /// Stream continuously, starting at the given device time
    StartContinuous { at: TimeSpec },
    /// Stop a continuous stream
    StopContinuous,
}

impl StreamCommand {
    pub fn is_start(&self) -> bool {
        !matches!(self, StreamCommand::StopContinuous)
    }
}

/// Metadata handed to the transport with each send
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TxMetadata {
    /// Deliver no earlier than this device time; `None` sends immediately
    pub time_spec: Option<TimeSpec>,
    /// First packet of a burst; untimed bursts start at the current time
    pub start_of_burst: bool,
    pub end_of_burst: bool,
}

impl TxMetadata {
    pub fn timed(time_spec: TimeSpec) -> Self {
        Self {
            time_spec: Some(time_spec),
            start_of_burst: true,
            end_of_burst: false,
        }
    }

    /// Continuation of a burst already in flight
    pub fn continuation() -> Self {
        Self::default()
    }
}

/// Metadata filled in by the device for each receive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RxMetadata {
    /// Device time of the first sample in the buffer
    pub time_spec: TimeSpec,
    pub error_code: ErrorCode,
    /// Free-form detail accompanying `ErrorCode::Other`
    pub detail: Option<&'static str>,
}

impl RxMetadata {
    pub fn ok(time_spec: TimeSpec) -> Self {
        Self {
            time_spec,
            error_code: ErrorCode::None,
            detail: None,
        }
    }

    pub fn timeout(time_spec: TimeSpec) -> Self {
        Self {
            time_spec,
            error_code: ErrorCode::Timeout,
            detail: None,
        }
    }

    pub fn other(time_spec: TimeSpec, detail: &'static str) -> Self {
        Self {
            time_spec,
            error_code: ErrorCode::Other,
            detail: Some(detail),
        }
    }
}

/// Failure of a send or a stream command
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeviceError {
    #[error("Timeout waiting for {0}")]
    Timeout(String),

    #[error("Stream not started")]
    NotStarted,

    #[error("Device error: {0}")]
    Other(String),
}

pub type DeviceResult<T> = Result<T, DeviceError>;
