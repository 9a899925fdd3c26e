use num_complex::Complex32;
use serde::{Deserialize, Serialize};

use super::TimeSpec;

/// Outcome of a single device transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Transfer completed, buffer is valid
    None,
    /// No samples within the receive timeout (expected before the start time)
    Timeout,
    /// Any other device-reported condition (overflow, late command, ...)
    Other,
}

impl ErrorCode {
    pub fn is_ok(&self) -> bool {
        matches!(self, ErrorCode::None)
    }
}

/// Timestamp and status recorded alongside every logged buffer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub time_spec: TimeSpec,
    pub error_code: ErrorCode,
}

impl Metadata {
    pub fn ok(time_spec: TimeSpec) -> Self {
        Self {
            time_spec,
            error_code: ErrorCode::None,
        }
    }
}

/// Fixed-length run of complex samples
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleBuffer {
    samples: Vec<Complex32>,
}

impl SampleBuffer {
    pub fn new(samples: Vec<Complex32>) -> Self {
        Self { samples }
    }

    pub fn zeroed(len: usize) -> Self {
        Self {
            samples: vec![Complex32::new(0.0, 0.0); len],
        }
    }

    /// Build from real-valued samples (imaginary part zero)
    pub fn from_real(values: &[f32]) -> Self {
        Self {
            samples: values.iter().map(|&re| Complex32::new(re, 0.0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[Complex32] {
        &self.samples
    }

    pub fn as_mut_slice(&mut self) -> &mut [Complex32] {
        &mut self.samples
    }

    /// Keep only the first `len` samples
    pub fn truncate(&mut self, len: usize) {
        self.samples.truncate(len);
    }

    /// Copy of the first `len` samples
    pub fn truncated(&self, len: usize) -> Self {
        Self {
            samples: self.samples[..len.min(self.samples.len())].to_vec(),
        }
    }

    pub fn into_inner(self) -> Vec<Complex32> {
        self.samples
    }
}

impl From<Vec<Complex32>> for SampleBuffer {
    fn from(samples: Vec<Complex32>) -> Self {
        Self::new(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_real_zeroes_imag() {
        let buffer = SampleBuffer::from_real(&[1.0, -1.0]);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.as_slice()[1], Complex32::new(-1.0, 0.0));
    }

    #[test]
    fn test_truncated_clamps_length() {
        let buffer = SampleBuffer::from_real(&[1.0, 2.0, 3.0]);
        assert_eq!(buffer.truncated(2).len(), 2);
        assert_eq!(buffer.truncated(10).len(), 3);
    }
}
