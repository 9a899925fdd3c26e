pub mod correlator;
pub mod snr;

pub use correlator::{cross_correlate, estimate_lag};
pub use snr::{snr_db, SnrMode};

use num_complex::Complex32;
use serde::Serialize;

use crate::core::ResultLog;

/// Failures of the offline analysis stage
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum AnalysisError {
    #[error("no samples to compare")]
    Empty,

    #[error("noise power is zero; received stream equals transmitted stream")]
    NoNoisePower,

    #[error("signal power is zero; transmitted stream is silent")]
    NoSignalPower,
}

/// Lag and SNR estimates for one run
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationReport {
    pub tx_samples: usize,
    pub rx_samples: usize,
    /// Lag of maximum real-part correlation; positive when rx trails tx
    pub lag_real: i64,
    /// Same for the imaginary part, when both streams carry any
    pub lag_imag: Option<i64>,
    pub correlation_real: Vec<f64>,
    pub correlation_imag: Vec<f64>,
    pub snr_db: Result<f64, AnalysisError>,
}

#[derive(Debug, Clone, Serialize)]
pub enum AnalysisOutcome {
    /// One of the logs held no samples; nothing was computed
    NoData,
    Report(CorrelationReport),
}

impl AnalysisOutcome {
    pub fn report(&self) -> Option<&CorrelationReport> {
        match self {
            AnalysisOutcome::Report(report) => Some(report),
            AnalysisOutcome::NoData => None,
        }
    }
}

/// All buffers of a log, in log order, as one sample stream
pub fn concatenate(log: &ResultLog) -> Vec<Complex32> {
    let mut samples = Vec::with_capacity(log.total_samples());
    for buffer in log.buffers() {
        samples.extend_from_slice(buffer.as_slice());
    }
    samples
}

/// Split a sample stream into real and imaginary sequences
pub fn split_components(samples: &[Complex32]) -> (Vec<f64>, Vec<f64>) {
    samples
        .iter()
        .map(|s| (s.re as f64, s.im as f64))
        .unzip()
}

/// Correlate the transmitted and received logs of a run.
///
/// An empty log on either side yields [`AnalysisOutcome::NoData`].
pub fn analyze(tx_log: &ResultLog, rx_log: &ResultLog, mode: SnrMode) -> AnalysisOutcome {
    let tx = concatenate(tx_log);
    let rx = concatenate(rx_log);

    if tx.is_empty() || rx.is_empty() {
        log::warn!(
            "no data to correlate ({} tx samples, {} rx samples)",
            tx.len(),
            rx.len()
        );
        return AnalysisOutcome::NoData;
    }

    let (tx_real, tx_imag) = split_components(&tx);
    let (rx_real, rx_imag) = split_components(&rx);

    let correlation_real = cross_correlate(&tx_real, &rx_real);
    let correlation_imag = cross_correlate(&tx_imag, &rx_imag);

    let lag_real = correlator::argmax_abs(&correlation_real)
        .map(|i| correlator::index_to_lag(i, tx.len()))
        .unwrap_or(0);

    let carries_imag = |v: &[f64]| v.iter().any(|&x| x != 0.0);
    let lag_imag = if carries_imag(&tx_imag) && carries_imag(&rx_imag) {
        correlator::argmax_abs(&correlation_imag).map(|i| correlator::index_to_lag(i, tx.len()))
    } else {
        None
    };

    let snr = snr_db(&tx, &rx, mode);

    log::info!("maximum correlation for real part: lag = {} samples", lag_real);
    if let Some(lag) = lag_imag {
        log::info!("maximum correlation for imaginary part: lag = {} samples", lag);
    }
    match &snr {
        Ok(db) => log::info!("SNR: {:.2} dB", db),
        Err(e) => log::warn!("SNR unavailable: {}", e),
    }

    AnalysisOutcome::Report(CorrelationReport {
        tx_samples: tx.len(),
        rx_samples: rx.len(),
        lag_real,
        lag_imag,
        correlation_real,
        correlation_imag,
        snr_db: snr,
    })
}
