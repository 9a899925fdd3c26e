use num_complex::Complex32;
use serde::{Deserialize, Serialize};

use super::AnalysisError;

/// Which part of the samples enters the power estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnrMode {
    /// Complex magnitude, `|z|² = re² + im²`
    #[default]
    Complex,
    /// Real component only
    RealOnly,
}

impl SnrMode {
    fn power(&self, z: Complex32) -> f64 {
        match self {
            SnrMode::Complex => z.norm_sqr() as f64,
            SnrMode::RealOnly => (z.re as f64).powi(2),
        }
    }
}

/// `10·log10(mean|tx|² / mean|rx − tx|²)` over the samples both streams share.
///
/// Streams of different length are compared over the shorter one's length.
pub fn snr_db(tx: &[Complex32], rx: &[Complex32], mode: SnrMode) -> Result<f64, AnalysisError> {
    let n = tx.len().min(rx.len());
    if n == 0 {
        return Err(AnalysisError::Empty);
    }

    let mut signal = 0.0;
    let mut noise = 0.0;
    for (t, r) in tx[..n].iter().zip(&rx[..n]) {
        signal += mode.power(*t);
        noise += mode.power(*r - *t);
    }
    let signal_power = signal / n as f64;
    let noise_power = noise / n as f64;

    if noise_power == 0.0 {
        return Err(AnalysisError::NoNoisePower);
    }
    if signal_power == 0.0 {
        return Err(AnalysisError::NoSignalPower);
    }

    Ok(10.0 * (signal_power / noise_power).log10())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn real(values: &[f32]) -> Vec<Complex32> {
        values.iter().map(|&v| Complex32::new(v, 0.0)).collect()
    }

    #[test]
    fn test_identical_streams_have_no_noise() {
        let tx = real(&[1.0, -1.0, 1.0]);
        assert_eq!(snr_db(&tx, &tx, SnrMode::Complex), Err(AnalysisError::NoNoisePower));
    }

    #[test]
    fn test_known_ratio() {
        // Signal power 1, noise power 0.01 -> 20 dB
        let tx = real(&[1.0, -1.0, 1.0, -1.0]);
        let rx = real(&[1.1, -0.9, 1.1, -0.9]);

        let snr = snr_db(&tx, &rx, SnrMode::Complex).unwrap();
        assert!((snr - 20.0).abs() < 1e-4, "snr = {}", snr);
    }

    #[test]
    fn test_real_only_ignores_imaginary_error() {
        let tx = real(&[1.0, 1.0]);
        let rx = vec![Complex32::new(1.0, 0.5), Complex32::new(0.5, 0.0)];

        let complex = snr_db(&tx, &rx, SnrMode::Complex).unwrap();
        let real_only = snr_db(&tx, &rx, SnrMode::RealOnly).unwrap();
        assert!(real_only > complex);
    }

    #[test]
    fn test_silent_transmitter() {
        let tx = real(&[0.0, 0.0]);
        let rx = real(&[0.1, 0.0]);
        assert_eq!(snr_db(&tx, &rx, SnrMode::Complex), Err(AnalysisError::NoSignalPower));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(snr_db(&[], &real(&[1.0]), SnrMode::Complex), Err(AnalysisError::Empty));
    }
}
