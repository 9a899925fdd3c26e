use num_complex::Complex64;
use rustfft::FftPlanner;

/// Above this many multiply-adds the FFT path is used
const DIRECT_LIMIT: usize = 1 << 18;

/// Full linear cross-correlation.
///
/// `c[i] = Σ_n x[n] · y[n + i − (len(x) − 1)]`, with `len(x) + len(y) − 1`
/// outputs. Index `len(x) − 1` is zero lag; larger indices mean `y` trails `x`.
pub fn cross_correlate(x: &[f64], y: &[f64]) -> Vec<f64> {
    if x.is_empty() || y.is_empty() {
        return Vec::new();
    }
    if x.len().saturating_mul(y.len()) <= DIRECT_LIMIT {
        cross_correlate_direct(x, y)
    } else {
        cross_correlate_fft(x, y)
    }
}

pub fn cross_correlate_direct(x: &[f64], y: &[f64]) -> Vec<f64> {
    if x.is_empty() || y.is_empty() {
        return Vec::new();
    }
    let n = x.len() as isize;
    let m = y.len() as isize;
    let mut result = Vec::with_capacity((n + m - 1) as usize);

    for i in 0..(n + m - 1) {
        let lag = i - (n - 1);
        let first = (-lag).max(0);
        let last = n.min(m - lag);
        let mut sum = 0.0;
        for k in first..last {
            sum += x[k as usize] * y[(k + lag) as usize];
        }
        result.push(sum);
    }
    result
}

/// Same sequence as [`cross_correlate_direct`], computed as the convolution
/// of `y` with reversed `x` in the frequency domain.
pub fn cross_correlate_fft(x: &[f64], y: &[f64]) -> Vec<f64> {
    if x.is_empty() || y.is_empty() {
        return Vec::new();
    }
    let len = x.len() + y.len() - 1;
    let size = len.next_power_of_two();

    let mut a: Vec<Complex64> = y.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    a.resize(size, Complex64::new(0.0, 0.0));
    let mut b: Vec<Complex64> = x.iter().rev().map(|&v| Complex64::new(v, 0.0)).collect();
    b.resize(size, Complex64::new(0.0, 0.0));

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(size);
    let inverse = planner.plan_fft_inverse(size);

    forward.process(&mut a);
    forward.process(&mut b);
    for (p, q) in a.iter_mut().zip(b.iter()) {
        *p *= *q;
    }
    inverse.process(&mut a);

    let scale = size as f64;
    a[..len].iter().map(|c| c.re / scale).collect()
}

/// Relative margin under which two correlation magnitudes count as tied.
/// The FFT path perturbs exact ties by rounding, far below this.
const TIE_TOLERANCE: f64 = 1e-9;

/// Index of the first maximum of `|c|`
pub fn argmax_abs(correlation: &[f64]) -> Option<usize> {
    let peak = correlation.iter().map(|v| v.abs()).fold(None, |best: Option<f64>, m| {
        Some(best.map_or(m, |b| b.max(m)))
    })?;
    let floor = peak - peak * TIE_TOLERANCE;
    correlation.iter().position(|v| v.abs() >= floor)
}

/// Convert an index of [`cross_correlate`] output into a lag in samples
pub fn index_to_lag(index: usize, x_len: usize) -> i64 {
    index as i64 - (x_len as i64 - 1)
}

/// Lag of maximum correlation; positive when `y` lags `x`
pub fn estimate_lag(x: &[f64], y: &[f64]) -> Option<i64> {
    let correlation = cross_correlate(x, y);
    argmax_abs(&correlation).map(|i| index_to_lag(i, x.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_length() {
        assert_eq!(cross_correlate(&[1.0; 4], &[1.0; 5]).len(), 8);
        assert!(cross_correlate(&[], &[1.0]).is_empty());
    }

    #[test]
    fn test_constant_pulse_padded_by_one() {
        let tx = [1.0, 1.0, 1.0, 1.0];
        let rx = [0.0, 1.0, 1.0, 1.0, 1.0];

        assert_eq!(estimate_lag(&tx, &rx), Some(1));
    }

    #[test]
    fn test_negative_lag_when_rx_leads() {
        let tx = [0.0, 0.0, 1.0, -1.0, 2.0];
        let rx = [1.0, -1.0, 2.0, 0.0, 0.0];

        assert_eq!(estimate_lag(&tx, &rx), Some(-2));
    }

    #[test]
    fn test_fft_matches_direct() {
        let x: Vec<f64> = (0..37).map(|i| ((i * 7 % 11) as f64) - 5.0).collect();
        let y: Vec<f64> = (0..53).map(|i| ((i * 5 % 13) as f64) - 6.0).collect();

        let direct = cross_correlate_direct(&x, &y);
        let fft = cross_correlate_fft(&x, &y);

        assert_eq!(direct.len(), fft.len());
        for (d, f) in direct.iter().zip(fft.iter()) {
            assert!((d - f).abs() < 1e-9, "{} vs {}", d, f);
        }
    }

    fn direct_lag(x: &[f64], y: &[f64]) -> Option<i64> {
        argmax_abs(&cross_correlate_direct(x, y)).map(|i| index_to_lag(i, x.len()))
    }

    #[test]
    fn test_fft_path_keeps_first_of_tied_peaks() {
        let tx = vec![1.0; 600];
        let rx = vec![1.0; 1000];
        assert!(tx.len() * rx.len() > DIRECT_LIMIT);

        assert_eq!(direct_lag(&tx, &rx), Some(0));
        assert_eq!(estimate_lag(&tx, &rx), Some(0));
    }

    #[test]
    fn test_repeated_pulse_lag_matches_direct() {
        let pulse: Vec<f64> = crate::waveform::square_pulse(1e-3, 1e5)
            .as_slice()
            .iter()
            .map(|s| s.re as f64)
            .collect();
        let tx: Vec<f64> = pulse.iter().copied().cycle().take(pulse.len() * 20).collect();
        let mut rx = vec![0.0; 7];
        rx.extend(pulse.iter().copied().cycle().take(pulse.len() * 40));

        assert_eq!(direct_lag(&tx, &rx), Some(7));
        assert_eq!(estimate_lag(&tx, &rx), Some(7));
    }

    #[test]
    fn test_argmax_prefers_first_peak() {
        assert_eq!(argmax_abs(&[1.0, -3.0, 3.0, 2.0]), Some(1));
        assert_eq!(argmax_abs(&[]), None);
    }
}
