use num_complex::Complex32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use txrx_harness::analysis::{self, AnalysisError, AnalysisOutcome, SnrMode};
use txrx_harness::core::{LogSink, Metadata, ResultLog, SampleBuffer, TimeSpec};
use txrx_harness::waveform;

fn log_of(chunks: &[Vec<Complex32>]) -> ResultLog {
    let mut log = ResultLog::new();
    for (i, chunk) in chunks.iter().enumerate() {
        log.append(
            SampleBuffer::new(chunk.clone()),
            Metadata::ok(TimeSpec::from_secs(i as f64)),
        );
    }
    log
}

fn random_bipolar(len: usize, seed: u64) -> Vec<Complex32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| Complex32::new(if rng.gen::<bool>() { 1.0 } else { -1.0 }, 0.0))
        .collect()
}

#[test]
fn test_recovers_shift_of_aperiodic_signal() {
    let tx = random_bipolar(256, 7);
    for shift in [0usize, 1, 13, 100] {
        let mut rx = vec![Complex32::new(0.0, 0.0); shift];
        rx.extend_from_slice(&tx);

        // Split across several buffers; concatenation must restore order
        let rx_chunks: Vec<Vec<Complex32>> = rx.chunks(50).map(|c| c.to_vec()).collect();
        let outcome =
            analysis::analyze(&log_of(&[tx.clone()]), &log_of(&rx_chunks), SnrMode::Complex);

        let report = outcome.report().expect("report");
        assert_eq!(report.lag_real, shift as i64);
        assert_eq!(report.tx_samples, 256);
        assert_eq!(report.rx_samples, 256 + shift);
    }
}

#[test]
fn test_chirp_shift_seen_in_both_components() {
    let chirp = waveform::linear_chirp(1_000.0, 20_000.0, 5e-3, 1e5);
    let mut rx = vec![Complex32::new(0.0, 0.0); 9];
    rx.extend_from_slice(chirp.as_slice());

    let outcome = analysis::analyze(
        &log_of(&[chirp.as_slice().to_vec()]),
        &log_of(&[rx]),
        SnrMode::Complex,
    );

    let report = outcome.report().expect("report");
    assert_eq!(report.lag_real, 9);
    assert_eq!(report.lag_imag, Some(9));
}

#[test]
fn test_constant_block_scenario() {
    let ones = vec![Complex32::new(1.0, 0.0); 4];
    let mut delayed = vec![Complex32::new(0.0, 0.0)];
    delayed.extend_from_slice(&ones);

    let outcome = analysis::analyze(&log_of(&[ones]), &log_of(&[delayed]), SnrMode::Complex);
    let report = outcome.report().expect("report");

    assert_eq!(report.lag_real, 1);
    assert_eq!(report.correlation_real.len(), 8);
    assert_eq!(report.lag_imag, None);
}

#[test]
fn test_identical_streams_report_no_noise() {
    let tx = random_bipolar(64, 1);
    let outcome = analysis::analyze(&log_of(&[tx.clone()]), &log_of(&[tx]), SnrMode::Complex);

    let report = outcome.report().expect("report");
    assert_eq!(report.lag_real, 0);
    assert_eq!(report.snr_db, Err(AnalysisError::NoNoisePower));
}

#[test]
fn test_empty_log_yields_no_data() {
    let rx = random_bipolar(16, 3);
    assert!(matches!(
        analysis::analyze(&ResultLog::new(), &log_of(&[rx.clone()]), SnrMode::Complex),
        AnalysisOutcome::NoData
    ));
    assert!(matches!(
        analysis::analyze(&log_of(&[rx]), &ResultLog::new(), SnrMode::Complex),
        AnalysisOutcome::NoData
    ));
}

#[test]
fn test_snr_drops_with_noise() {
    let tx = random_bipolar(2048, 11);
    let mut rng = StdRng::seed_from_u64(5);
    let noisy = |scale: f32, rng: &mut StdRng| -> Vec<Complex32> {
        tx.iter()
            .map(|s| s + Complex32::new(scale * rng.gen_range(-1.0..1.0), 0.0))
            .collect()
    };
    let quiet = noisy(0.01, &mut rng);
    let loud = noisy(0.5, &mut rng);

    let quiet_snr = analysis::snr_db(&tx, &quiet, SnrMode::Complex).unwrap();
    let loud_snr = analysis::snr_db(&tx, &loud, SnrMode::Complex).unwrap();
    assert!(quiet_snr > loud_snr + 20.0, "{} vs {}", quiet_snr, loud_snr);
}
