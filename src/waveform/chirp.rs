use num_complex::Complex32;
use std::f64::consts::PI;

use crate::core::SampleBuffer;

/// Complex linear chirp sweeping `f0` to `f1` over `duration`
pub fn linear_chirp(f0: f64, f1: f64, duration: f64, sample_rate: f64) -> SampleBuffer {
    let len = super::sample_count(duration, sample_rate);
    let rate = (f1 - f0) / duration;

    let samples = (0..len)
        .map(|k| {
            let t = k as f64 / sample_rate;
            let phase = 2.0 * PI * (f0 * t + 0.5 * rate * t * t);
            Complex32::new(phase.cos() as f32, phase.sin() as f32)
        })
        .collect();

    SampleBuffer::new(samples)
}
