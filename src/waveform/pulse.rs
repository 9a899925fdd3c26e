use std::f64::consts::PI;

use crate::core::SampleBuffer;

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Real-valued square wave with two periods over `duration`, levels 0 and 1.
///
/// Samples where the underlying sine is exactly zero sit at 0.5.
pub fn square_pulse(duration: f64, sample_rate: f64) -> SampleBuffer {
    let frequency = 2.0 / duration;
    let len = super::sample_count(duration, sample_rate);

    let values: Vec<f32> = (0..len)
        .map(|k| {
            let t = k as f64 / sample_rate;
            (0.5 * (1.0 + sign((2.0 * PI * frequency * t).sin()))) as f32
        })
        .collect();

    SampleBuffer::from_real(&values)
}
