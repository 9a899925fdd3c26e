pub mod chirp;
pub mod pulse;

pub use chirp::linear_chirp;
pub use pulse::square_pulse;

/// Number of samples covering `[0, duration)` at `sample_rate`
pub fn sample_count(duration: f64, sample_rate: f64) -> usize {
    let exact = duration * sample_rate;
    // Guard against 59999.99999 style rounding of an exact product
    let rounded = exact.round();
    if (exact - rounded).abs() < 1e-6 {
        rounded as usize
    } else {
        exact.ceil() as usize
    }
}
