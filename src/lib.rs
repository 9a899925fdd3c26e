pub mod analysis;
pub mod capture;
pub mod config;
pub mod core;
pub mod engine;
pub mod hal;
pub mod observability;
pub mod resilience;
pub mod waveform;
