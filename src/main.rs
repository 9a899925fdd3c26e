use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use txrx_harness::analysis::AnalysisOutcome;
use txrx_harness::capture;
use txrx_harness::config::HarnessConfig;
use txrx_harness::core::SystemClock;
use txrx_harness::engine::Coordinator;
use txrx_harness::hal::mock::LoopbackDevice;
use txrx_harness::waveform;

#[derive(Parser, Debug)]
#[command(name = "txrx-harness")]
#[command(about = "Synchronized timed transmit/receive test over a loopback device")]
struct Cli {
    /// JSON configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Test duration in seconds
    #[arg(short = 'd', long)]
    duration: Option<f64>,

    /// Lead time before the synchronized start, in seconds
    #[arg(short = 'l', long)]
    lead: Option<f64>,

    /// Simulated propagation delay in samples
    #[arg(long)]
    delay_samples: Option<usize>,

    /// Standard deviation of simulated channel noise
    #[arg(long)]
    noise: Option<f32>,

    /// Directory to write tx.cf32 / rx.cf32 captures into
    #[arg(short = 'w', long)]
    dump: Option<PathBuf>,

    /// Print worker statistics
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::default(),
    };
    if let Some(duration) = cli.duration {
        config.test_duration_s = duration;
    }
    if let Some(lead) = cli.lead {
        config.lead_time_s = lead;
    }
    if let Some(delay) = cli.delay_samples {
        config.loopback.delay_samples = delay;
    }
    if let Some(noise) = cli.noise {
        config.loopback.noise_std = noise;
    }
    config.validate()?;

    let clock = Arc::new(SystemClock::new());
    let device = LoopbackDevice::new(clock.clone(), config.loopback_config());
    let (tx, rx) = device.streamers();
    let pulse = waveform::square_pulse(config.pulse_duration_s, config.sample_rate);

    let coordinator = Coordinator::new(clock, config.clone());
    let output = coordinator.run(Box::new(tx), Box::new(rx), pulse)?;
    log::info!(
        "run from {:.6}s complete: {} tx buffers, {} rx buffers",
        output.time_spec.as_secs(),
        output.tx_log.len(),
        output.rx_log.len()
    );

    if cli.stats {
        println!("{}", output.monitor().generate_report());
    }

    if let Some(dir) = &cli.dump {
        capture::dump_logs(dir, &output.tx_log, &output.rx_log)?;
    }

    match output.analyze(&config) {
        AnalysisOutcome::NoData => println!("No data to analyze."),
        AnalysisOutcome::Report(report) => {
            println!("Lag (real): {} samples", report.lag_real);
            if let Some(lag) = report.lag_imag {
                println!("Lag (imag): {} samples", lag);
            }
            match report.snr_db {
                Ok(db) => println!("SNR: {:.2} dB", db),
                Err(e) => println!("SNR: unavailable ({})", e),
            }
        }
    }

    Ok(())
}
