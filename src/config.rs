use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::analysis::SnrMode;
use crate::engine::TxStartPolicy;
use crate::hal::mock::LoopbackConfig;
use crate::resilience::RxErrorPolicy;

/// Settings of one harness run, loadable from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Gap between scheduling and the synchronized start
    pub lead_time_s: f64,
    /// How long both workers run after the start time
    pub test_duration_s: f64,
    /// Extra time before cancellation is raised
    pub stop_margin_s: f64,
    pub recv_timeout_s: f64,
    pub samples_per_packet: usize,
    pub sample_rate: f64,
    pub pulse_duration_s: f64,
    pub tx_start_policy: TxStartPolicy,
    pub rx_error_policy: RxErrorPolicy,
    pub snr_mode: SnrMode,
    pub loopback: LoopbackConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            lead_time_s: 2.0,
            test_duration_s: 1.0,
            stop_margin_s: 0.0005,
            recv_timeout_s: 0.1,
            samples_per_packet: 200,
            sample_rate: 1e6,
            pulse_duration_s: 1e-3,
            tx_start_policy: TxStartPolicy::default(),
            rx_error_policy: RxErrorPolicy::default(),
            snr_mode: SnrMode::default(),
            loopback: LoopbackConfig::default(),
        }
    }
}

impl HarnessConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("invalid harness configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("lead_time_s", self.lead_time_s),
            ("test_duration_s", self.test_duration_s),
            ("stop_margin_s", self.stop_margin_s),
            ("recv_timeout_s", self.recv_timeout_s),
            ("sample_rate", self.sample_rate),
            ("pulse_duration_s", self.pulse_duration_s),
        ] {
            if !value.is_finite() {
                bail!("{} must be a finite number, got {}", name, value);
            }
        }
        if self.lead_time_s < 0.0 {
            bail!("lead_time_s must be non-negative, got {}", self.lead_time_s);
        }
        if self.test_duration_s <= 0.0 {
            bail!("test_duration_s must be positive, got {}", self.test_duration_s);
        }
        if self.stop_margin_s < 0.0 {
            bail!("stop_margin_s must be non-negative, got {}", self.stop_margin_s);
        }
        if self.recv_timeout_s <= 0.0 {
            bail!("recv_timeout_s must be positive, got {}", self.recv_timeout_s);
        }
        if self.samples_per_packet == 0 {
            bail!("samples_per_packet must be at least 1");
        }
        if self.sample_rate <= 0.0 {
            bail!("sample_rate must be positive, got {}", self.sample_rate);
        }
        if self.pulse_duration_s <= 0.0 {
            bail!("pulse_duration_s must be positive, got {}", self.pulse_duration_s);
        }
        Ok(())
    }

    /// Host sleep between scheduling and cancellation
    pub fn run_window(&self) -> Duration {
        Duration::from_secs_f64(self.lead_time_s + self.test_duration_s + self.stop_margin_s)
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.recv_timeout_s)
    }

    /// Loopback settings with the stream parameters of this run applied
    pub fn loopback_config(&self) -> LoopbackConfig {
        LoopbackConfig {
            sample_rate: self.sample_rate,
            samples_per_packet: self.samples_per_packet,
            ..self.loopback.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "test_duration_s": 0.25,
            "rx_error_policy": "abort",
            "loopback": {"delay_samples": 12}
        }"#;
        let config = HarnessConfig::from_json(json).unwrap();

        assert_eq!(config.test_duration_s, 0.25);
        assert_eq!(config.lead_time_s, 2.0);
        assert_eq!(config.rx_error_policy, RxErrorPolicy::Abort);
        assert_eq!(config.loopback.delay_samples, 12);
        assert_eq!(config.loopback.queue_depth, 64);
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        let err = HarnessConfig::from_json(r#"{"test_duration_s": 0.0}"#).unwrap_err();
        assert!(err.to_string().contains("test_duration_s"));
    }

    #[test]
    fn test_rejects_infinite_and_nan_times() {
        let cases = [
            HarnessConfig {
                lead_time_s: f64::INFINITY,
                ..HarnessConfig::default()
            },
            HarnessConfig {
                test_duration_s: f64::INFINITY,
                ..HarnessConfig::default()
            },
            HarnessConfig {
                recv_timeout_s: f64::INFINITY,
                ..HarnessConfig::default()
            },
            HarnessConfig {
                stop_margin_s: f64::NAN,
                ..HarnessConfig::default()
            },
        ];

        for config in cases {
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("finite"), "{}", err);
        }
    }

    #[test]
    fn test_cli_style_inf_lead_is_rejected() {
        let mut config = HarnessConfig::default();
        config.lead_time_s = "inf".parse().unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_run_window_sums_lead_duration_margin() {
        let config = HarnessConfig {
            lead_time_s: 0.5,
            test_duration_s: 1.0,
            stop_margin_s: 0.25,
            ..HarnessConfig::default()
        };
        assert_eq!(config.run_window(), Duration::from_secs_f64(1.75));
    }
}
