pub mod cf32_file;

pub use cf32_file::{read_cf32, write_cf32};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::analysis::concatenate;
use crate::core::ResultLog;

/// Write both logs of a run as `tx.cf32` and `rx.cf32` under `dir`
pub fn dump_logs(
    dir: impl AsRef<Path>,
    tx_log: &ResultLog,
    rx_log: &ResultLog,
) -> Result<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let tx_path = dir.join("tx.cf32");
    let rx_path = dir.join("rx.cf32");
    write_cf32(&tx_path, &concatenate(tx_log))?;
    write_cf32(&rx_path, &concatenate(rx_log))?;

    log::info!("captures written to {} and {}", tx_path.display(), rx_path.display());
    Ok((tx_path, rx_path))
}
