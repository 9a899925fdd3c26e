use anyhow::{bail, Context, Result};
use memmap2::{Mmap, MmapMut};
use num_complex::Complex32;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Bytes per interleaved complex float32 sample
const SAMPLE_BYTES: usize = 8;

/// Write samples as interleaved little-endian `re, im` float32 pairs
pub fn write_cf32(path: impl AsRef<Path>, samples: &[Complex32]) -> Result<()> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    let total_size = samples.len() * SAMPLE_BYTES;
    file.set_len(total_size as u64)?;
    if total_size == 0 {
        return Ok(());
    }

    let mut mmap = unsafe { MmapMut::map_mut(&file)? };
    for (chunk, sample) in mmap.chunks_exact_mut(SAMPLE_BYTES).zip(samples) {
        chunk[0..4].copy_from_slice(&sample.re.to_le_bytes());
        chunk[4..8].copy_from_slice(&sample.im.to_le_bytes());
    }
    mmap.flush()?;

    Ok(())
}

/// Read a file written by [`write_cf32`] (or any raw `complex64` dump)
pub fn read_cf32(path: impl AsRef<Path>) -> Result<Vec<Complex32>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;

    let len = file.metadata()?.len() as usize;
    if len % SAMPLE_BYTES != 0 {
        bail!(
            "{} is {} bytes, not a whole number of cf32 samples",
            path.display(),
            len
        );
    }
    if len == 0 {
        return Ok(Vec::new());
    }

    let mmap = unsafe { Mmap::map(&file)? };
    let samples = mmap
        .chunks_exact(SAMPLE_BYTES)
        .map(|chunk| {
            let re = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let im = f32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
            Complex32::new(re, im)
        })
        .collect();

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_partial_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.cf32");
        std::fs::write(&path, [0u8; 12]).unwrap();

        assert!(read_cf32(&path).is_err());
    }

    #[test]
    fn test_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.cf32");
        write_cf32(&path, &[]).unwrap();

        assert!(read_cf32(&path).unwrap().is_empty());
    }
}
