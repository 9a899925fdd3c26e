use std::sync::{Arc, Mutex};

use super::{Metadata, SampleBuffer};

/// One successful transfer
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub buffer: SampleBuffer,
    pub metadata: Metadata,
}

/// Destination for a worker's successful transfers.
///
/// Entries whose metadata carries an error code are refused and the call
/// returns `false`; nothing is stored for them.
pub trait LogSink: Send {
    fn append(&mut self, buffer: SampleBuffer, metadata: Metadata) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Append-only, ordered record of one worker's transfers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultLog {
    entries: Vec<LogEntry>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn buffers(&self) -> impl Iterator<Item = &SampleBuffer> {
        self.entries.iter().map(|e| &e.buffer)
    }

    /// Total samples across every logged buffer
    pub fn total_samples(&self) -> usize {
        self.entries.iter().map(|e| e.buffer.len()).sum()
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

impl LogSink for ResultLog {
    fn append(&mut self, buffer: SampleBuffer, metadata: Metadata) -> bool {
        if !metadata.error_code.is_ok() {
            return false;
        }
        self.entries.push(LogEntry { buffer, metadata });
        true
    }

    fn len(&self) -> usize {
        ResultLog::len(self)
    }
}

/// Result log written by several threads; every append happens under the lock
#[derive(Debug, Clone, Default)]
pub struct SharedResultLog {
    inner: Arc<Mutex<ResultLog>>,
}

impl SharedResultLog {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ResultLog::new())),
        }
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> ResultLog {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Take the log back once every writer handle has been dropped.
    /// Returns the handle unchanged if other handles are still alive.
    pub fn into_inner(self) -> Result<ResultLog, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex
                .into_inner()
                .unwrap_or_else(|poisoned| poisoned.into_inner())),
            Err(inner) => Err(Self { inner }),
        }
    }
}

impl LogSink for SharedResultLog {
    fn append(&mut self, buffer: SampleBuffer, metadata: Metadata) -> bool {
        let mut log = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        log.append(buffer, metadata)
    }

    fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorCode, TimeSpec};

    #[test]
    fn test_refuses_errored_entries() {
        let mut log = ResultLog::new();
        let stamped = TimeSpec::from_secs(1.0);

        assert!(log.append(SampleBuffer::zeroed(4), Metadata::ok(stamped)));
        for code in [ErrorCode::Timeout, ErrorCode::Other] {
            let metadata = Metadata {
                time_spec: stamped,
                error_code: code,
            };
            assert!(!log.append(SampleBuffer::zeroed(4), metadata));
        }

        assert_eq!(log.len(), 1);
        assert_eq!(log.total_samples(), 4);
    }

    #[test]
    fn test_shared_log_into_inner_requires_last_handle() {
        let log = SharedResultLog::new();
        let other = log.clone();

        let log = log.into_inner().unwrap_err();
        drop(other);
        assert!(log.into_inner().is_ok());
    }
}
