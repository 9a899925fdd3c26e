use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Run-wide stop flag.
///
/// Cloning yields another handle to the same flag. Once set it stays set.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    flag: Arc<AtomicBool>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Raise the signal. Returns `true` only for the call that actually set it.
    pub fn set(&self) -> bool {
        !self.flag.swap(true, Ordering::AcqRel)
    }

    /// Lock-free poll, safe from any thread
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_is_idempotent() {
        let cancel = CancellationSignal::new();
        assert!(!cancel.is_set());

        assert!(cancel.set());
        assert!(!cancel.set());
        assert!(cancel.is_set());
    }

    #[test]
    fn test_clones_share_flag() {
        let cancel = CancellationSignal::new();
        let observer = cancel.clone();

        let handle = std::thread::spawn(move || {
            while !observer.is_set() {
                std::thread::yield_now();
            }
        });

        cancel.set();
        handle.join().unwrap();
    }
}
