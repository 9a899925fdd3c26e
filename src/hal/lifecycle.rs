use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Receive stream states over one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamState {
    Idle,
    Streaming,
    Stopped,
}

impl StreamState {
    /// Check if transition from current state to target state is valid
    pub fn can_transition_to(&self, target: StreamState) -> bool {
        use StreamState::*;

        matches!(
            (self, target),
            (Idle, Streaming) |
            // A failed start still ends the run with a stop
            (Idle, Stopped) |
            (Streaming, Stopped)
        )
    }

    pub fn transition_to(&mut self, target: StreamState) -> Result<()> {
        if !self.can_transition_to(target) {
            return Err(anyhow!(
                "Invalid stream transition {:?} -> {:?}",
                self,
                target
            ));
        }
        *self = target;
        Ok(())
    }
}

impl Default for StreamState {
    fn default() -> Self {
        Self::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let mut state = StreamState::default();
        assert!(state.transition_to(StreamState::Streaming).is_ok());
        assert!(state.transition_to(StreamState::Stopped).is_ok());
    }

    #[test]
    fn test_stopped_is_terminal() {
        let mut state = StreamState::Stopped;
        assert!(state.transition_to(StreamState::Streaming).is_err());
        assert!(state.transition_to(StreamState::Stopped).is_err());
        assert_eq!(state, StreamState::Stopped);
    }
}
