use serde::{Deserialize, Serialize};

/// What the receive worker does with a non-timeout device error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RxErrorPolicy {
    /// Log, count and keep receiving
    #[default]
    LogAndContinue,

    /// Leave the receive loop on the first such error
    Abort,
}

impl RxErrorPolicy {
    pub fn aborts(&self) -> bool {
        matches!(self, RxErrorPolicy::Abort)
    }
}
