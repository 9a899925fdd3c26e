pub mod lifecycle;
pub mod mock;
pub mod traits;
pub mod types;

pub use lifecycle::StreamState;
pub use traits::{RxStreamer, TxStreamer};
pub use types::{DeviceError, DeviceResult, RxMetadata, StreamCommand, TxMetadata};
pub use crate::core::ErrorCode;
