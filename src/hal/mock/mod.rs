pub mod loopback;
pub mod scripted;

pub use loopback::{LoopbackConfig, LoopbackDevice, LoopbackRxStreamer, LoopbackTxStreamer};
pub use scripted::{RxStep, ScriptedRxStreamer, ScriptedTxStreamer, StreamCounters};
