pub mod cancellation;
pub mod result_log;
pub mod sample_buffer;
pub mod time_spec;

pub use cancellation::CancellationSignal;
pub use result_log::{LogEntry, LogSink, ResultLog, SharedResultLog};
pub use sample_buffer::{ErrorCode, Metadata, SampleBuffer};
pub use time_spec::{DeviceClock, ManualClock, ScheduleClock, SystemClock, TimeSpec};
