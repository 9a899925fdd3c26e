pub mod coordinator;
pub mod rx_worker;
pub mod tx_worker;

pub use coordinator::{Coordinator, HarnessOutput};
pub use rx_worker::{RxWorker, DEFAULT_RECV_TIMEOUT};
pub use tx_worker::{TxStartPolicy, TxWorker};
