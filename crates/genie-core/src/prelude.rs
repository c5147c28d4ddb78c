//! Convenient re-exports for common use.

pub use crate::error::{BoxedError, Error, ErrorKind, Result};
pub use crate::fanout::{Collector, SettledBatch, collect, collect_settled};
pub use crate::health::{ServiceHealth, ServiceStatus};
pub use crate::output::OutputRef;
pub use crate::poll::{PollPolicy, ReadyBatch, Readiness, poll_until_ready, wait_for_batch};
pub use crate::store::OutputStore;
pub use crate::table::Table;
pub use crate::task::{PendingTask, TaskState};
