//! Execution units and the two dispatch topologies.
//!
//! A unit is an OS thread pulling tasks from a [`WorkSource`]: either its own
//! merchant's product list (one thread per merchant) or a queue shared by a
//! fixed pool of workers. Both feed the same executor, history and counters.

pub mod context;
pub mod dispatcher;
pub mod source;

pub use context::RunContext;
pub use dispatcher::Dispatcher;
pub use source::{MerchantWorkSource, QueueWorkSource, TaskQueue, WorkSource};
