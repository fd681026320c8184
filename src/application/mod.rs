//! Application layer: the order-processing engine.
//!
//! `OrderManager` is the facade used by callers. Submitted orders become
//! shared `OrderHandle`s on an `OrderQueue`; a single `OrderWorker` drains the
//! queue and runs each order through `OrderProcessor`.

pub mod handle;
pub mod manager;
pub mod processor;
pub mod queue;
pub mod worker;

pub use handle::{OrderHandle, OrderProgress};
pub use manager::{CustomerOrders, OrderManager};
