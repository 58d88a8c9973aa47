//! Transfer engine for the DBusDL download daemon: one item in flight at a
//! time, driven by a dedicated worker thread and an event plane of two FIFO
//! queues connecting it to whatever sits on the bus side.

pub mod channel;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod lifecycle;
pub mod logging;
pub mod registry;
pub mod worker;

pub use channel::{InboundEvent, OutboundEvent, WakeFn};
pub use error::ErrorCode;
pub use registry::{Item, Registry};
