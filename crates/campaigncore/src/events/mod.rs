// crates/campaigncore/src/events/mod.rs

mod base;
mod observer;

pub use base::{EventBus, ExecutionEvent, ExecutionId};
pub use observer::{ExecutionObserver, NoopObserver};
