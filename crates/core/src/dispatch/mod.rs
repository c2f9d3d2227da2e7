//! The dispatch engine.
//!
//! Drives items from an [`ItemSource`](crate::source::ItemSource) to a
//! [`RequestSink`](crate::sink::RequestSink) in sequential chunks:
//! - **Sizing**: the concurrency window comes from [`BatchSizer`](crate::sizer::BatchSizer)
//!   against the cumulative backlog, unless overridden
//! - **Fan-out**: every item of a chunk is submitted concurrently; the chunk is a barrier
//! - **Persistence**: status is flushed after every chunk, before the next one starts
//! - **Stopping**: a global ceiling or cancellation stops new chunks; in-flight work always drains

mod config;
mod engine;
mod types;

pub use config::DispatchConfig;
pub use engine::DispatchEngine;
pub use types::{DispatchError, DispatchEvent, EventCallback, RunCounters, RunSummary, StopReason};
