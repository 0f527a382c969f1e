//! Shared plumbing for the CGsnap driver crates.
//!
//! - `logger`: allocation-free ring logger, safe to call from interrupt context
//! - `time`: tick-based timeouts and deadlines

#![no_std]

pub mod logger;
pub mod time;

pub use logger::{LogLevel, LogRecord};
pub use time::{Clock, Deadline, TimeoutConfig};
