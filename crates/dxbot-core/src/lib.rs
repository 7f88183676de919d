//! Foundational low-level utilities shared across dxbot crates.
//!
//! Provides the atomic file-write helper used by the channel registry, unix
//! time helpers, and the retry/backoff policy shared by the HTTP API clients.

pub mod atomic_io;
pub mod time_utils;
pub mod transport_helpers;

pub use atomic_io::write_text_atomic;
pub use time_utils::{current_unix_timestamp, current_unix_timestamp_ms};
