//! battlogd - battery sampler daemon
//!
//! Library half of the daemon so the sampling loop can be tested without the
//! binary.

pub mod sampler;

pub use sampler::Sampler;

/// Process name checked by the pidfile lock
pub const PROCESS_NAME: &str = "battlogd";

/// Lock file name inside the log directory
pub const LOCK_FILE: &str = ".battlogd.pid";
