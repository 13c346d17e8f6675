//! Persistent key-value state stores for the hub and spoke planes.

pub mod client;
pub mod watch;
