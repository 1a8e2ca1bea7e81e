//! Logging is plain `tracing`; this module only installs the subscriber.
//! See `bin/logger_demo.rs` for a binary demonstrating the reload.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
