//! Logging utilities.
//!
//! Every crate in the workspace logs through the `log` facade; this module
//! owns the one-time `env_logger` backend setup for binaries.

mod init;

pub use init::{init_logging, LoggingConfig};
