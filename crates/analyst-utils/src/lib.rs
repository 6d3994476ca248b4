//! Shared utilities for market-analyst
//!
//! Logging setup and the configuration it reads. Every binary in the
//! workspace calls [`init_tracing`] once at startup.

pub mod config;
pub mod logging;

pub use config::{LogConfig, LogFormat};
pub use logging::{LoggingError, init_tracing};
