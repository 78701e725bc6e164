//! Observability setup shared by the stagehand binaries.

pub mod tracing_setup;

pub use tracing_setup::{LogOptions, init_tracing, shutdown_tracing};
