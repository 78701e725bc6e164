//! Infrastructure adapters for stagehand.
//!
//! Concrete implementations of the `stagehand-core` backend ports: the
//! container engine command line tool, git repositories on disk and on a
//! repository host, secret sources and the terminal prompt, plus
//! configuration file loading.

pub mod config;
pub mod docker;
pub mod git;
pub mod repository;
pub mod secret;
