//! Shared domain types for stagehand.
//!
//! This crate contains the decoded workflow model, the run configuration,
//! the container invocation description, and the error types shared by the
//! scheduler, the action pipeline and the infrastructure adapters.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod command;
pub mod config;
pub mod container;
pub mod error;
pub mod workflow;
