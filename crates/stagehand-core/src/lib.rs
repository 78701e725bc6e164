//! Scheduling and execution core for stagehand.
//!
//! This crate owns the dependency-graph scheduler, the executor abstraction,
//! action resolution and run assembly, and the Runner that composes them.
//! Everything outside the process (container engine, git, terminal) is
//! reached through the traits in [`backend`]; concrete adapters live in
//! `stagehand-infra`.

pub mod action;
pub mod backend;
pub mod document;
pub mod executor;
pub mod graph;
pub mod runner;
pub mod secret;

#[cfg(test)]
pub(crate) mod testing;
