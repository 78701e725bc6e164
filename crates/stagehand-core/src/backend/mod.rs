//! Ports to the outside world.
//!
//! The scheduler and action pipeline only talk to these traits; concrete
//! adapters (engine CLI, git on disk, terminal prompts) live in
//! `stagehand-infra`, and tests substitute in-memory fakes.

pub mod engine;
pub mod git;
pub mod repository;
pub mod secret;

use std::sync::Arc;

pub use engine::{BoxContainerEngine, ContainerEngine};
pub use git::GitMetadata;
pub use repository::{BoxRepositoryHost, RepositoryHost};
pub use secret::{SecretPrompt, SecretSource};

/// Every adapter a Runner needs, bundled.
#[derive(Clone)]
pub struct Backends {
    pub engine: BoxContainerEngine,
    pub repositories: BoxRepositoryHost,
    pub git: Arc<dyn GitMetadata>,
    /// Consulted in order before the run-wide cache and the prompt.
    pub secret_sources: Vec<Arc<dyn SecretSource>>,
    pub prompt: Arc<dyn SecretPrompt>,
}
