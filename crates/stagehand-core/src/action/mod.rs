//! The per-action pipeline: classify and resolve the image source, then
//! assemble the container run.

pub mod assembler;
pub mod locator;
pub mod overlay;
pub mod resolver;
pub mod steps;

pub use assembler::{EnvironmentPlan, RunAssembler, RunContext, container_name};
pub use locator::Locator;
pub use resolver::{ActionResolver, ResolvedAction};
pub use steps::SetupStep;
