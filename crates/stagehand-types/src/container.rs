//! Description of one container invocation, independent of any engine.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Host path mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bind {
    pub host: PathBuf,
    pub container: String,
}

impl Bind {
    pub fn new(host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
        }
    }
}

impl fmt::Display for Bind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host.display(), self.container)
    }
}

/// A tar archive extracted into the container before it starts.
#[derive(Clone, PartialEq, Eq)]
pub struct Overlay {
    pub destination: String,
    pub archive: Vec<u8>,
}

impl fmt::Debug for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overlay")
            .field("destination", &self.destination)
            .field("archive_bytes", &self.archive.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// Empty keeps the image default.
    pub entrypoint: Vec<String>,
    /// Empty keeps the image default.
    pub cmd: Vec<String>,
    pub working_dir: String,
    pub env: BTreeMap<String, String>,
    pub binds: Vec<Bind>,
    pub overlay: Option<Overlay>,
}
