//! In-memory fakes of the backend ports, shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use stagehand_types::container::ContainerSpec;
use stagehand_types::error::{EngineError, GitError, SecretError};
use tokio_util::sync::CancellationToken;

use crate::backend::{
    BoxContainerEngine, BoxRepositoryHost, ContainerEngine, GitMetadata, RepositoryHost,
    SecretPrompt,
};

#[derive(Default)]
struct EngineState {
    images: HashSet<String>,
    failing: HashMap<String, i32>,
    pulls: Vec<String>,
    builds: Vec<(PathBuf, String)>,
    runs: Vec<ContainerSpec>,
}

/// Records every call; containers exit 0 unless configured otherwise.
#[derive(Clone, Default)]
pub struct FakeEngine {
    state: Arc<Mutex<EngineState>>,
}

impl FakeEngine {
    pub fn with_image(self, image: &str) -> Self {
        self.state.lock().unwrap().images.insert(image.to_string());
        self
    }

    pub fn failing_container(self, name: &str, code: i32) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(name.to_string(), code);
        self
    }

    pub fn boxed(&self) -> BoxContainerEngine {
        BoxContainerEngine::new(self.clone())
    }

    pub fn pulls(&self) -> Vec<String> {
        self.state.lock().unwrap().pulls.clone()
    }

    pub fn builds(&self) -> Vec<(PathBuf, String)> {
        self.state.lock().unwrap().builds.clone()
    }

    pub fn runs(&self) -> Vec<ContainerSpec> {
        self.state.lock().unwrap().runs.clone()
    }

    pub fn run_names(&self) -> Vec<String> {
        self.runs().into_iter().map(|spec| spec.name).collect()
    }
}

impl ContainerEngine for FakeEngine {
    async fn image_exists(&self, image: &str) -> Result<bool, EngineError> {
        Ok(self.state.lock().unwrap().images.contains(image))
    }

    async fn pull(&self, image: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.pulls.push(image.to_string());
        state.images.insert(image.to_string());
        Ok(())
    }

    async fn build(&self, context_dir: &Path, tag: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state
            .builds
            .push((context_dir.to_path_buf(), tag.to_string()));
        state.images.insert(tag.to_string());
        Ok(())
    }

    async fn run(
        &self,
        spec: &ContainerSpec,
        _cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.runs.push(spec.clone());
        match state.failing.get(&spec.name) {
            None => Ok(()),
            Some(78) => Err(EngineError::Neutral {
                container: spec.name.clone(),
            }),
            Some(code) => Err(EngineError::ExitStatus {
                container: spec.name.clone(),
                code: *code,
            }),
        }
    }
}

#[derive(Default)]
struct RepositoryState {
    reachable: HashSet<String>,
    checkouts: Vec<(String, String, PathBuf)>,
}

#[derive(Clone, Default)]
pub struct FakeRepositories {
    state: Arc<Mutex<RepositoryState>>,
}

impl FakeRepositories {
    pub fn with_reachable(self, url: &str) -> Self {
        self.state.lock().unwrap().reachable.insert(url.to_string());
        self
    }

    pub fn boxed(&self) -> BoxRepositoryHost {
        BoxRepositoryHost::new(self.clone())
    }

    pub fn checkouts(&self) -> Vec<(String, String, PathBuf)> {
        self.state.lock().unwrap().checkouts.clone()
    }
}

impl RepositoryHost for FakeRepositories {
    async fn is_reachable(&self, url: &str) -> bool {
        self.state.lock().unwrap().reachable.contains(url)
    }

    async fn checkout(&self, url: &str, git_ref: &str, dir: &Path) -> Result<(), EngineError> {
        self.state.lock().unwrap().checkouts.push((
            url.to_string(),
            git_ref.to_string(),
            dir.to_path_buf(),
        ));
        Ok(())
    }
}

/// Fixed git metadata; `None` fields fail their lookup.
#[derive(Clone, Default)]
pub struct FakeGit {
    revision: Option<String>,
    branch: Option<String>,
    slug: Option<String>,
}

impl FakeGit {
    pub fn new(revision: &str, branch: &str, slug: &str) -> Self {
        Self {
            revision: Some(revision.to_string()),
            branch: Some(branch.to_string()),
            slug: Some(slug.to_string()),
        }
    }

    pub fn broken() -> Self {
        Self::default()
    }
}

impl GitMetadata for FakeGit {
    fn revision(&self, path: &Path) -> Result<String, GitError> {
        self.revision
            .clone()
            .ok_or_else(|| GitError::NotARepository(path.display().to_string()))
    }

    fn branch(&self, _path: &Path) -> Result<String, GitError> {
        self.branch.clone().ok_or(GitError::DetachedHead)
    }

    fn repository_slug(&self, _path: &Path, _remote: &str) -> Result<String, GitError> {
        self.slug.clone().ok_or(GitError::MissingRemote)
    }
}

/// Fails every prompt, as a non-interactive terminal would.
pub struct NoPrompt;

impl SecretPrompt for NoPrompt {
    fn prompt(&self, _key: &str) -> Result<String, SecretError> {
        Err(SecretError::PromptUnavailable("no terminal in tests".to_string()))
    }
}
