//! Action resolution: from a `uses` locator to an image tag and the steps
//! that make that image available.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stagehand_types::config::RunConfig;
use stagehand_types::error::RunError;
use stagehand_types::workflow::Action;

use super::locator::{Locator, sanitize_name};
use super::steps::SetupStep;
use crate::backend::git::short_revision;
use crate::backend::{Backends, BoxContainerEngine, BoxRepositoryHost, GitMetadata};

/// Outcome of resolving one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAction {
    pub locator: Locator,
    pub image: String,
    pub setup: Vec<SetupStep>,
}

pub struct ActionResolver {
    working_dir: PathBuf,
    checkout_root: PathBuf,
    default_branch: String,
    repository_host: String,
    force_pull: bool,
    dryrun: bool,
    engine: BoxContainerEngine,
    repositories: BoxRepositoryHost,
    git: Arc<dyn GitMetadata>,
}

impl ActionResolver {
    pub fn new(
        config: &RunConfig,
        working_dir: &Path,
        scratch_dir: &Path,
        backends: &Backends,
    ) -> Self {
        Self {
            working_dir: working_dir.to_path_buf(),
            checkout_root: scratch_dir.join("actions"),
            default_branch: config.default_branch.clone(),
            repository_host: config.repository_host.clone(),
            force_pull: config.force_pull,
            dryrun: config.dryrun,
            engine: backends.engine.clone(),
            repositories: backends.repositories.clone(),
            git: Arc::clone(&backends.git),
        }
    }

    /// Pure classification of `uses`.
    pub fn classify(&self, uses: &str) -> Result<Locator, RunError> {
        Locator::classify(uses, &self.default_branch)
            .ok_or_else(|| RunError::resolution(uses, "unrecognised locator"))
    }

    pub async fn resolve(&self, action: &Action) -> Result<ResolvedAction, RunError> {
        let locator = self.classify(&action.uses)?;
        let (image, setup) = match &locator {
            Locator::LocalPath { path } => self.resolve_local(&action.uses, path).await?,
            Locator::DockerImage { image } => (image.clone(), self.resolve_image(image).await),
            Locator::RemoteRepository {
                owner,
                repo,
                path,
                git_ref,
            } => {
                self.resolve_remote(&action.uses, owner, repo, path, git_ref)
                    .await?
            }
        };

        tracing::debug!(uses = %action.uses, kind = locator.kind(), image = %image, "resolved action");
        Ok(ResolvedAction {
            locator,
            image,
            setup,
        })
    }

    async fn resolve_local(
        &self,
        uses: &str,
        path: &str,
    ) -> Result<(String, Vec<SetupStep>), RunError> {
        let context_dir = self.working_dir.join(path.trim_start_matches("./"));
        let dockerfile = context_dir.join("Dockerfile");
        let has_dockerfile = tokio::fs::metadata(&dockerfile)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !has_dockerfile {
            return Err(RunError::resolution(
                uses,
                format!("no Dockerfile in {}", context_dir.display()),
            ));
        }

        let name = context_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "action".to_string());
        let version = match self.git.revision(&context_dir) {
            Ok(revision) => short_revision(&revision).to_string(),
            Err(e) => {
                tracing::warn!(uses = %uses, error = %e, "unable to determine revision, tagging as latest");
                "latest".to_string()
            }
        };
        let tag = format!("{name}:{version}");

        Ok((tag.clone(), vec![SetupStep::Build { context_dir, tag }]))
    }

    async fn resolve_image(&self, image: &str) -> Vec<SetupStep> {
        let pull = vec![SetupStep::Pull {
            image: image.to_string(),
        }];
        if self.dryrun || self.force_pull {
            return pull;
        }
        match self.engine.image_exists(image).await {
            Ok(true) => Vec::new(),
            Ok(false) => pull,
            Err(e) => {
                tracing::warn!(image = %image, error = %e, "unable to inspect image, pulling");
                pull
            }
        }
    }

    async fn resolve_remote(
        &self,
        uses: &str,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<(String, Vec<SetupStep>), RunError> {
        let url = format!("https://{}/{owner}/{repo}", self.repository_host);
        if !self.repositories.is_reachable(&url).await {
            return Err(RunError::resolution(uses, format!("{url} is not reachable")));
        }

        let dir = self
            .checkout_root
            .join(sanitize_name(owner, usize::MAX))
            .join(sanitize_name(repo, usize::MAX))
            .join(sanitize_name(git_ref, usize::MAX));
        let context_dir = if path == "." { dir.clone() } else { dir.join(path) };
        let tag = format!("{repo}:{git_ref}");

        Ok((
            tag.clone(),
            vec![
                SetupStep::Checkout {
                    url,
                    git_ref: git_ref.to_string(),
                    dir,
                },
                SetupStep::Build { context_dir, tag },
            ],
        ))
    }
}
