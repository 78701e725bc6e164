use std::path::Path;

use stagehand_types::error::GitError;

/// Read-only git metadata for a directory inside a repository.
pub trait GitMetadata: Send + Sync {
    /// Full commit id HEAD points at.
    fn revision(&self, path: &Path) -> Result<String, GitError>;

    /// Short name of the checked-out branch.
    fn branch(&self, path: &Path) -> Result<String, GitError>;

    /// `owner/repo` derived from the url of `remote`.
    fn repository_slug(&self, path: &Path, remote: &str) -> Result<String, GitError>;
}

/// First seven characters of a commit id.
pub fn short_revision(revision: &str) -> &str {
    revision.get(..7).unwrap_or(revision)
}
