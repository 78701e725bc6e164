//! Git metadata read straight from the `.git` directory.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use stagehand_core::backend::GitMetadata;
use stagehand_types::error::GitError;

static CODECOMMIT_HTTP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://git-codecommit\.(.+)\.amazonaws\.com/v1/repos/(.+)$")
        .expect("codecommit http regex should compile")
});

static CODECOMMIT_SSH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ssh://git-codecommit\.(.+)\.amazonaws\.com/v1/repos/(.+)$")
        .expect("codecommit ssh regex should compile")
});

static GITHUB_HTTP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://.*github\.com.*/(.+)/(.+?)(?:\.git)?/?$")
        .expect("github http regex should compile")
});

static GITHUB_SSH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com[:/](.+)/(.+?)(?:\.git)?$").expect("github ssh regex should compile")
});

#[derive(Debug, Clone, Copy, Default)]
pub struct FsGitMetadata;

impl FsGitMetadata {
    pub fn new() -> Self {
        Self
    }
}

impl GitMetadata for FsGitMetadata {
    fn revision(&self, path: &Path) -> Result<String, GitError> {
        let git_dir = find_git_dir(path)?;
        match read_head(&git_dir)? {
            Head::Detached(sha) => Ok(sha),
            Head::Ref(reference) => read_ref(&git_dir, &reference),
        }
    }

    fn branch(&self, path: &Path) -> Result<String, GitError> {
        let git_dir = find_git_dir(path)?;
        match read_head(&git_dir)? {
            Head::Ref(reference) => Ok(reference
                .strip_prefix("refs/heads/")
                .unwrap_or(&reference)
                .to_string()),
            Head::Detached(_) => Err(GitError::DetachedHead),
        }
    }

    fn repository_slug(&self, path: &Path, remote: &str) -> Result<String, GitError> {
        let git_dir = find_git_dir(path)?;
        let config = std::fs::read_to_string(git_dir.join("config"))
            .map_err(|e| GitError::Io(e.to_string()))?;
        let url = remote_url(&config, remote).ok_or(GitError::MissingRemote)?;
        repository_slug(&url)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Head {
    Ref(String),
    Detached(String),
}

/// Nearest `.git` directory at or above `from`. A `.git` file pointing
/// elsewhere (worktrees, submodules) is followed.
fn find_git_dir(from: &Path) -> Result<PathBuf, GitError> {
    let start = std::path::absolute(from).map_err(|e| GitError::Io(e.to_string()))?;
    let start = if start.is_file() {
        start.parent().map(Path::to_path_buf).unwrap_or(start)
    } else {
        start
    };

    for dir in start.ancestors() {
        let candidate = dir.join(".git");
        if candidate.is_dir() {
            return Ok(candidate);
        }
        if candidate.is_file() {
            let pointer = std::fs::read_to_string(&candidate)
                .map_err(|e| GitError::Io(e.to_string()))?;
            if let Some(target) = pointer.trim().strip_prefix("gitdir:") {
                return Ok(dir.join(target.trim()));
            }
        }
    }
    Err(GitError::NotARepository(from.display().to_string()))
}

fn read_head(git_dir: &Path) -> Result<Head, GitError> {
    let head = std::fs::read_to_string(git_dir.join("HEAD"))
        .map_err(|e| GitError::Io(e.to_string()))?;
    let head = head.trim();
    Ok(match head.strip_prefix("ref:") {
        Some(reference) => Head::Ref(reference.trim().to_string()),
        None => Head::Detached(head.to_string()),
    })
}

/// Commit id of `reference`, from a loose ref file or `packed-refs`.
fn read_ref(git_dir: &Path, reference: &str) -> Result<String, GitError> {
    if let Ok(sha) = std::fs::read_to_string(git_dir.join(reference)) {
        return Ok(sha.trim().to_string());
    }

    let packed = std::fs::read_to_string(git_dir.join("packed-refs"))
        .map_err(|e| GitError::Io(format!("{reference}: {e}")))?;
    packed
        .lines()
        .filter(|line| !line.starts_with('#') && !line.starts_with('^'))
        .filter_map(|line| line.split_once(' '))
        .find(|(_, name)| name.trim() == reference)
        .map(|(sha, _)| sha.to_string())
        .ok_or_else(|| GitError::Io(format!("unknown ref {reference}")))
}

/// `url` of `[remote "<name>"]` in a git config file.
fn remote_url(config: &str, name: &str) -> Option<String> {
    let header = format!("[remote \"{name}\"]");
    let mut in_section = false;
    for line in config.lines().map(str::trim) {
        if line.starts_with('[') {
            in_section = line.eq_ignore_ascii_case(&header);
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            if key.trim().eq_ignore_ascii_case("url") {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

/// `owner/repo` (or the CodeCommit repository name) for a remote url.
pub fn repository_slug(url: &str) -> Result<String, GitError> {
    if let Some(caps) = CODECOMMIT_HTTP.captures(url) {
        return Ok(caps[2].to_string());
    }
    if let Some(caps) = CODECOMMIT_SSH.captures(url) {
        return Ok(caps[2].to_string());
    }
    if let Some(caps) = GITHUB_HTTP
        .captures(url)
        .or_else(|| GITHUB_SSH.captures(url))
    {
        return Ok(format!("{}/{}", &caps[1], &caps[2]));
    }
    Err(GitError::UnrecognisedRemote(url.to_string()))
}
