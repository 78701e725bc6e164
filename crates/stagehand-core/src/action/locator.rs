//! Classification of an action's `uses` string.

use std::sync::LazyLock;

use regex::Regex;

static REMOTE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^/@]+)/([^/@]+)(/([^@]*))?(@(.*))?$")
        .expect("remote locator regex should compile")
});

static NON_ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-zA-Z0-9]").expect("sanitising regex should compile")
});

const DOCKER_SCHEME: &str = "docker://";

/// Where an action's image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// `./path`: a build context inside the working directory.
    LocalPath { path: String },
    /// `docker://host[:port]/path[:tag]`: an existing image.
    DockerImage { image: String },
    /// `owner/repo[/subpath][@ref]`: a build context in a remote repository.
    RemoteRepository {
        owner: String,
        repo: String,
        path: String,
        git_ref: String,
    },
}

impl Locator {
    /// Classify `uses` without touching the network or the filesystem.
    ///
    /// Forms are tried in order: local path, image reference, remote
    /// repository. `default_ref` fills in a remote repository without `@ref`.
    pub fn classify(uses: &str, default_ref: &str) -> Option<Self> {
        if uses.starts_with("./") {
            return Some(Self::LocalPath {
                path: uses.to_string(),
            });
        }

        if let Some(image) = uses.strip_prefix(DOCKER_SCHEME) {
            return (!image.is_empty()).then(|| Self::DockerImage {
                image: image.to_string(),
            });
        }

        let captures = REMOTE_PATTERN.captures(uses)?;
        let group = |i: usize| {
            captures
                .get(i)
                .map(|m| m.as_str())
                .filter(|s| !s.is_empty())
        };
        Some(Self::RemoteRepository {
            owner: group(1)?.to_string(),
            repo: group(2)?.to_string(),
            path: group(4).unwrap_or(".").to_string(),
            git_ref: group(6).unwrap_or(default_ref).to_string(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::LocalPath { .. } => "local",
            Self::DockerImage { .. } => "image",
            Self::RemoteRepository { .. } => "remote",
        }
    }
}

/// Replace every character outside `[a-zA-Z0-9]` with `-` and cut to `max`.
pub fn sanitize_name(raw: &str, max: usize) -> String {
    let mut name = NON_ALPHANUMERIC.replace_all(raw, "-").into_owned();
    name.truncate(max);
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path() {
        assert_eq!(
            Locator::classify("./x", "master"),
            Some(Locator::LocalPath {
                path: "./x".to_string()
            })
        );
    }

    #[test]
    fn test_docker_image() {
        assert_eq!(
            Locator::classify("docker://ubuntu:18.04", "master"),
            Some(Locator::DockerImage {
                image: "ubuntu:18.04".to_string()
            })
        );
        assert_eq!(
            Locator::classify("docker://registry.local:5000/team/tool:1.2", "master"),
            Some(Locator::DockerImage {
                image: "registry.local:5000/team/tool:1.2".to_string()
            })
        );
    }

    #[test]
    fn test_remote_with_ref() {
        assert_eq!(
            Locator::classify("nektos/act@v1", "master"),
            Some(Locator::RemoteRepository {
                owner: "nektos".to_string(),
                repo: "act".to_string(),
                path: ".".to_string(),
                git_ref: "v1".to_string(),
            })
        );
    }

    #[test]
    fn test_remote_with_subpath_and_default_ref() {
        assert_eq!(
            Locator::classify("actions/docker/cli", "main"),
            Some(Locator::RemoteRepository {
                owner: "actions".to_string(),
                repo: "docker".to_string(),
                path: "cli".to_string(),
                git_ref: "main".to_string(),
            })
        );
    }

    #[test]
    fn test_unrecognised_forms() {
        assert_eq!(Locator::classify("docker://", "master"), None);
        assert_eq!(Locator::classify("just-a-name", "master"), None);
        assert_eq!(Locator::classify("/abs/path", "master"), None);
        assert_eq!(Locator::classify("", "master"), None);
    }

    #[test]
    fn test_sanitize_name() {
        let name = sanitize_name("myproject1234567890-build!!", 30);
        assert_eq!(name, "myproject1234567890-build--");
        assert!(name.len() <= 30);
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));

        let long = sanitize_name(&"x".repeat(64), 30);
        assert_eq!(long.len(), 30);
        assert_eq!(sanitize_name("héllo", 30), "h-llo");
    }
}
