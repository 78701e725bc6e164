use thiserror::Error;

/// Errors raised while layering actions into execution stages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("unable to build dependency graph: actions {stuck:?} never became runnable{}", describe_cycle(.cycle))]
    Unresolvable {
        stuck: Vec<String>,
        cycle: Vec<String>,
    },

    #[error("action '{0}' is needed but not defined")]
    UnknownAction(String),
}

fn describe_cycle(cycle: &[String]) -> String {
    if cycle.is_empty() {
        String::new()
    } else {
        format!(" (cycle among {})", cycle.join(", "))
    }
}

/// Errors reported by a container engine adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("failed to launch '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("exiting with `NEUTRAL`: 78")]
    Neutral { container: String },

    #[error("exit with `FAILURE`: {code}")]
    ExitStatus { container: String, code: i32 },

    #[error("container '{0}' was terminated by a signal")]
    Terminated(String),

    #[error("environment value for '{0}' spans several lines")]
    MultilineEnv(String),

    #[error("checkout of {url}@{git_ref} failed: {reason}")]
    Checkout {
        url: String,
        git_ref: String,
        reason: String,
    },
}

/// Errors from git metadata lookups.
///
/// These are informational: callers log them and fall back.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("no git repository found above '{0}'")]
    NotARepository(String),

    #[error("unable to read git metadata: {0}")]
    Io(String),

    #[error("HEAD is not on a branch")]
    DetachedHead,

    #[error("no remote 'origin' configured")]
    MissingRemote,

    #[error("unrecognised remote url '{0}'")]
    UnrecognisedRemote(String),
}

/// Errors from secret lookup and entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("secret prompt unavailable: {0}")]
    PromptUnavailable(String),

    #[error("failed to read secret '{name}': {reason}")]
    Input { name: String, reason: String },
}

/// Errors surfaced by a run: construction, resolution and execution.
///
/// Cloneable so that resolution failures can be captured inside
/// an always-failing executor and yielded when the tree runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("unsupported event: {0}")]
    EventNotFound(String),

    #[error("unsupported action: {0}")]
    ActionNotFound(String),

    #[error("unable to resolve action '{uses}': {reason}")]
    Resolution { uses: String, reason: String },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("unable to load {what}: {reason}")]
    Load { what: String, reason: String },

    #[error("i/o error: {0}")]
    Io(String),

    #[error("run cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl RunError {
    /// Shorthand for a resolution failure.
    pub fn resolution(uses: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            uses: uses.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a construction-time load failure.
    pub fn load(what: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Load {
            what: what.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<std::io::Error> for RunError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
