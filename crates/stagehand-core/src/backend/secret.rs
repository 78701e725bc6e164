use stagehand_types::error::SecretError;

/// A non-interactive place secrets may already live.
pub trait SecretSource: Send + Sync {
    fn name(&self) -> &str;

    /// `None` when this source has no value for `key`. An empty value is
    /// still a value.
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Interactive, masked entry of a secret value. May block.
pub trait SecretPrompt: Send + Sync {
    fn prompt(&self, key: &str) -> Result<String, SecretError>;
}
