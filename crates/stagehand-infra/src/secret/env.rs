//! Secrets from the process environment.

use stagehand_core::backend::SecretSource;

/// Reads `key` as an environment variable name. A variable that is set counts
/// as present even when empty; unset and non-UTF-8 variables are absent.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretSource;

impl EnvSecretSource {
    pub fn new() -> Self {
        Self
    }
}

impl SecretSource for EnvSecretSource {
    fn name(&self) -> &str {
        "environment"
    }

    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}
