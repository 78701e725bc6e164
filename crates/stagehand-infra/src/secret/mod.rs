//! Secret sources and the terminal prompt.
//!
//! Lookup order for a run: process environment, then values given on the
//! command line, then the secrets file. Anything still missing is asked for
//! once through [`prompt::TerminalPrompt`].

pub mod env;
pub mod file;
pub mod prompt;

use std::sync::Arc;

use stagehand_core::backend::SecretSource;
use stagehand_core::secret::StaticSecrets;

pub use env::EnvSecretSource;
pub use file::load_secret_file;
pub use prompt::TerminalPrompt;

/// Build the ordered, non-interactive source chain.
pub fn build_secret_sources(
    command_line: StaticSecrets,
    file: Option<StaticSecrets>,
) -> Vec<Arc<dyn SecretSource>> {
    let mut chain: Vec<Arc<dyn SecretSource>> = vec![Arc::new(EnvSecretSource::new())];

    if !command_line.is_empty() {
        chain.push(Arc::new(command_line));
    }

    if let Some(file) = file.filter(|f| !f.is_empty()) {
        chain.push(Arc::new(file));
    }

    tracing::debug!(
        sources = ?chain.iter().map(|s| s.name().to_string()).collect::<Vec<_>>(),
        "secret sources"
    );
    chain
}
