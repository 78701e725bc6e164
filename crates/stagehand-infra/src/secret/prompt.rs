//! Masked secret entry on the controlling terminal.

use console::Term;
use dialoguer::Password;
use stagehand_core::backend::SecretPrompt;
use stagehand_types::error::SecretError;

#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    pub fn new() -> Self {
        Self
    }
}

impl SecretPrompt for TerminalPrompt {
    fn prompt(&self, key: &str) -> Result<String, SecretError> {
        let term = Term::stderr();
        if !term.is_term() {
            return Err(SecretError::PromptUnavailable(format!(
                "stderr is not a terminal; provide '{key}' via the environment or a secrets file"
            )));
        }

        Password::new()
            .with_prompt(format!("Provide value for '{key}'"))
            .allow_empty_password(true)
            .interact_on(&term)
            .map_err(|e| SecretError::Input {
                name: key.to_string(),
                reason: e.to_string(),
            })
    }
}
