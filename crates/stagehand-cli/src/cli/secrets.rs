//! `-s NAME[=VALUE]` handling.

use anyhow::{Result, bail};
use stagehand_core::backend::SecretPrompt;
use stagehand_core::secret::StaticSecrets;

use super::Cli;

/// Command line secrets for this invocation. `--list` and `--graph` never
/// read secrets, so their flags are not resolved and nothing is prompted.
pub fn invocation_secrets(cli: &Cli, prompt: &dyn SecretPrompt) -> Result<StaticSecrets> {
    if !cli.runs_workflow() {
        return Ok(StaticSecrets::new("command line"));
    }
    command_line_secrets(&cli.secrets, prompt)
}

/// Turn `-s` flags into a secret source. `NAME=VALUE` is taken literally;
/// a bare `NAME` is read from the environment, or asked for right away.
pub fn command_line_secrets(flags: &[String], prompt: &dyn SecretPrompt) -> Result<StaticSecrets> {
    let mut secrets = StaticSecrets::new("command line");

    for flag in flags {
        match flag.split_once('=') {
            Some((name, _)) if name.is_empty() => bail!("secret '{flag}' has no name"),
            Some((name, value)) => secrets.insert(name, value),
            None => {
                let value = match std::env::var(flag) {
                    Ok(value) => value,
                    Err(_) => prompt.prompt(flag)?,
                };
                secrets.insert(flag.as_str(), value);
            }
        }
    }

    Ok(secrets)
}
