//! `NAME=VALUE` secrets files.

use std::path::Path;

use stagehand_core::secret::StaticSecrets;
use stagehand_types::error::RunError;

/// Load a secrets file. A missing file yields an empty source; a malformed
/// line is an error naming the line number.
///
/// Blank lines and `#` comments are ignored, an optional leading `export `
/// is accepted, and values may be wrapped in single or double quotes.
pub async fn load_secret_file(path: &Path) -> Result<StaticSecrets, RunError> {
    let mut secrets = StaticSecrets::new("secrets file");

    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no secrets file");
            return Ok(secrets);
        }
        Err(e) => return Err(RunError::load(format!("secrets file {}", path.display()), e)),
    };

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((name, value)) = line.split_once('=') else {
            return Err(RunError::load(
                format!("secrets file {}", path.display()),
                format!("line {}: expected NAME=VALUE", index + 1),
            ));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(RunError::load(
                format!("secrets file {}", path.display()),
                format!("line {}: empty name", index + 1),
            ));
        }
        secrets.insert(name, unquote(value.trim()));
    }

    tracing::debug!(path = %path.display(), count = secrets.len(), "loaded secrets file");
    Ok(secrets)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
