//! Run-wide secret resolution.
//!
//! SecretStore resolves a secret name through a chain of sources in priority
//! order (process environment first, then values handed in on the command
//! line), then through a cache of values entered interactively during this
//! run, and finally by prompting. Whatever is prompted for is cached, so one
//! name resolves to one value for the whole run.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use secrecy::{ExposeSecret, SecretString};
use stagehand_types::error::SecretError;
use tokio::sync::{Mutex, OnceCell};

use crate::backend::{SecretPrompt, SecretSource};

/// Shared by every action of a run.
///
/// First use of a name is single-flight: concurrent callers asking for the
/// same uncached name wait on one prompt. Prompts for different names are
/// serialised so they never interleave on the terminal.
pub struct SecretStore {
    sources: Vec<Arc<dyn SecretSource>>,
    prompt: Arc<dyn SecretPrompt>,
    entered: DashMap<String, Arc<OnceCell<SecretString>>>,
    terminal: Mutex<()>,
}

impl SecretStore {
    pub fn new(sources: Vec<Arc<dyn SecretSource>>, prompt: Arc<dyn SecretPrompt>) -> Self {
        Self {
            sources,
            prompt,
            entered: DashMap::new(),
            terminal: Mutex::new(()),
        }
    }

    pub async fn resolve(&self, key: &str) -> Result<String, SecretError> {
        for source in &self.sources {
            if let Some(value) = source.lookup(key) {
                tracing::trace!(secret = %key, source = source.name(), "secret found");
                return Ok(value);
            }
        }

        let cell = self.entered.entry(key.to_string()).or_default().clone();
        let value = cell.get_or_try_init(|| self.ask(key)).await?;
        Ok(value.expose_secret().to_string())
    }

    async fn ask(&self, key: &str) -> Result<SecretString, SecretError> {
        let _terminal = self.terminal.lock().await;
        tracing::debug!(secret = %key, "prompting for secret");

        let prompt = Arc::clone(&self.prompt);
        let name = key.to_string();
        let value = tokio::task::spawn_blocking(move || prompt.prompt(&name))
            .await
            .map_err(|e| SecretError::PromptUnavailable(e.to_string()))??;
        Ok(SecretString::from(value))
    }
}

// ---------------------------------------------------------------------------
// StaticSecrets
// ---------------------------------------------------------------------------

/// Fixed values known before the run starts (command line, secrets file).
#[derive(Debug)]
pub struct StaticSecrets {
    name: String,
    values: BTreeMap<String, SecretString>,
}

impl StaticSecrets {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value: String = value.into();
        self.values.insert(key.into(), SecretString::from(value));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SecretSource for StaticSecrets {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .map(|value| value.expose_secret().to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    struct CountingPrompt {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl CountingPrompt {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
            })
        }
    }

    impl SecretPrompt for CountingPrompt {
        fn prompt(&self, key: &str) -> Result<String, SecretError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            std::thread::sleep(self.delay);
            Ok(format!("{key}-entered-{n}"))
        }
    }

    struct FailingPrompt;

    impl SecretPrompt for FailingPrompt {
        fn prompt(&self, key: &str) -> Result<String, SecretError> {
            Err(SecretError::Input {
                name: key.to_string(),
                reason: "not a terminal".to_string(),
            })
        }
    }

    fn statics(name: &str, pairs: &[(&str, &str)]) -> Arc<dyn SecretSource> {
        let mut source = StaticSecrets::new(name);
        for (k, v) in pairs {
            source.insert(*k, *v);
        }
        Arc::new(source)
    }

    #[tokio::test]
    async fn test_first_source_wins() {
        let prompt = CountingPrompt::new(Duration::ZERO);
        let store = SecretStore::new(
            vec![
                statics("env", &[("TOKEN", "from-env")]),
                statics("cli", &[("TOKEN", "from-cli"), ("OTHER", "cli-only")]),
            ],
            prompt.clone(),
        );

        assert_eq!(store.resolve("TOKEN").await.unwrap(), "from-env");
        assert_eq!(store.resolve("OTHER").await.unwrap(), "cli-only");
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prompted_value_is_cached() {
        let prompt = CountingPrompt::new(Duration::ZERO);
        let store = SecretStore::new(vec![], prompt.clone());

        let first = store.resolve("API_KEY").await.unwrap();
        let second = store.resolve("API_KEY").await.unwrap();
        assert_eq!(first, "API_KEY-entered-1");
        assert_eq!(first, second);
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_prompts_once() {
        let prompt = CountingPrompt::new(Duration::from_millis(50));
        let store = Arc::new(SecretStore::new(vec![], prompt.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.resolve("SHARED").await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "SHARED-entered-1");
        }
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prompt_failure_propagates_and_is_not_cached() {
        let store = SecretStore::new(vec![], Arc::new(FailingPrompt));
        let err = store.resolve("DEPLOY_KEY").await.unwrap_err();
        assert!(matches!(err, SecretError::Input { ref name, .. } if name == "DEPLOY_KEY"));
        assert!(store.resolve("DEPLOY_KEY").await.is_err());
    }

    #[test]
    fn test_static_secrets_lookup() {
        let mut source = StaticSecrets::new("cli");
        assert!(source.is_empty());
        source.insert("A", "1");
        assert_eq!(source.len(), 1);
        assert_eq!(source.lookup("A").as_deref(), Some("1"));
        assert_eq!(source.lookup("B"), None);
        assert_eq!(source.name(), "cli");
    }

    #[test]
    fn test_static_secrets_debug_hides_values() {
        let mut source = StaticSecrets::new("file");
        source.insert("TOKEN", "hunter2");
        let printed = format!("{source:?}");
        assert!(printed.contains("TOKEN"));
        assert!(!printed.contains("hunter2"));
    }
}
