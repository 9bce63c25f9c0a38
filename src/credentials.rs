//! Credential loading from the session secret store and the process
//! environment.
//!
//! The secret store is a dotenv-format file (`~/.aboutme/.env`) that must be
//! private to the owner. Lookups consult it first and fall back to the
//! environment.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::config::runtime_paths;

/// Key holding the OpenAI API key.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Key naming the completion model.
pub const OPENAI_MODEL: &str = "OPENAI_MODEL";

/// Session-scoped secrets loaded from the `.env` file.
#[derive(Clone, Default)]
pub struct Credentials {
    vars: BTreeMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a key-value map.
    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    /// Returns a non-blank credential value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Whether no secrets are loaded.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Load credentials from a specific `.env` path.
///
/// # Errors
///
/// Returns an error if the file does not exist, permissions are too broad,
/// or parsing fails.
pub fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "credentials file does not exist: {}",
            path.display()
        ));
    }

    validate_private_permissions(path)?;

    let mut vars = BTreeMap::new();
    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read credentials at {}", path.display()))?;

    for item in iter {
        let (key, value) = item.with_context(|| {
            format!(
                "failed to parse key-value entry in credentials file {}",
                path.display()
            )
        })?;
        vars.insert(key, value);
    }

    Ok(Credentials { vars })
}

/// Load credentials from `~/.aboutme/.env`, or an empty store when the file
/// does not exist.
///
/// # Errors
///
/// Returns an error when runtime paths cannot be resolved or the file exists
/// but is invalid.
pub fn load_default_credentials() -> anyhow::Result<Credentials> {
    let paths = runtime_paths()?;
    if !paths.env_file.exists() {
        debug!(path = %paths.env_file.display(), "no secret store, using environment only");
        return Ok(Credentials::default());
    }
    load_credentials(&paths.env_file)
}

#[cfg(unix)]
fn validate_private_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)
        .with_context(|| format!("failed to inspect credentials file {}", path.display()))?;
    let mode = metadata.permissions().mode() & 0o777;

    if mode & 0o077 != 0 {
        return Err(anyhow::anyhow!(
            "credentials file {} must be 0600, found {:o}",
            path.display(),
            mode
        ));
    }

    Ok(())
}

#[cfg(not(unix))]
fn validate_private_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// OpenAI
// ---------------------------------------------------------------------------

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// The session secret store (`.env` file).
    SecretStore,
    /// The process environment.
    Environment,
}

/// OpenAI API key, sent as `Authorization: Bearer`.
#[derive(Clone, PartialEq, Eq)]
pub struct OpenAiAuth {
    api_key: String,
    source: CredentialSource,
}

impl std::fmt::Debug for OpenAiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAuth")
            .field("api_key", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

impl OpenAiAuth {
    /// Wrap an API key obtained from `source`.
    pub fn new(api_key: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            api_key: api_key.into(),
            source,
        }
    }

    /// The raw key. Only the HTTP layer should call this.
    pub fn secret(&self) -> &str {
        &self.api_key
    }

    /// Where the key was found.
    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

/// Look a key up in the secret store, then in `env`.
fn lookup(
    credentials: &Credentials,
    key: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Option<(String, CredentialSource)> {
    if let Some(value) = credentials.get(key) {
        return Some((value.to_owned(), CredentialSource::SecretStore));
    }
    env(key)
        .filter(|value| !value.trim().is_empty())
        .map(|value| (value, CredentialSource::Environment))
}

/// Resolve the OpenAI API key using a priority chain.
///
/// Resolution order:
/// 1. `OPENAI_API_KEY` from the secret store
/// 2. `OPENAI_API_KEY` from `env`
///
/// Returns `None` if neither source provides a non-blank value.
pub fn resolve_openai_auth(
    credentials: &Credentials,
    env: impl Fn(&str) -> Option<String>,
) -> Option<OpenAiAuth> {
    let (key, source) = lookup(credentials, OPENAI_API_KEY, env)?;
    debug!(?source, "resolved OpenAI API key");
    Some(OpenAiAuth::new(key, source))
}

/// Resolve the model name from `OPENAI_MODEL`, secret store first.
pub fn resolve_model(
    credentials: &Credentials,
    env: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    lookup(credentials, OPENAI_MODEL, env).map(|(model, _)| model)
}

/// Environment resolver backed by the real process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
