//! Configuration loading and validation.
//!
//! Loads `aboutme.toml` from `--config`, `$ABOUTME_CONFIG_PATH`, or the
//! working directory. A missing file means defaults. Environment variables
//! override file values; file values override defaults.
//!
//! The model name is resolved separately (secret store, then environment,
//! then `[model].name`), see [`crate::credentials::resolve_model`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::client::GenerationParameters;
use crate::profile::document::{DocumentSources, DEFAULT_KNOWLEDGE_BASE_MAX_CHARS};
use crate::profile::ProfileFields;
use crate::prompt::Persona;
use crate::providers::openai::OPENAI_API_BASE;

/// Env var naming the config file.
pub const CONFIG_PATH_ENV: &str = "ABOUTME_CONFIG_PATH";
/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "aboutme.toml";

// ── Top-level config ────────────────────────────────────────────

/// Top-level configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Completion model and endpoint.
    pub model: ModelConfig,
    /// Initial profile field values.
    pub profile: ProfileFields,
    /// Optional external documents.
    pub documents: DocumentsConfig,
    /// Chat behaviour: persona, greeting, suggestions.
    pub chat: ChatConfig,
}

/// Completion model and endpoint settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier used when neither secrets nor env name one.
    pub name: String,
    /// Sampling temperature in `[0.0, 1.2]`.
    pub temperature: f64,
    /// OpenAI-compatible API base URL.
    pub base_url: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            temperature: 0.4,
            base_url: OPENAI_API_BASE.to_owned(),
        }
    }
}

/// Default completion model.
pub fn default_model_name() -> String {
    "gpt-4o-mini".to_owned()
}

/// Paths of the optional knowledge base and structured profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Free-text knowledge base (e.g. `kb.md`).
    pub knowledge_base: Option<PathBuf>,
    /// Structured profile JSON (e.g. `profile.json`).
    pub structured_profile: Option<PathBuf>,
    /// Knowledge-base ceiling in characters.
    pub knowledge_base_max_chars: usize,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            knowledge_base: None,
            structured_profile: None,
            knowledge_base_max_chars: DEFAULT_KNOWLEDGE_BASE_MAX_CHARS,
        }
    }
}

impl DocumentsConfig {
    /// Convert into loader sources.
    pub fn sources(&self) -> DocumentSources {
        DocumentSources {
            knowledge_base: self.knowledge_base.clone(),
            structured_profile: self.structured_profile.clone(),
            knowledge_base_max_chars: self.knowledge_base_max_chars,
        }
    }

    /// Resolve relative document paths against `base` (the config file's directory).
    fn anchor_to(&mut self, base: &Path) {
        for path in [&mut self.knowledge_base, &mut self.structured_profile]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Chat behaviour settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Prompt persona.
    pub persona: Persona,
    /// Assistant greeting shown (not sent) while the history is empty.
    pub greeting: Option<String>,
    /// Replacement suggestion catalog. `None` keeps the built-in questions.
    pub suggestions: Option<Vec<String>>,
}

impl Config {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// the merged result fails validation.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_with(explicit, |key| std::env::var(key).ok())
    }

    /// [`Config::load`] with a custom env resolver (for testing).
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`].
    pub fn load_with(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let path = config_path_with(explicit, &env);
        let mut config = Self::load_from_file(&path)?;
        config.apply_overrides(&env);
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file only; a missing file yields defaults.
    fn load_from_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                let mut config = Self::from_toml(&contents)
                    .with_context(|| format!("failed to parse config at {}", path.display()))?;
                if let Some(base) = path.parent() {
                    config.documents.anchor_to(base);
                }
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config at {}: {e}",
                path.display()
            )),
        }
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid TOML or unknown enum values.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability (avoids `set_var` in tests).
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("ABOUTME_BASE_URL") {
            self.model.base_url = v;
        }
        if let Some(v) = env("ABOUTME_TEMPERATURE") {
            match v.parse() {
                Ok(t) => self.model.temperature = t,
                Err(_) => tracing::warn!(
                    var = "ABOUTME_TEMPERATURE",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("ABOUTME_PERSONA") {
            match v.parse() {
                Ok(p) => self.chat.persona = p,
                Err(e) => tracing::warn!(var = "ABOUTME_PERSONA", error = %e, "ignoring invalid env override"),
            }
        }
        if let Some(v) = env("ABOUTME_KNOWLEDGE_BASE") {
            self.documents.knowledge_base = Some(PathBuf::from(v));
        }
        if let Some(v) = env("ABOUTME_PROFILE_JSON") {
            self.documents.structured_profile = Some(PathBuf::from(v));
        }
    }

    /// Check value ranges and formats.
    ///
    /// # Errors
    ///
    /// Returns an error for an out-of-range temperature, an unusable base
    /// URL, or a zero knowledge-base ceiling.
    pub fn validate(&self) -> Result<()> {
        GenerationParameters::new(self.model.name.clone(), self.model.temperature)
            .context("invalid [model] settings")?;

        let url = url::Url::parse(&self.model.base_url)
            .with_context(|| format!("invalid base_url '{}'", self.model.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("base_url must be http or https, got '{}'", url.scheme());
        }

        if self.documents.knowledge_base_max_chars == 0 {
            anyhow::bail!("knowledge_base_max_chars must be greater than zero");
        }

        if let Some(suggestions) = &self.chat.suggestions {
            if suggestions.iter().any(|s| s.trim().is_empty()) {
                anyhow::bail!("chat.suggestions must not contain blank entries");
            }
        }
        Ok(())
    }
}

/// Resolve config file path: explicit flag, then `$ABOUTME_CONFIG_PATH`,
/// then `./aboutme.toml`.
pub fn config_path_with(explicit: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_owned();
    }
    if let Some(p) = env(CONFIG_PATH_ENV) {
        return PathBuf::from(p);
    }
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

// ── Runtime paths ───────────────────────────────────────────────

/// Home-relative runtime locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    /// `~/.aboutme`
    pub root: PathBuf,
    /// `~/.aboutme/.env` secret store.
    pub env_file: PathBuf,
    /// `~/.aboutme/logs`
    pub logs_dir: PathBuf,
}

/// Resolve the default config directory (`~/.aboutme/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".aboutme"))
}

/// Resolve all runtime paths under [`config_dir`].
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn runtime_paths() -> Result<RuntimePaths> {
    let root = config_dir()?;
    Ok(RuntimePaths {
        env_file: root.join(".env"),
        logs_dir: root.join("logs"),
        root,
    })
}
