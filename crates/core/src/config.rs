//! TOML-based configuration for treesync.
//!
//! The file is read-only input; treesync never writes it and keeps no other
//! state. Every section is optional, so an absent file behaves exactly like
//! [`AppConfig::default`]. Secrets (the fetch token) are referenced by
//! environment variable name and resolved at runtime via
//! [`AppConfig::resolve_env_vars`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging and staging-ref settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Commit message templates.
    #[serde(default)]
    pub message: MessageConfig,

    /// Identity used for the import commit.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Settings for fetching external repositories.
    #[serde(default)]
    pub fetch: FetchConfig,
}

// ---------------------------------------------------------------------------
// General
// ---------------------------------------------------------------------------

/// Logging and staging-ref settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Ref that fetched external heads are stored under.
    #[serde(default = "default_staging_ref")]
    pub staging_ref: String,
}

fn default_log_level() -> String {
    "warn".into()
}
fn default_staging_ref() -> String {
    "refs/treesync/source".into()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            staging_ref: default_staging_ref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Commit message templates.
///
/// Placeholders: `{source}` (description of the external source),
/// `{short_id}` (abbreviated id of the external head) and `{summary}` (its
/// one-line commit summary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    /// Draft message for the import commit, offered to the editor.
    #[serde(default = "default_import_template")]
    pub import_template: String,

    /// Message for the merge commit.
    #[serde(default = "default_merge_template")]
    pub merge_template: String,
}

fn default_import_template() -> String {
    "Import tree of {source}\n\n{source} is at {short_id}: {summary}\n".into()
}
fn default_merge_template() -> String {
    "Merge tree of {source}".into()
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            import_template: default_import_template(),
            merge_template: default_merge_template(),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Author/committer override for the import commit.
///
/// When unset, the repository's `user.name` / `user.email` are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

/// Settings for fetching `repository + ref` sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Environment variable holding an HTTPS token for the external remote.
    #[serde(default)]
    pub token_env: Option<String>,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    ///
    /// Used for the implicit per-user location; an explicitly requested
    /// file should go through [`AppConfig::load_from_file`] instead.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!(path = %path.display(), "no configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Resolve `_env` references into their secret values.
    ///
    /// A missing variable only logs a warning: the token is optional and
    /// fetches over SSH or from local paths do not need it.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref env_name) = self.fetch.token_env {
            self.fetch.token = resolve_optional_env(env_name, "fetch.token_env");
        }
        Ok(())
    }

    /// Validate that all fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, template) in [
            ("message.import_template", &self.message.import_template),
            ("message.merge_template", &self.message.merge_template),
        ] {
            if template.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    detail: "template must not be empty".into(),
                });
            }
            if !template.contains("{source}") {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    detail: "template must mention {source}".into(),
                });
            }
        }
        if !self.general.staging_ref.starts_with("refs/") {
            return Err(ConfigError::InvalidValue {
                field: "general.staging_ref".into(),
                detail: "staging ref must be a full ref name under refs/".into(),
            });
        }
        if !git2::Reference::is_valid_name(&self.general.staging_ref) {
            return Err(ConfigError::InvalidValue {
                field: "general.staging_ref".into(),
                detail: format!("'{}' is not a valid ref name", self.general.staging_ref),
            });
        }
        if self.identity.name.is_some() != self.identity.email.is_some() {
            return Err(ConfigError::InvalidValue {
                field: "identity".into(),
                detail: "name and email must be set together".into(),
            });
        }
        Ok(())
    }

    /// Convenience: load (or default), resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P, required: bool) -> Result<Self, ConfigError> {
        let mut config = if required {
            Self::load_from_file(path)?
        } else {
            Self::load_or_default(path)?
        };
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
