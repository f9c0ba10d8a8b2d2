//! Startup configuration for Apiary
//!
//! The host reads a single JSON settings document once at startup. An
//! unreadable or malformed document aborts startup; individual fields fall
//! back to defaults when absent. The raw bytes are kept so
//! `GET /settings.json` can serve the document verbatim.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ApiaryError, Result};

/// Default listen port when neither `--port` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 3000;

/// Default settings document path, relative to the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Default modules directory, relative to the working directory.
pub const DEFAULT_MODULES_DIR: &str = "modules";

/// Environment variable checked for a port override.
pub const PORT_ENV_VAR: &str = "PORT";

/// The parsed settings document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// API-level settings consumed by the response envelope.
    #[serde(rename = "apiSettings", default)]
    pub api_settings: ApiSettings,

    /// Raw document text, served verbatim at `GET /settings.json`.
    #[serde(skip)]
    raw: String,
}

/// Settings that shape every API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Creator string injected into enveloped JSON responses.
    #[serde(default = "default_creator")]
    pub creator: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            creator: default_creator(),
        }
    }
}

fn default_creator() -> String {
    "Created Using Apiary UI".to_string()
}

impl Settings {
    /// Load the settings document from `path`.
    ///
    /// This is the only fatal startup error in the host: a missing or
    /// malformed document returns `ApiaryError::Config` and the caller is
    /// expected to abort with a clear diagnostic.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ApiaryError::Config(format!(
                "failed to read settings document {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut settings: Settings = serde_json::from_str(&raw).map_err(|e| {
            ApiaryError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        settings.raw = raw;

        Ok(settings)
    }

    /// Creator string for the response envelope.
    pub fn creator(&self) -> &str {
        &self.api_settings.creator
    }

    /// The document exactly as it was read from disk.
    pub fn raw_document(&self) -> &str {
        &self.raw
    }
}

/// Resolve the listen port: explicit flag first, then the `PORT` environment
/// variable, then [`DEFAULT_PORT`].
pub fn listen_port(flag: Option<u16>) -> u16 {
    resolve_port(flag, std::env::var(PORT_ENV_VAR).ok())
}

fn resolve_port(flag: Option<u16>, env: Option<String>) -> u16 {
    if let Some(port) = flag {
        return port;
    }

    match env {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(value = %raw, "ignoring unparsable PORT override");
            DEFAULT_PORT
        }),
        None => DEFAULT_PORT,
    }
}
