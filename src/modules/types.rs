//! Route module types for Apiary
//!
//! This module defines all types used by the module system, including
//! manifest structures for parsing route module files, the handler
//! specification, and the runtime module representation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ApiaryError;

/// The manifest loaded from a route module file.
///
/// Each module file is a JSON document that conforms to this structure. The
/// manifest declares the route's identity, where it is mounted under `/api`,
/// and the handler that produces its payload.
///
/// # Example
///
/// ```json
/// {
///   "name": "Ping",
///   "desc": "Liveness probe",
///   "path": "/ping",
///   "method": "get",
///   "author": "apiary",
///   "category": "system",
///   "handler": {
///     "kind": "static",
///     "body": { "message": "pong" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Display name of the route. Must not be blank.
    #[serde(default)]
    pub name: String,

    /// Human-readable description shown in the catalog.
    #[serde(default)]
    pub desc: String,

    /// Route path relative to `/api`. Must start with `/`. May carry a
    /// query-string suffix (`/search?q=term`) that is kept for display but
    /// ignored when the route is bound.
    #[serde(default)]
    pub path: String,

    /// HTTP method, case-insensitive. Defaults to `get`.
    #[serde(default = "default_method")]
    pub method: String,

    /// Optional author shown in the catalog.
    #[serde(default)]
    pub author: Option<String>,

    /// Optional catalog category. Modules without one are grouped under
    /// `uncategorized`.
    #[serde(default)]
    pub category: Option<String>,

    /// The handler that produces this route's payload. A manifest without
    /// one is rejected during validation.
    #[serde(default)]
    pub handler: Option<HandlerSpec>,
}

impl ModuleManifest {
    /// The path the route is bound at: everything before the first `?`.
    pub fn base_path(&self) -> &str {
        match self.path.split_once('?') {
            Some((base, _)) => base,
            None => self.path.as_str(),
        }
    }

    /// The query-string suffix retained for catalog display, if any.
    pub fn query_suffix(&self) -> Option<&str> {
        self.path.split_once('?').map(|(_, query)| query)
    }

    /// Author shown in the catalog, defaulting to `unknown`.
    pub fn effective_author(&self) -> &str {
        self.author.as_deref().unwrap_or("unknown")
    }

    /// Catalog category, defaulting to `uncategorized`.
    pub fn effective_category(&self) -> &str {
        self.category.as_deref().unwrap_or("uncategorized")
    }
}

/// Returns the default HTTP method for manifests that omit one.
fn default_method() -> String {
    "get".to_string()
}

/// Declarative handler specification within a module manifest.
///
/// The `kind` tag selects the handler implementation; the remaining fields
/// are that handler's configuration. An unrecognized `kind` fails
/// deserialization, so the module is skipped as malformed rather than bound
/// with undefined behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandlerSpec {
    /// Respond with a fixed JSON value.
    Static {
        /// The value returned on every request.
        body: Value,
    },

    /// Reflect the request's JSON body back to the caller. Non-object
    /// bodies come back under an `echo` key.
    Echo {
        /// Fixed object entries applied on top of every response.
        #[serde(default)]
        merge: Value,
    },

    /// Respond with the observed request method, path, and query parameters.
    Inspect,

    /// Respond with a JSON document read from disk on every request. The
    /// path is resolved relative to the module file's directory.
    JsonFile {
        /// File path relative to the module's directory.
        file: String,
    },
}

impl HandlerSpec {
    /// Short name of the handler kind, matching the manifest `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerSpec::Static { .. } => "static",
            HandlerSpec::Echo { .. } => "echo",
            HandlerSpec::Inspect => "inspect",
            HandlerSpec::JsonFile { .. } => "json_file",
        }
    }
}

/// HTTP methods a route module may bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    /// Lowercase method name as it appears in manifests and the catalog.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
        }
    }

    /// The axum method filter used when the route is bound.
    pub fn method_filter(&self) -> axum::routing::MethodFilter {
        use axum::routing::MethodFilter;
        match self {
            HttpMethod::Get => MethodFilter::GET,
            HttpMethod::Post => MethodFilter::POST,
            HttpMethod::Put => MethodFilter::PUT,
            HttpMethod::Delete => MethodFilter::DELETE,
            HttpMethod::Patch => MethodFilter::PATCH,
            HttpMethod::Head => MethodFilter::HEAD,
            HttpMethod::Options => MethodFilter::OPTIONS,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = ApiaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(HttpMethod::Get),
            "post" => Ok(HttpMethod::Post),
            "put" => Ok(HttpMethod::Put),
            "delete" => Ok(HttpMethod::Delete),
            "patch" => Ok(HttpMethod::Patch),
            "head" => Ok(HttpMethod::Head),
            "options" => Ok(HttpMethod::Options),
            _ => Err(ApiaryError::Module(format!(
                "unsupported HTTP method '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated route module with its manifest, parsed method, and the file
/// it was loaded from.
#[derive(Debug, Clone)]
pub struct Module {
    /// The parsed module manifest.
    pub manifest: ModuleManifest,

    /// The manifest's HTTP method, parsed during validation.
    pub method: HttpMethod,

    /// The module file this manifest was loaded from.
    pub source: PathBuf,
}

impl Module {
    /// Create a new module from a validated manifest.
    pub fn new(manifest: ModuleManifest, method: HttpMethod, source: PathBuf) -> Self {
        Self {
            manifest,
            method,
            source,
        }
    }

    /// Get the module name from its manifest.
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    /// The directory the module file lives in. Handler file paths are
    /// resolved against this.
    pub fn source_dir(&self) -> &Path {
        self.source.parent().unwrap_or_else(|| Path::new("."))
    }
}
