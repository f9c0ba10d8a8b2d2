//! Route module discovery and loading for Apiary
//!
//! This module handles discovering route module files on disk, loading and
//! parsing their JSON manifests, and validating manifest contents before
//! they are bound to routes.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{ApiaryError, Result};

use super::types::{HttpMethod, Module, ModuleManifest};

/// File extension recognized as a route module.
pub const MODULE_FILE_EXTENSION: &str = "json";

/// Characters with routing meaning that module paths must not contain.
const PATH_METACHARS: [char; 4] = [':', '*', '{', '}'];

/// Outcome of a discovery pass over the modules directory.
///
/// Discovery never fails because of a single bad module file. Every file the
/// host refused to load is recorded here with its reason, so callers can log
/// a summary or fail a preflight check.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Modules that loaded and validated successfully, in discovery order.
    pub modules: Vec<Module>,

    /// Module files that were skipped, with the reason each was rejected.
    pub skipped: Vec<SkippedModule>,
}

impl DiscoveryReport {
    /// True when every discovered file loaded cleanly.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// A module file that discovery refused to load.
#[derive(Debug, Clone)]
pub struct SkippedModule {
    /// The offending file.
    pub path: PathBuf,

    /// Why it was rejected.
    pub reason: String,
}

/// Discover route modules under a directory.
///
/// Walks `dir` recursively and loads every file with a `.json` extension as
/// a module manifest. Traversal is depth-first with entries sorted by name
/// at each level, so the discovery order is stable across runs. Files that
/// fail to parse or validate are logged as warnings and recorded in the
/// report, but never abort discovery.
///
/// A missing modules directory is not an error: the host starts with an
/// empty catalog.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use apiary::modules::discover_modules;
///
/// let report = discover_modules(Path::new("modules"));
/// for module in &report.modules {
///     println!("{} /api{} -> {}", module.method, module.manifest.path, module.name());
/// }
/// ```
pub fn discover_modules(dir: &Path) -> DiscoveryReport {
    let mut report = DiscoveryReport::default();

    if !dir.exists() {
        warn!(dir = %dir.display(), "Modules directory does not exist, starting with no routes");
        return report;
    }

    if !dir.is_dir() {
        warn!(path = %dir.display(), "Modules path is not a directory, starting with no routes");
        return report;
    }

    let mut files = Vec::new();
    collect_module_files(dir, &mut files);

    for path in files {
        match load_module_file(&path) {
            Ok(module) => {
                info!(
                    module = %module.name(),
                    method = %module.method,
                    path = %module.manifest.path,
                    "Discovered route module"
                );
                report.modules.push(module);
            }
            Err(e) => {
                warn!(
                    file = %path.display(),
                    error = %e,
                    "Failed to load route module, skipping"
                );
                report.skipped.push(SkippedModule {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    report
}

/// Collect module file paths depth-first, sorted by name at each level.
///
/// A directory that cannot be read is logged and left out; the walk
/// continues with its siblings.
fn collect_module_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to read directory, skipping");
            return;
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Failed to read directory entry, skipping");
                None
            }
        })
        .collect();
    paths.sort();

    for path in paths {
        if path.is_dir() {
            collect_module_files(&path, files);
        } else if path
            .extension()
            .is_some_and(|ext| ext == MODULE_FILE_EXTENSION)
        {
            files.push(path);
        }
    }
}

/// Load a single route module from a manifest file.
///
/// Reads and parses the JSON manifest, validates its contents, and returns
/// a `Module` carrying the parsed method and the source path.
///
/// # Errors
/// - `ApiaryError::Module` if the file cannot be read or validation fails
/// - `ApiaryError::Json` if the JSON is malformed
pub fn load_module_file(path: &Path) -> Result<Module> {
    let content = fs::read_to_string(path).map_err(|e| {
        ApiaryError::Module(format!("failed to read {}: {}", path.display(), e))
    })?;

    let manifest: ModuleManifest = serde_json::from_str(&content)?;

    let method = validate_manifest(&manifest)?;

    Ok(Module::new(manifest, method, path.to_path_buf()))
}

/// Validate a module manifest against the hosting contract.
///
/// Performs the following checks:
/// - The name must not be blank
/// - The route path (before any `?` suffix) must be non-empty, start with
///   `/`, and contain none of `:`, `*`, `{`, `}`
/// - The HTTP method must be one the host supports
/// - A handler must be present
///
/// # Returns
/// The parsed HTTP method, or `ApiaryError::Module` describing the violation.
pub fn validate_manifest(manifest: &ModuleManifest) -> Result<HttpMethod> {
    if manifest.name.trim().is_empty() {
        return Err(ApiaryError::Module(
            "module name must not be blank".to_string(),
        ));
    }

    let base = manifest.base_path();
    if base.is_empty() {
        return Err(ApiaryError::Module(format!(
            "module '{}' is missing a route path",
            manifest.name
        )));
    }
    if !base.starts_with('/') {
        return Err(ApiaryError::Module(format!(
            "module '{}' has route path '{}' that does not start with '/'",
            manifest.name, base
        )));
    }
    if let Some(ch) = base.chars().find(|c| PATH_METACHARS.contains(c)) {
        return Err(ApiaryError::Module(format!(
            "module '{}' has route path '{}' containing reserved character '{}'",
            manifest.name, base, ch
        )));
    }

    let method = manifest.method.parse::<HttpMethod>().map_err(|_| {
        ApiaryError::Module(format!(
            "module '{}' declares unsupported HTTP method '{}'",
            manifest.name, manifest.method
        ))
    })?;

    if manifest.handler.is_none() {
        return Err(ApiaryError::Module(format!(
            "module '{}' does not define a handler",
            manifest.name
        )));
    }

    Ok(method)
}
