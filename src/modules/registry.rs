//! Route registry for Apiary
//!
//! This module provides the `RouteRegistry` struct that maps validated
//! modules to route bindings. It enforces route uniqueness per HTTP method
//! and path, and reserves the catalog route so no module can shadow it.
//! Once the server takes ownership of a registry the set of routes is
//! frozen; nothing rebinds at request time.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::error::{ApiaryError, Result};
use crate::handlers::{build_handler, RouteHandler};

use super::types::{HttpMethod, Module};

/// Prefix under which every module route and the catalog are mounted.
pub const API_PREFIX: &str = "/api";

/// Path of the route catalog, reserved under [`API_PREFIX`] for the host
/// itself.
pub const CATALOG_PATH: &str = "/info";

/// A module bound to its instantiated handler.
pub struct RouteBinding {
    /// The module this binding came from.
    pub module: Module,

    /// The handler invoked for requests matching this binding.
    pub handler: Arc<dyn RouteHandler>,
}

impl RouteBinding {
    /// The path this binding answers at, relative to [`API_PREFIX`].
    pub fn base_path(&self) -> &str {
        self.module.manifest.base_path()
    }

    /// The absolute path as advertised to clients, query suffix included.
    pub fn display_path(&self) -> String {
        format!("{}{}", API_PREFIX, self.module.manifest.path)
    }

    /// The HTTP method this binding answers to.
    pub fn method(&self) -> HttpMethod {
        self.module.method
    }
}

/// A registry that holds route bindings and rejects duplicates.
///
/// Routes are keyed by `(method, base path)`: two modules may share a path
/// with different methods, but a second module claiming an occupied key is
/// rejected and the registry is left unchanged. The catalog route is seeded
/// as occupied from the start.
///
/// # Example
///
/// ```rust
/// use std::path::PathBuf;
/// use apiary::modules::{Module, ModuleManifest, HttpMethod, RouteRegistry};
/// use apiary::modules::HandlerSpec;
/// use serde_json::json;
///
/// let mut registry = RouteRegistry::new();
///
/// let manifest = ModuleManifest {
///     name: "Ping".to_string(),
///     desc: "Liveness probe".to_string(),
///     path: "/ping".to_string(),
///     method: "get".to_string(),
///     author: None,
///     category: None,
///     handler: Some(HandlerSpec::Static { body: json!({ "message": "pong" }) }),
/// };
///
/// let module = Module::new(manifest, HttpMethod::Get, PathBuf::from("ping.json"));
/// registry.bind_module(module).unwrap();
///
/// assert_eq!(registry.route_count(), 1);
/// assert!(registry.is_bound(HttpMethod::Get, "/ping"));
/// ```
pub struct RouteRegistry {
    /// Bindings in the order they were accepted.
    bindings: Vec<RouteBinding>,

    /// Occupied `(method, base path)` keys.
    bound: HashSet<(HttpMethod, String)>,
}

impl RouteRegistry {
    /// Create a new registry with the catalog route reserved.
    pub fn new() -> Self {
        let mut bound = HashSet::new();
        bound.insert((HttpMethod::Get, CATALOG_PATH.to_string()));
        Self {
            bindings: Vec::new(),
            bound,
        }
    }

    /// Bind a module with an already-built handler.
    ///
    /// Any query-string suffix on the module path is ignored for the
    /// binding key; only the base path participates in conflict detection.
    ///
    /// # Returns
    /// `Ok(())` on success, or `ApiaryError::RouteConflict` if the
    /// `(method, base path)` key is already occupied. On conflict the
    /// registry is unchanged.
    pub fn bind(&mut self, module: Module, handler: Arc<dyn RouteHandler>) -> Result<()> {
        let key = (module.method, module.manifest.base_path().to_string());
        if self.bound.contains(&key) {
            return Err(ApiaryError::RouteConflict {
                method: module.method.to_string(),
                path: key.1,
            });
        }

        info!(
            module = %module.name(),
            method = %module.method,
            path = %module.manifest.base_path(),
            "Bound route"
        );

        self.bound.insert(key);
        self.bindings.push(RouteBinding { module, handler });

        Ok(())
    }

    /// Bind a module, instantiating the handler from its manifest.
    ///
    /// # Returns
    /// `Ok(())` on success, `ApiaryError::Module` if the manifest carries no
    /// handler, or `ApiaryError::RouteConflict` on a duplicate route.
    pub fn bind_module(&mut self, module: Module) -> Result<()> {
        let spec = module.manifest.handler.clone().ok_or_else(|| {
            ApiaryError::Module(format!(
                "module '{}' does not define a handler",
                module.name()
            ))
        })?;

        let handler = build_handler(&spec, module.source_dir());
        self.bind(module, handler)
    }

    /// All accepted bindings, in bind order.
    pub fn bindings(&self) -> &[RouteBinding] {
        &self.bindings
    }

    /// Consume the registry, freezing the route set.
    pub fn into_bindings(self) -> Vec<RouteBinding> {
        self.bindings
    }

    /// Number of bound routes, not counting the reserved catalog route.
    pub fn route_count(&self) -> usize {
        self.bindings.len()
    }

    /// Check whether a `(method, base path)` key is occupied.
    pub fn is_bound(&self, method: HttpMethod, path: &str) -> bool {
        self.bound.contains(&(method, path.to_string()))
    }
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::new()
    }
}
