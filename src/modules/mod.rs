//! Route module system for Apiary
//!
//! This module provides the plugin layer that turns JSON files on disk into
//! live API routes. Each route module is a single JSON manifest declaring a
//! name, a path under `/api`, an HTTP method, catalog metadata, and the
//! handler that produces its payload. Dropping a file into the modules
//! directory is all it takes to publish a route; no Rust code changes.
//!
//! # Architecture
//!
//! - **types**: Core data structures (`ModuleManifest`, `HandlerSpec`, `HttpMethod`, `Module`)
//! - **loader**: Module discovery, loading, and manifest validation
//! - **registry**: Route binding with per-`(method, path)` conflict detection
//!
//! # Modules Directory Structure
//!
//! ```text
//! modules/
//! ├── ping.json
//! ├── echo.json
//! └── util/
//!     └── inspect.json
//! ```
//!
//! # Example module file
//!
//! ```json
//! {
//!   "name": "Ping",
//!   "desc": "Liveness probe",
//!   "path": "/ping",
//!   "method": "get",
//!   "author": "apiary",
//!   "category": "system",
//!   "handler": {
//!     "kind": "static",
//!     "body": { "message": "pong" }
//!   }
//! }
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use apiary::modules::{discover_modules, RouteRegistry};
//!
//! let report = discover_modules(Path::new("modules"));
//!
//! let mut registry = RouteRegistry::new();
//! for module in report.modules {
//!     if let Err(e) = registry.bind_module(module) {
//!         eprintln!("rejected: {}", e);
//!     }
//! }
//!
//! println!("Serving {} routes", registry.route_count());
//! ```

mod loader;
pub mod registry;
pub mod types;

pub use loader::{
    discover_modules, load_module_file, validate_manifest, DiscoveryReport, SkippedModule,
    MODULE_FILE_EXTENSION,
};
pub use registry::{RouteBinding, RouteRegistry, API_PREFIX, CATALOG_PATH};
pub use types::{HandlerSpec, HttpMethod, Module, ModuleManifest};
