//! Route catalog for Apiary
//!
//! Builds the payload served at `GET /api/info`: every bound route grouped
//! by its category, with the metadata a client needs to call it. The
//! catalog is assembled from the frozen registry, so it always matches
//! what is actually routable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::modules::RouteBinding;

/// The catalog payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Route groups in order of first appearance.
    pub categories: Vec<CatalogCategory>,
}

/// One category of routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogCategory {
    /// Category name from the manifests, or `uncategorized`.
    pub name: String,

    /// Routes in this category, in bind order.
    pub items: Vec<CatalogEntry>,
}

/// One route as advertised to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Display name of the route.
    pub name: String,

    /// Human-readable description.
    pub desc: String,

    /// Absolute path including the `/api` prefix and any query-string
    /// example the manifest carried.
    pub path: String,

    /// Author from the manifest, or `unknown`.
    pub author: String,

    /// Lowercase HTTP method.
    pub method: String,
}

/// Build the catalog from the bound routes.
///
/// Categories appear in the order a route first mentions them; within a
/// category, routes keep their bind order. Both follow discovery order, so
/// the catalog is stable across restarts.
pub fn build_catalog(bindings: &[RouteBinding]) -> Catalog {
    let mut categories: Vec<CatalogCategory> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for binding in bindings {
        let manifest = &binding.module.manifest;
        let entry = CatalogEntry {
            name: manifest.name.clone(),
            desc: manifest.desc.clone(),
            path: binding.display_path(),
            author: manifest.effective_author().to_string(),
            method: binding.method().as_str().to_string(),
        };

        let category = manifest.effective_category().to_string();
        let idx = *index.entry(category.clone()).or_insert_with(|| {
            categories.push(CatalogCategory {
                name: category,
                items: Vec::new(),
            });
            categories.len() - 1
        });
        categories[idx].items.push(entry);
    }

    Catalog { categories }
}
