//! Error types for Apiary
//!
//! This module defines all error types used throughout the Apiary host.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.

use thiserror::Error;

/// The primary error type for Apiary operations.
#[derive(Error, Debug)]
pub enum ApiaryError {
    /// Configuration-related errors (unreadable settings document, bad port, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Module contract violations (missing metadata, bad route template, etc.)
    #[error("Invalid module: {0}")]
    Module(String),

    /// A (method, path) pair was already bound by an earlier module.
    #[error("Route conflict: {method} {path} is already bound")]
    RouteConflict { method: String, path: String },

    /// Handler runtime failures while serving a request.
    #[error("Handler error: {0}")]
    Handler(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized `Result` type for Apiary operations.
pub type Result<T> = std::result::Result<T, ApiaryError>;
