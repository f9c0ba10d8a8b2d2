//! Apiary - plugin-based JSON API host

pub mod catalog;
pub mod config;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod modules;
pub mod server;

pub use config::Settings;
pub use error::{ApiaryError, Result};
