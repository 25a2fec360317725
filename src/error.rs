//! Error types for cms-mcp.
//!
//! Transport and protocol failures have their own representations inside
//! [`crate::mcp`]; the types here cover configuration loading and the
//! collaborator stores that resources and tools read from. Store errors
//! keep the underlying cause attached so the original message can be
//! surfaced in a JSON-RPC error without leaking a backtrace.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors produced by the collaborator stores backing resources and tools.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A queried row-store relation does not exist.
    #[error("unknown table: {table}")]
    UnknownTable {
        /// The relation that was requested.
        table: String,
    },

    /// A row-store query could not be executed.
    #[error("query failed: {message}")]
    QueryFailed {
        /// Description of the failure.
        message: String,
    },

    /// A file-store path does not exist.
    #[error("file not found: {path}")]
    FileNotFound {
        /// The path that was requested.
        path: String,
    },

    /// A file-store read failed.
    #[error("failed to read file: {path}")]
    FileRead {
        /// The path that was being read.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// An environment/config key is not set.
    #[error("environment key not set: {key}")]
    MissingKey {
        /// The key that was requested.
        key: String,
    },
}
