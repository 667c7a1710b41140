//! # Error Handling
//!
//! This module defines the centralized error type for `nodesync`. It uses the
//! `thiserror` library to build one `Error` enum covering every failure mode
//! of the library, with descriptive messages and contextual fields.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Variants fall into two regimes:
//!   - definition-time errors raised while loading groups and nodes
//!     (`Redefinition`, `CompoundGroup`, `ReservedGroup`, `UnknownNode`,
//!     `UnknownGroup`), which config loading accumulates into
//!     `ConfigErrors`;
//!   - run-time errors raised while expanding ranges, walking the
//!     repository, or applying fixes (`RangeSyntax`, `UnknownExtension`,
//!     `UnsupportedFileType`, `Hook`, `Filesystem`).
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.

use thiserror::Error;

/// Main error type for nodesync operations
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration file could not be parsed.
    ///
    /// Includes the parsing issue and optionally a hint about how to fix it.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A group or node name was defined twice.
    #[error("Redefinition of {kind} '{name}'")]
    Redefinition { kind: &'static str, name: String },

    /// A compound group definition is invalid (node as member, cycle, ...).
    #[error("Invalid compound group '{group}': {message}")]
    CompoundGroup { group: String, message: String },

    /// One of the implicit groups `all`, `none` or `template` was used
    /// where it cannot be assigned.
    #[error("Reserved group name '{name}' cannot be used here")]
    ReservedGroup { name: String },

    /// A node name was referenced but never defined.
    #[error("Unknown node '{name}'")]
    UnknownNode { name: String },

    /// A group name was referenced but never defined.
    #[error("Unknown group '{name}'")]
    UnknownGroup { name: String },

    /// Loading the configuration produced one or more definition errors.
    ///
    /// Nothing from the configuration takes effect when this is returned.
    #[error("{} error(s) in configuration:{}", .0.len(), .0.iter().map(|e| format!("\n  {}", e)).collect::<String>())]
    ConfigErrors(Vec<Error>),

    /// A range expression or auto-numbering placeholder is malformed or
    /// out of bounds.
    #[error("Invalid range expression '{expr}': {message}")]
    RangeSyntax { expr: String, message: String },

    /// A repository entry carries a group extension that no configuration
    /// defines, and `require_extension` makes that fatal.
    #[error("Unknown group extension '{group}' on {path}")]
    UnknownExtension { path: String, group: String },

    /// A repository or destination entry is of a type that cannot be
    /// synchronized (sockets, for example).
    #[error("Unsupported file type: {path}")]
    UnsupportedFileType { path: String },

    /// A pre, post or template generator script failed.
    #[error("Hook script failed: {script} - {message}")]
    Hook { script: String, message: String },

    /// A filesystem operation on a source or destination path failed.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl Error {
    /// Shorthand for a `RangeSyntax` error.
    pub(crate) fn range(expr: &str, message: impl Into<String>) -> Self {
        Error::RangeSyntax {
            expr: expr.to_string(),
            message: message.into(),
        }
    }

    /// Shorthand for a `Filesystem` error that names the failing path.
    pub(crate) fn fs(path: &std::path::Path, action: &str, err: std::io::Error) -> Self {
        Error::Filesystem {
            message: format!("Failed to {} '{}': {}", action, path.display(), err),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
