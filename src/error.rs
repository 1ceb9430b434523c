//! Error handling module for orchestr
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Loading problems, fatal run errors and the top-level application error each
//! get their own enum so callers can match on the concern they care about.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating, reading or parsing a script document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// Script file not found
    #[error("Could not find the script file at {}", path.display())]
    NotFound { path: PathBuf },

    /// IO error reading or writing the script
    #[error("Failed to access script {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },

    /// The document is not valid JSON or does not have the script shape
    #[error("Could not parse script '{name}': {reason}")]
    InvalidFormat { name: String, reason: String },

    /// Required script arguments were not supplied by the caller
    #[error("Missing required arguments : {}", ids.join(", "))]
    MissingArguments { ids: Vec<String> },

    /// The scripts directory does not exist
    #[error("Could not find the {} directory. Make sure it exists before launching scripts.", path.display())]
    MissingScriptsDir { path: PathBuf },

    /// Refusing to overwrite an existing script
    #[error("A script already exists at {}", path.display())]
    AlreadyExists { path: PathBuf },
}

/// Fatal conditions that abort a run.
///
/// Per-action failures are not errors; they surface as unsuccessful
/// [`ActionOutcome`](crate::actions::ActionOutcome) values instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A step or branch target names an action that is not declared
    #[error("Action with ID \"{id}\" not found at step with index {step}")]
    MissingAction { step: usize, id: String },

    /// A declared action uses a kind nobody registered
    #[error("Action \"{action}\" has unknown type \"{kind}\"")]
    UnknownKind { action: String, kind: String },
}

/// Main error type for orchestr
#[derive(Error, Debug)]
pub enum OrchestrError {
    /// IO errors (file operations, terminal, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Script loading errors
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// Fatal run errors
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Configuration errors (settings, CLI values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General errors (catch-all for edge cases)
    #[error("{0}")]
    General(String),
}

/// Result type alias for orchestr operations
pub type Result<T> = std::result::Result<T, OrchestrError>;

impl OrchestrError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a general error
    pub fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }
}
