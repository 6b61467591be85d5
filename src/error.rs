//! Error types for docfold
//!
//! All modules use `DocfoldResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for docfold operations
pub type DocfoldResult<T> = Result<T, DocfoldError>;

/// All errors that can occur in docfold
#[derive(Error, Debug)]
pub enum DocfoldError {
    // Version resolution errors
    #[error("Could not resolve {what}: {source}")]
    ResolutionFailed {
        what: String,
        #[source]
        source: Box<DocfoldError>,
    },

    #[error("Could not resolve {what}: offline and nothing cached")]
    NotCached { what: String },

    #[error("HTTP request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("HTTP request to {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("HTTP request to {url} timed out after {secs}s")]
    HttpTimeout { url: String, secs: u64 },

    #[error("Unexpected response from {url}: {reason}")]
    UnexpectedResponse { url: String, reason: String },

    // Naming errors
    #[error("Invalid {component} for artifact name: {reason}")]
    InvalidIdentifier { component: String, reason: String },

    // Cache errors
    #[error("Invalid cache key {key:?}: {reason}")]
    InvalidCacheKey { key: String, reason: String },

    #[error("Another docfold run holds the lock at {0}")]
    AlreadyRunning(PathBuf),

    // Pipeline errors
    #[error("Fetching documents failed: {reason}")]
    FetchFailed { reason: String },

    #[error("No markdown documents found under {0}")]
    NothingToMerge(PathBuf),

    #[error("{tool} failed: {stderr}")]
    RenderFailed { tool: String, stderr: String },

    #[error("Artifact already exists: {0}")]
    ArtifactExists(PathBuf),

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    #[error("Interrupted")]
    Interrupted,

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl DocfoldError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Whether the error came from talking to the remote version source
    pub fn is_remote(&self) -> bool {
        match self {
            Self::ResolutionFailed { source, .. } => source.is_remote(),
            Self::Http { .. }
            | Self::HttpStatus { .. }
            | Self::HttpTimeout { .. }
            | Self::UnexpectedResponse { .. } => true,
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ResolutionFailed { source, .. } => source.hint().or(Some(
                "Check network access to the GitHub API, or set GITHUB_TOKEN if rate limited",
            )),
            Self::NotCached { .. } => Some("Run once without --offline to populate the cache"),
            Self::HttpStatus { status: 403, .. } | Self::HttpStatus { status: 429, .. } => {
                Some("GitHub API rate limit reached. Set GITHUB_TOKEN or retry later")
            }
            Self::AlreadyRunning(_) => Some("Wait for the other run to finish"),
            Self::FetchFailed { .. } => Some("Check that git >= 2.27 is installed and the repository is reachable"),
            Self::RenderFailed { .. } => Some("Install pandoc and wkhtmltopdf, or set render.* in config"),
            Self::ArtifactExists(_) => Some("Use --overwrite redo or --overwrite skip"),
            Self::ConfigInvalid { .. } => Some("Run: docfold config init --force"),
            _ => None,
        }
    }
}
