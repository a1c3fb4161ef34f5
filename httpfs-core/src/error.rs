use std::path::PathBuf;

/// Errors produced while loading, validating or saving a [`Config`](crate::Config).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not a valid JSON config document.
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The config could not be written.
    #[error("failed to write config {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A sandbox directory name would escape the file root.
    #[error("invalid sandbox directory '{dir}': {reason}")]
    InvalidSandbox { dir: String, reason: &'static str },

    /// The listen address cannot be turned into a socket address.
    #[error("invalid listen address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
}

/// Reasons a URL path cannot be mapped into a sandbox.
///
/// Every variant is reported to clients as "no file specified".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// The path names the sandbox itself rather than a file in it.
    #[error("no file specified in '{0}'")]
    NoFile(String),

    /// Normalization walked above the sandbox directory.
    #[error("resource path '{0}' escapes the sandbox")]
    Escapes(String),

    /// The percent-decoded path is not valid UTF-8.
    #[error("resource path '{0}' is not valid UTF-8")]
    Encoding(String),
}
