//! Error types for the gateway crate.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use httpfs_core::{ConfigError, OperationKind, ResolveError};
use httpfs_executor::ExecutorError;

/// Challenge sent with every `401`.
const BASIC_CHALLENGE: &str = r#"Basic realm="httpfs""#;

/// Ways a request can fail. Every variant is terminal for its request.
///
/// Client-facing bodies never carry the underlying cause; that is logged
/// where the error is raised.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DispatchError {
    /// Missing or malformed basic-auth header, or an unknown API key.
    #[error("unrecognized api key")]
    Unauthorized,

    /// The URL path names no file or escapes the sandbox.
    #[error("no file specified")]
    InvalidResource(#[from] ResolveError),

    /// The method maps to no file operation.
    #[error("unsupported method {0}")]
    UnsupportedMethod(Method),

    /// The file operation itself failed.
    #[error("error {} file", .kind.action())]
    Operation {
        kind: OperationKind,
        #[source]
        source: ExecutorError,
    },
}

impl DispatchError {
    /// HTTP status for this failure.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidResource(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Operation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Sanitized message sent to the client.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::UnsupportedMethod(_) => "Unsupported method".to_owned(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), format!("{}\n", self.client_message())).into_response();
        if matches!(self, Self::Unauthorized) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(BASIC_CHALLENGE));
        }
        response
    }
}

/// Errors that stop the server from starting or serving.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ServerError {
    /// The configuration cannot be turned into a listener.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The TLS certificate or key could not be loaded.
    #[error("failed to load TLS certificate '{}' and key '{}': {source}", .cert.display(), .key.display())]
    Tls {
        cert: PathBuf,
        key: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Binding or accepting on the listen address failed.
    #[error("server on {addr} failed: {source}")]
    Serve {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}
