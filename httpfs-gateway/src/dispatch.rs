//! Request dispatcher and the router that feeds it.
//!
//! Every path and method lands in one fallback handler. Per request the
//! dispatcher authenticates, resolves the URL path inside the caller's
//! sandbox, maps the method to an operation and runs it. The first failure
//! ends the request; [`DispatchError`] turns it into a status and a sanitized
//! message while the concrete cause is logged here.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{request::Parts, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use futures_util::TryStreamExt;
use httpfs_core::{credentials::redact, CredentialTable, OperationKind, SandboxDir, SandboxRoot};
use httpfs_executor::{drain, ByteSource, FileBackend, Operation, Outcome};
use tokio_util::io::{ReaderStream, StreamReader};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::{self, BasicCredentials};
use crate::error::DispatchError;

/// Upper bound on a single request, body transfer included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Map an HTTP method to the file operation it selects.
#[must_use]
pub fn operation_kind(method: &Method) -> Option<OperationKind> {
    match *method {
        Method::GET => Some(OperationKind::Read),
        Method::POST => Some(OperationKind::AppendWrite),
        Method::PUT => Some(OperationKind::TruncateWrite),
        Method::DELETE => Some(OperationKind::Delete),
        _ => None,
    }
}

/// Authenticates and executes file requests for every configured tenant.
///
/// Holds only read-only state, so one instance is shared by all connections.
pub struct Dispatcher {
    file_root: PathBuf,
    credentials: CredentialTable,
    backend: Arc<dyn FileBackend>,
}

impl Dispatcher {
    /// Create a dispatcher serving sandboxes below `file_root`.
    #[must_use]
    pub fn new(
        file_root: impl Into<PathBuf>,
        credentials: CredentialTable,
        backend: Arc<dyn FileBackend>,
    ) -> Self {
        Self {
            file_root: file_root.into(),
            credentials,
            backend,
        }
    }

    /// Directory holding every sandbox.
    #[must_use]
    pub fn file_root(&self) -> &Path {
        &self.file_root
    }

    /// Handle one request end to end.
    ///
    /// The request body is drained before returning on every path, so the
    /// connection can carry the next request.
    pub async fn dispatch(&self, request: Request) -> Response {
        let (parts, body) = request.into_parts();
        let mut body = StreamReader::new(body.into_data_stream().map_err(std::io::Error::other));

        let result = self.execute(&parts, &mut body).await;

        if let Err(e) = drain(&mut body).await {
            tracing::debug!(error = %e, "request body ended early");
        }
        result.unwrap_or_else(IntoResponse::into_response)
    }

    async fn execute(&self, parts: &Parts, body: ByteSource<'_>) -> Result<Response, DispatchError> {
        let (credentials, sandbox) = self.authenticate(&parts.headers)?;
        let key = redact(&credentials.api_key);

        let path = SandboxRoot::new(&self.file_root, sandbox)
            .resolve(parts.uri.path())
            .map_err(|e| {
                tracing::warn!(username = %credentials.username, %key, error = %e, "no file specified");
                e
            })?;

        let Some(kind) = operation_kind(&parts.method) else {
            tracing::warn!(username = %credentials.username, %key, "unsupported method");
            return Err(DispatchError::UnsupportedMethod(parts.method.clone()));
        };

        tracing::info!(
            username = %credentials.username,
            %key,
            path = %path.display(),
            %kind,
            "dispatching file operation"
        );

        let operation = match kind {
            OperationKind::Read => Operation::Read,
            OperationKind::AppendWrite => Operation::AppendWrite(body),
            OperationKind::TruncateWrite => Operation::TruncateWrite(body),
            OperationKind::Delete => Operation::Delete,
        };

        match self.backend.execute(&path, operation).await {
            Ok(outcome) => Ok(respond(outcome)),
            Err(source) => {
                tracing::error!(
                    method = %parts.method,
                    path = %path.display(),
                    %key,
                    error = %source,
                    "file operation failed"
                );
                Err(DispatchError::Operation { kind, source })
            }
        }
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<(BasicCredentials, &SandboxDir), DispatchError> {
        let Some(credentials) = auth::basic_credentials(headers) else {
            tracing::warn!("request without basic credentials");
            return Err(DispatchError::Unauthorized);
        };
        match self.credentials.lookup(&credentials.api_key) {
            Some(sandbox) => Ok((credentials, sandbox)),
            None => {
                tracing::warn!(
                    username = %credentials.username,
                    key = %redact(&credentials.api_key),
                    "request with unrecognized api key"
                );
                Err(DispatchError::Unauthorized)
            }
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("file_root", &self.file_root)
            .field("keys", &self.credentials.len())
            .finish_non_exhaustive()
    }
}

fn respond(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Contents(reader) => {
            (StatusCode::OK, Body::from_stream(ReaderStream::new(reader))).into_response()
        }
        Outcome::Written(bytes) => {
            tracing::debug!(bytes, "body written");
            StatusCode::OK.into_response()
        }
        Outcome::Deleted => StatusCode::OK.into_response(),
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Build the application router around a dispatcher.
///
/// `request_timeout` bounds each request up to its response head; use
/// [`REQUEST_TIMEOUT`] unless a caller needs a different bound.
pub fn create_router(dispatcher: Arc<Dispatcher>, request_timeout: Duration) -> Router {
    Router::new()
        .fallback(handle_request)
        .with_state(dispatcher)
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout))
        .layer(TraceLayer::new_for_http())
}

async fn handle_request(State(dispatcher): State<Arc<Dispatcher>>, request: Request) -> Response {
    let span = tracing::info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %request.method(),
        path = %request.uri().path(),
    );
    dispatcher.dispatch(request).instrument(span).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use httpfs_core::ApiKey;
    use httpfs_executor::LocalFsBackend;
    use tower::ServiceExt;

    fn tempdir() -> tempfile::TempDir {
        match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => panic!("tempdir failed: {e}"),
        }
    }

    fn test_router(root: &Path) -> Router {
        let sandbox = match SandboxDir::new("tenantA") {
            Ok(s) => s,
            Err(e) => panic!("invalid sandbox: {e}"),
        };
        let credentials: CredentialTable = [(ApiKey::new("K1"), sandbox)].into_iter().collect();
        let dispatcher = Dispatcher::new(root, credentials, Arc::new(LocalFsBackend::new()));
        create_router(Arc::new(dispatcher), REQUEST_TIMEOUT)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        key: Option<&str>,
        body: &'static str,
    ) -> (StatusCode, Bytes) {
        let mut builder = axum::http::Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header(
                axum::http::header::AUTHORIZATION,
                format!("Basic {}", STANDARD.encode(format!("tester:{key}"))),
            );
        }
        let req = match builder.body(Body::from(body)) {
            Ok(r) => r,
            Err(e) => panic!("failed to build request: {e}"),
        };
        let resp = match app.clone().oneshot(req).await {
            Ok(r) => r,
            Err(e) => panic!("handler error: {e}"),
        };
        let status = resp.status();
        let bytes = match axum::body::to_bytes(resp.into_body(), usize::MAX).await {
            Ok(b) => b,
            Err(e) => panic!("failed to read body: {e}"),
        };
        (status, bytes)
    }

    #[test]
    fn operation_kind_maps_the_four_methods() {
        assert_eq!(operation_kind(&Method::GET), Some(OperationKind::Read));
        assert_eq!(operation_kind(&Method::POST), Some(OperationKind::AppendWrite));
        assert_eq!(operation_kind(&Method::PUT), Some(OperationKind::TruncateWrite));
        assert_eq!(operation_kind(&Method::DELETE), Some(OperationKind::Delete));
        assert_eq!(operation_kind(&Method::PATCH), None);
        assert_eq!(operation_kind(&Method::HEAD), None);
    }

    #[tokio::test]
    async fn put_then_get_returns_body_and_unknown_key_is_rejected() {
        let dir = tempdir();
        let app = test_router(dir.path());

        let (status, _) = send(&app, Method::PUT, "/notes.txt", Some("K1"), "hello").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, Method::GET, "/notes.txt", Some("K1"), "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"hello");
        assert!(dir.path().join("tenantA/notes.txt").is_file(), "file must live in the sandbox");

        let (status, body) = send(&app, Method::GET, "/notes.txt", Some("K2"), "").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(&body[..], b"unrecognized api key\n");
    }

    #[tokio::test]
    async fn bad_credentials_are_rejected_before_any_side_effect() {
        let dir = tempdir();
        let app = test_router(dir.path());

        for method in [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
            for key in [None, Some("K2"), Some("")] {
                let (status, _) = send(&app, method.clone(), "/notes.txt", key, "data").await;
                assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} with {key:?}");
            }
        }
        assert!(!dir.path().join("tenantA").exists(), "auth failures must not touch the filesystem");
    }

    #[tokio::test]
    async fn root_path_is_bad_request_for_every_method() {
        let dir = tempdir();
        let app = test_router(dir.path());

        for method in [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
            let (status, body) = send(&app, method.clone(), "/", Some("K1"), "").await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{method} on /");
            assert_eq!(&body[..], b"no file specified\n");
        }
    }

    #[tokio::test]
    async fn unsupported_method_is_not_allowed() {
        let dir = tempdir();
        let app = test_router(dir.path());

        let (status, _) = send(&app, Method::PATCH, "/notes.txt", Some("K1"), "x").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert!(!dir.path().join("tenantA/notes.txt").exists());
    }

    #[tokio::test]
    async fn post_appends_in_request_order() {
        let dir = tempdir();
        let app = test_router(dir.path());

        for chunk in ["a", "b"] {
            let (status, body) = send(&app, Method::POST, "/dir/log.txt", Some("K1"), chunk).await;
            assert_eq!(status, StatusCode::OK);
            assert!(body.is_empty(), "write responses carry no body");
        }
        let (_, body) = send(&app, Method::GET, "/dir/log.txt", Some("K1"), "").await;
        assert_eq!(&body[..], b"ab");

        let (status, _) = send(&app, Method::PUT, "/dir/log.txt", Some("K1"), "c").await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, Method::GET, "/dir/log.txt", Some("K1"), "").await;
        assert_eq!(&body[..], b"c", "PUT replaces earlier content");
    }

    #[tokio::test]
    async fn repeated_delete_fails_without_leaking_details() {
        let dir = tempdir();
        let app = test_router(dir.path());

        send(&app, Method::PUT, "/gone.txt", Some("K1"), "x").await;
        let (status, _) = send(&app, Method::DELETE, "/gone.txt", Some("K1"), "").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, Method::DELETE, "/gone.txt", Some("K1"), "").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(&body[..], b"error deleting file\n");

        let (status, body) = send(&app, Method::GET, "/gone.txt", Some("K1"), "").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(&body[..], b"error reading file\n");
    }

    #[tokio::test]
    async fn stalled_upload_times_out_with_request_timeout() {
        let dir = tempdir();
        let sandbox = match SandboxDir::new("tenantA") {
            Ok(s) => s,
            Err(e) => panic!("invalid sandbox: {e}"),
        };
        let credentials: CredentialTable = [(ApiKey::new("K1"), sandbox)].into_iter().collect();
        let dispatcher = Dispatcher::new(dir.path(), credentials, Arc::new(LocalFsBackend::new()));
        let app = create_router(Arc::new(dispatcher), Duration::from_secs(1));

        let never_ends = futures_util::stream::pending::<Result<Bytes, std::io::Error>>();
        let req = match axum::http::Request::builder()
            .method(Method::PUT)
            .uri("/slow.txt")
            .header(
                axum::http::header::AUTHORIZATION,
                format!("Basic {}", STANDARD.encode("tester:K1")),
            )
            .body(Body::from_stream(never_ends))
        {
            Ok(r) => r,
            Err(e) => panic!("failed to build request: {e}"),
        };
        match app.oneshot(req).await {
            Ok(resp) => assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT),
            Err(e) => panic!("handler error: {e}"),
        }
    }

    #[tokio::test]
    async fn traversal_attempts_never_leave_the_sandbox() {
        let dir = tempdir();
        let app = test_router(dir.path());

        for uri in ["/../tenantB/x.txt", "/a/../../tenantB/x.txt", "/%2e%2e/tenantB/x.txt"] {
            let (status, _) = send(&app, Method::PUT, uri, Some("K1"), "pwned").await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        }
        assert!(!dir.path().join("tenantB").exists(), "nothing may be written outside tenantA");

        let (status, _) = send(&app, Method::PUT, "/a/../inside.txt", Some("K1"), "ok").await;
        assert_eq!(status, StatusCode::OK);
        assert!(dir.path().join("tenantA/inside.txt").is_file());
    }
}
