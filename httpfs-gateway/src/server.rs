//! Server lifecycle: bind, serve plaintext or TLS, drain on shutdown.
//!
//! A [`FileServer`] moves through `Configured → Listening → Draining →
//! Stopped`. [`FileServer::serve`] owns the listener loop; a cloned
//! [`ServerHandle`] is the control path that asks it to stop.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum_server::{tls_rustls::RustlsConfig, Handle};
use httpfs_core::Config;
use httpfs_executor::FileBackend;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use hyper_util::server::conn::auto;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::dispatch::{create_router, Dispatcher, REQUEST_TIMEOUT};
use crate::error::ServerError;
use crate::write_timeout::{WriteTimeoutAcceptor, WRITE_STALL_TIMEOUT};

/// Time a client gets to send complete request headers. Also bounds how long
/// an idle keep-alive connection is held open.
pub const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// How long in-flight requests may run after shutdown is requested.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(60);

/// Per-connection time limits applied by a [`FileServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Whole request up to the response head, body upload included.
    pub request: Duration,
    /// Request headers, and idle keep-alive connections awaiting the next one.
    pub header_read: Duration,
    /// A response write that makes no progress.
    pub write_stall: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request: REQUEST_TIMEOUT,
            header_read: HEADER_READ_TIMEOUT,
            write_stall: WRITE_STALL_TIMEOUT,
        }
    }
}

/// Lifecycle stage of a [`FileServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Configured,
    Listening,
    Draining,
    Stopped,
}

/// Control path for a running [`FileServer`].
#[derive(Debug, Clone)]
pub struct ServerHandle {
    inner: Handle,
    state: Arc<watch::Sender<ServerState>>,
}

impl ServerHandle {
    fn new() -> Self {
        let (state, _) = watch::channel(ServerState::Configured);
        Self {
            inner: Handle::new(),
            state: Arc::new(state),
        }
    }

    /// Current lifecycle stage.
    #[must_use]
    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Wait until the listener is bound and return its address.
    ///
    /// Returns `None` if the server stopped before binding.
    pub async fn listening(&self) -> Option<SocketAddr> {
        let mut state = self.state.subscribe();
        let addr = tokio::select! {
            addr = self.inner.listening() => addr?,
            _ = state.wait_for(|s| *s == ServerState::Stopped) => return None,
        };
        if state.wait_for(|s| *s != ServerState::Configured).await.is_err() {
            warn!("server state channel closed while binding");
        }
        Some(addr)
    }

    /// Stop accepting connections and give in-flight requests `grace` to
    /// finish before the remaining connections are closed.
    pub fn shutdown(&self, grace: Duration) {
        let started = self.advance(|state| {
            matches!(state, ServerState::Configured | ServerState::Listening)
                .then_some(ServerState::Draining)
        });
        if started {
            info!(
                grace_secs = grace.as_secs(),
                connections = self.inner.connection_count(),
                "attempting to shut down server"
            );
        }
        self.inner.graceful_shutdown(Some(grace));
    }

    /// Wait until the server has stopped.
    pub async fn stopped(&self) {
        let mut state = self.state.subscribe();
        if state.wait_for(|s| *s == ServerState::Stopped).await.is_err() {
            warn!("server state channel closed before stop");
        }
    }

    /// Apply a state transition if `next` yields one. Returns whether it did.
    fn advance(&self, next: impl FnOnce(ServerState) -> Option<ServerState>) -> bool {
        self.state.send_if_modified(|state| match next(*state) {
            Some(new) => {
                *state = new;
                true
            }
            None => false,
        })
    }
}

/// The file server: a dispatcher behind a plaintext or TLS listener.
#[derive(Debug)]
pub struct FileServer {
    addr: SocketAddr,
    tls: Option<(PathBuf, PathBuf)>,
    dispatcher: Arc<Dispatcher>,
    timeouts: Timeouts,
    handle: ServerHandle,
}

impl FileServer {
    /// Build a server from configuration. Nothing is bound yet.
    ///
    /// # Errors
    /// Returns [`ServerError::Config`] if the listen address is invalid.
    pub fn new(config: &Config, backend: Arc<dyn FileBackend>) -> Result<Self, ServerError> {
        let addr = config.listen_addr()?;
        let credentials = config.credentials();
        if credentials.is_empty() {
            warn!("no api keys configured, every request will be rejected");
        }
        let dispatcher = Dispatcher::new(config.file_root.clone(), credentials, backend);

        Ok(Self {
            addr,
            tls: config
                .tls_paths()
                .map(|(cert, key)| (cert.to_owned(), key.to_owned())),
            dispatcher: Arc::new(dispatcher),
            timeouts: Timeouts::default(),
            handle: ServerHandle::new(),
        })
    }

    /// Replace the default 30-second connection time limits.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Configured listen address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Handle for shutting the server down from another task.
    #[must_use]
    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    /// Bind and serve until shutdown completes.
    ///
    /// Uses TLS when both certificate and key paths are configured, plaintext
    /// otherwise.
    ///
    /// # Errors
    /// Returns [`ServerError::Tls`] if the certificate or key cannot be
    /// loaded and [`ServerError::Serve`] if binding or accepting fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let result = self.run().await;
        self.handle.state.send_replace(ServerState::Stopped);
        match &result {
            Ok(()) => info!("server stopped"),
            Err(e) => error!(error = %e, "error running server"),
        }
        result
    }

    async fn run(&self) -> Result<(), ServerError> {
        let app = create_router(Arc::clone(&self.dispatcher), self.timeouts.request)
            .into_make_service();
        let stall = WriteTimeoutAcceptor::new(self.timeouts.write_stall);
        let serve_err = |source: std::io::Error| ServerError::Serve {
            addr: self.addr,
            source,
        };

        match &self.tls {
            Some((cert, key)) => {
                info!(cert = %cert.display(), key = %key.display(), "using TLS certificate");
                let tls = RustlsConfig::from_pem_file(cert, key)
                    .await
                    .map_err(|source| ServerError::Tls {
                        cert: cert.clone(),
                        key: key.clone(),
                        source,
                    })?;
                let mut server = axum_server::bind_rustls(self.addr, tls)
                    .map(|tls| tls.acceptor(stall))
                    .handle(self.handle.inner.clone());
                configure_http(server.http_builder(), self.timeouts.header_read);
                self.drive("https", server.serve(app)).await.map_err(serve_err)
            }
            None => {
                warn!("no TLS certificate and/or key provided, serving plaintext");
                let mut server = axum_server::bind(self.addr)
                    .acceptor(stall)
                    .handle(self.handle.inner.clone());
                configure_http(server.http_builder(), self.timeouts.header_read);
                self.drive("http", server.serve(app)).await.map_err(serve_err)
            }
        }
    }

    /// Run the accept loop, marking the server as listening once bound.
    async fn drive(
        &self,
        scheme: &'static str,
        serving: impl Future<Output = std::io::Result<()>>,
    ) -> std::io::Result<()> {
        let mark_listening = async {
            if let Some(addr) = self.handle.inner.listening().await {
                self.handle.advance(|state| {
                    (state == ServerState::Configured).then_some(ServerState::Listening)
                });
                info!(%addr, scheme, "listening");
            }
            std::future::pending::<()>().await;
        };

        tokio::select! {
            result = serving => result,
            () = mark_listening => Ok(()),
        }
    }
}

/// HTTP/1 only, so the header-read timer also covers connections that never
/// send a byte. Version sniffing would otherwise wait on them unbounded.
fn configure_http(builder: &mut auto::Builder<TokioExecutor>, header_read: Duration) {
    *builder = auto::Builder::new(TokioExecutor::new()).http1_only();
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(header_read);
}

/// Resolve when the process receives an interrupt or terminate signal.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for interrupt signal");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for terminate signal");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => info!("received interrupt signal"),
        () = terminate => info!("received terminate signal"),
    }
}
