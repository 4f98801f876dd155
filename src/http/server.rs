//! Virtual host server.
//!
//! # Responsibilities
//! - Collect virtual hosts (`register`, `mount`) until start
//! - Bind one listener for every host and run the accept loop in the background
//! - Dispatch requests on the Host header to mounted directories
//! - Render directory listings; hand files to `ServeDir`
//! - Stop idempotently, aborting the accept loop if it does not exit in time
//!
//! # Design Decisions
//! - `start` waits on an explicit readiness signal from the accept task
//! - `start` and `stop` are serialized: a `stop` issued while a `start` is in
//!   flight waits for it and then stops what it started
//! - A failed start leaves nothing running
//! - The host table is frozen at start; later registrations are refused
//! - `stop` never fails; problems are logged

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    Router,
};
use percent_encoding::percent_decode_str;
use thiserror::Error;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tower::ServiceExt;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::listing;
use crate::http::vhost::VhostMap;
use crate::lifecycle::Shutdown;
use crate::net::listener::{self, ListenerError};
use crate::routing::matcher::request_host;
use crate::routing::VhostRouter;

/// Why the server could not start. Nothing is left running when this is returned.
#[derive(Debug, Error)]
pub enum ServerStartError {
    #[error("server is already running on {0}")]
    AlreadyRunning(SocketAddr),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("accept loop exited before the listener was ready")]
    NotReady,
}

struct RunningServer {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

/// A single HTTP listener multiplexing many virtual hosts.
pub struct VirtualHostServer {
    config: ServerConfig,
    vhosts: Mutex<VhostMap>,
    /// Held for the whole of `start` and `stop`.
    running: AsyncMutex<Option<RunningServer>>,
    local_addr: Mutex<Option<SocketAddr>>,
    started: AtomicBool,
    cleaning_up: AtomicBool,
}

impl VirtualHostServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            vhosts: Mutex::new(VhostMap::new()),
            running: AsyncMutex::new(None),
            local_addr: Mutex::new(None),
            started: AtomicBool::new(false),
            cleaning_up: AtomicBool::new(false),
        }
    }

    /// Declare a host, optionally with a root served at `/`. The first root
    /// registered for a host wins.
    pub fn register(&self, hostname: &str, repo_root: Option<PathBuf>) -> bool {
        if self.refuse_changes(hostname) {
            return false;
        }
        self.lock_vhosts().register(hostname, repo_root)
    }

    /// Serve `source_path` at `url_path` on `hostname`. Sources that are not
    /// directories are dropped with a warning.
    pub fn mount(&self, hostname: &str, url_path: &str, source_path: impl Into<PathBuf>) -> bool {
        if self.refuse_changes(hostname) {
            return false;
        }
        self.lock_vhosts().mount(hostname, url_path, source_path)
    }

    pub fn hostnames(&self) -> Vec<String> {
        self.lock_vhosts().hostnames()
    }

    /// Snapshot of the current host map.
    pub fn vhosts(&self) -> VhostMap {
        self.lock_vhosts().clone()
    }

    /// Address the listener is bound to, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.lock_local_addr()
    }

    pub fn is_running(&self) -> bool {
        self.local_addr().is_some()
    }

    /// Bind and start serving.
    ///
    /// Returns `Ok(None)` without binding anything when no host is registered.
    /// Returns once the listener is bound.
    pub async fn start(&self) -> Result<Option<SocketAddr>, ServerStartError> {
        let mut running = self.running.lock().await;
        if let Some(server) = running.as_ref() {
            return Err(ServerStartError::AlreadyRunning(server.local_addr));
        }

        let vhosts = self.vhosts();
        if vhosts.is_empty() {
            tracing::info!("No virtual hosts registered; not binding a listener");
            return Ok(None);
        }

        self.started.store(true, Ordering::SeqCst);
        let router = Arc::new(VhostRouter::from_vhosts(&vhosts));
        let app = build_app(router, &self.config);

        let shutdown = Shutdown::new();
        let stopped = shutdown.wait();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<SocketAddr, ListenerError>>();
        let bind_address = self.config.bind_address.clone();

        let handle = tokio::spawn(async move {
            let (tcp, addr) = match listener::bind(&bind_address).await {
                Ok(bound) => bound,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            if ready_tx.send(Ok(addr)).is_err() {
                return;
            }

            match axum::serve(tcp, app).with_graceful_shutdown(stopped).await {
                Ok(()) => tracing::info!(address = %addr, "Accept loop finished"),
                Err(e) => tracing::error!(address = %addr, error = %e, "Accept loop failed"),
            }
        });

        let failure = match ready_rx.await {
            Ok(Ok(local_addr)) => {
                tracing::info!(
                    address = %local_addr,
                    hosts = vhosts.len(),
                    "Virtual host server started"
                );
                *running = Some(RunningServer {
                    local_addr,
                    shutdown,
                    handle,
                });
                *self.lock_local_addr() = Some(local_addr);
                return Ok(Some(local_addr));
            }
            Ok(Err(e)) => ServerStartError::Listener(e),
            Err(_) => ServerStartError::NotReady,
        };

        handle.abort();
        let _ = handle.await;
        self.started.store(false, Ordering::SeqCst);
        tracing::error!(error = %failure, "Virtual host server failed to start");
        Err(failure)
    }

    /// Stop serving. Safe to call at any time and any number of times; a
    /// call before `start` does nothing. A call racing an in-flight `start`
    /// waits for it to finish and then stops the server it started.
    pub async fn stop(&self) {
        if self.cleaning_up.swap(true, Ordering::SeqCst) {
            tracing::debug!("Stop already in progress");
            return;
        }

        let mut guard = self.running.lock().await;
        *self.lock_local_addr() = None;
        match guard.take() {
            Some(RunningServer {
                local_addr,
                shutdown,
                mut handle,
            }) => {
                tracing::info!(address = %local_addr, "Stopping virtual host server");
                shutdown.trigger();

                let grace = Duration::from_secs(self.config.shutdown_timeout_secs);
                match tokio::time::timeout(grace, &mut handle).await {
                    Ok(Ok(())) => tracing::info!(address = %local_addr, "Virtual host server stopped"),
                    Ok(Err(e)) => tracing::warn!(error = %e, "Accept loop ended abnormally"),
                    Err(_) => {
                        tracing::warn!(
                            timeout_secs = self.config.shutdown_timeout_secs,
                            "Accept loop did not exit in time; aborting"
                        );
                        handle.abort();
                    }
                }
                self.lock_vhosts().clear();
            }
            None => tracing::debug!("Virtual host server not running; nothing to stop"),
        }

        self.started.store(false, Ordering::SeqCst);
        self.cleaning_up.store(false, Ordering::SeqCst);
    }

    fn refuse_changes(&self, hostname: &str) -> bool {
        let started = self.started.load(Ordering::SeqCst);
        if started {
            tracing::warn!(hostname = %hostname, "Server already started; ignoring virtual host change");
        }
        started
    }

    fn lock_vhosts(&self) -> MutexGuard<'_, VhostMap> {
        self.vhosts.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_local_addr(&self) -> MutexGuard<'_, Option<SocketAddr>> {
        self.local_addr.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
fn build_app(router: Arc<VhostRouter>, config: &ServerConfig) -> Router {
    Router::new()
        .fallback(vhost_handler)
        .with_state(router)
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Resolve the request against its virtual host and serve the first layer
/// that holds the target.
async fn vhost_handler(State(router): State<Arc<VhostRouter>>, request: Request<Body>) -> Response {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response();
    }

    let Some(host) = request_host(&request) else {
        return (StatusCode::BAD_REQUEST, "Missing Host header").into_response();
    };

    let raw_path = request.uri().path().to_string();
    let Ok(decoded) = percent_decode_str(&raw_path).decode_utf8() else {
        return (StatusCode::BAD_REQUEST, "Invalid path encoding").into_response();
    };
    if Path::new(decoded.as_ref()).components().any(|c| c == Component::ParentDir) {
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }
    if decoded.split('/').any(|segment| listing::HIDDEN.contains(&segment)) {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    }

    let Some(candidates) = router.candidates(&host, &raw_path) else {
        tracing::debug!(host = %host, path = %raw_path, "Unknown virtual host");
        return (StatusCode::NOT_FOUND, "Unknown virtual host").into_response();
    };

    for (layer, rest) in candidates {
        let Ok(relative) = percent_decode_str(rest).decode_utf8() else {
            return (StatusCode::BAD_REQUEST, "Invalid path encoding").into_response();
        };
        let target = layer.source.join(relative.trim_start_matches('/'));
        let Ok(meta) = tokio::fs::metadata(&target).await else {
            continue;
        };

        if meta.is_dir() {
            if !raw_path.ends_with('/') {
                let location = match request.uri().query() {
                    Some(q) => format!("{raw_path}/?{q}"),
                    None => format!("{raw_path}/"),
                };
                return Redirect::permanent(&location).into_response();
            }
            return match listing::render(&raw_path, &target).await {
                Ok(html) => Html(html).into_response(),
                Err(e) => {
                    tracing::error!(path = %target.display(), error = %e, "Failed to list directory");
                    (StatusCode::INTERNAL_SERVER_ERROR, "Failed to list directory").into_response()
                }
            };
        }

        return serve_file(&layer.source, rest, request).await;
    }

    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// Hand the request to `ServeDir` rooted at `source`, with the path rewritten
/// to `rest` (still percent-encoded).
async fn serve_file(source: &Path, rest: &str, request: Request<Body>) -> Response {
    let (mut parts, body) = request.into_parts();
    parts.uri = match Uri::builder().path_and_query(rest).build() {
        Ok(uri) => uri,
        Err(_) => return (StatusCode::BAD_REQUEST, "Invalid path").into_response(),
    };

    match ServeDir::new(source).oneshot(Request::from_parts(parts, body)).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
