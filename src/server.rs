//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()` — no new connections are made.
//! 2. Waiting up to the configured grace period for in-flight connections.
//! 3. Aborting whatever is still running, then returning from
//!    [`Server::serve`] so `main` exits cleanly.
//!
//! Keep the pod's grace period longer than the server's, so the abort path
//! here runs before SIGKILL does.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::status::Status;

// ── ServeError ────────────────────────────────────────────────────────────────

/// The error type of [`Server::serve`].
///
/// Application-level failures never show up here — they are [`AppError`]s
/// (see [`crate::AppError`]) rendered into responses long before this layer.
/// This type surfaces infrastructure failures: binding to a port or
/// accepting a connection.
#[derive(Debug)]
pub struct ServeError(std::io::Error);

impl fmt::Display for ServeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "io: {}", self.0)
    }
}

impl std::error::Error for ServeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<std::io::Error> for ServeError {
    fn from(e: std::io::Error) -> Self {
        Self(e)
    }
}

// ── Server ────────────────────────────────────────────────────────────────────

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
    grace: Duration,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called. The default shutdown grace period is 30 s.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string — the address comes
    /// from configuration, and a bad one should stop the process at startup.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use taskd::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr, grace: Duration::from_secs(30) }
    }

    /// How long shutdown waits for in-flight connections before aborting.
    pub fn grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns after a graceful shutdown: SIGTERM or Ctrl-C, followed by
    /// in-flight requests completing (or the grace period elapsing).
    pub async fn serve(self, router: Router) -> Result<(), ServeError> {
        let listener = TcpListener::bind(self.addr).await?;

        // Arc so the read-only routing table is shared across concurrent
        // connection tasks without copying it.
        let router = Arc::new(router);

        info!(addr = %self.addr, "taskd listening");

        // JoinSet tracks every spawned connection task so shutdown can wait
        // for them all.
        let mut tasks = tokio::task::JoinSet::new();

        // Pin the shutdown future so the loop can poll it repeatedly.
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // `biased` makes select! check arms top-to-bottom. Shutdown
                // is checked first so a SIGTERM stops accepting immediately,
                // even with connections queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    // TokioIo adapts tokio's AsyncRead/AsyncWrite to the
                    // hyper IO traits.
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // `service_fn` turns a plain async function into a
                        // hyper `Service`, called once per request on the
                        // connection.
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { dispatch(router, req).await }
                        });

                        // `auto::Builder` handles both HTTP/1.1 and HTTP/2 —
                        // whatever the client negotiates.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Bounded drain: in-flight connections get the grace period, then
        // whatever is left is aborted.
        let drained = tokio::time::timeout(self.grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(remaining = tasks.len(), "grace period elapsed, aborting connections");
            tasks.shutdown().await;
        }

        info!("taskd stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Framing glue between hyper and the router: read the body, run the
/// pipeline, convert back.
///
/// The error type is [`Infallible`](std::convert::Infallible) — all failures
/// are handled inside the router (404, 500, …) so hyper never sees an error.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            // The client went away or sent garbage mid-body; nothing routed
            // yet, so answer without involving the pipeline.
            warn!("failed to read request body: {e}");
            return Ok(Response::status(Status::BadRequest).into_http());
        }
    };

    let response = router.serve(Request::new(parts, body)).await;
    Ok(response.into_http())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** (sent by `kubectl` and the
/// Kubernetes control plane) and **SIGINT** (Ctrl-C, for local dev).
/// On Windows only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    // `pending()` never resolves — on non-Unix platforms the SIGTERM arm is
    // effectively disabled.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
