//! HTTP server and graceful shutdown.
//!
//! The server accepts connections, reads each request body in full, and hands
//! the request to [`Router::handle`]. On shutdown it:
//! 1. Stops `listener.accept()` immediately; no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::error::Error;
use crate::handler::{HttpResponse, status_only};
use crate::router::Router;

/// Largest request body read by default: 1 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// The HTTP server.
#[derive(Debug)]
pub struct Server {
    addr: SocketAddr,
    body_limit: usize,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use servitor::Server;
    /// let server = Server::bind("0.0.0.0:3000")?;
    /// # Ok::<(), servitor::Error>(())
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        Ok(Self { addr: addr.parse()?, body_limit: DEFAULT_BODY_LIMIT })
    }

    /// Caps request bodies at `bytes`. Larger bodies are answered with
    /// `413 Payload Too Large` before any endpoint sees them.
    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    pub fn addr(&self) -> SocketAddr { self.addr }

    /// Serves `router` until SIGTERM or Ctrl-C, then drains in-flight
    /// connections.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Serves `router` until `signal` resolves, then drains in-flight
    /// connections.
    pub async fn serve_with_shutdown<F>(self, router: Router, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.addr).await?;
        let router = Arc::new(router);
        let limit = self.body_limit;

        info!(addr = %self.addr, body_limit = limit, "servitor listening");

        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Shutdown first, so a pending signal wins over queued accepts.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { dispatch(&router, req, limit).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(%peer, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("servitor stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Buffers the body and routes. Every failure becomes a status code, so
/// hyper never sees an error.
async fn dispatch(router: &Router, req: hyper::Request<Incoming>, limit: usize) -> Result<HttpResponse, Infallible> {
    let (head, body) = req.into_parts();
    let body = match read_body(body, limit).await {
        Ok(bytes) => bytes,
        Err(status) => {
            debug!(path = %head.uri.path(), %status, "request body refused");
            return Ok(status_only(status));
        }
    };
    Ok(router.handle(http::Request::from_parts(head, body)).await)
}

/// Reads at most `limit` bytes. `413` past the limit, `400` when the
/// transport fails mid-body.
async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, StatusCode>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(StatusCode::PAYLOAD_TOO_LARGE),
        Err(e) => {
            debug!("cannot read request body: {e}");
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on SIGTERM or SIGINT (Ctrl-C). On Windows only Ctrl-C is
/// available. A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_rejects_bad_addresses() {
        assert!(matches!(Server::bind("localhost"), Err(Error::Addr(_))));
        assert_eq!(Server::bind("127.0.0.1:8080").unwrap().addr().port(), 8080);
    }

    #[tokio::test]
    async fn body_over_the_limit_is_refused() {
        use http_body_util::Full;

        let body = Full::new(Bytes::from_static(b"0123456789"));
        assert_eq!(read_body(body.clone(), 10).await, Ok(Bytes::from_static(b"0123456789")));
        assert_eq!(read_body(body, 9).await, Err(StatusCode::PAYLOAD_TOO_LARGE));
    }

    #[test]
    fn body_limit_is_configurable() {
        let server = Server::bind("127.0.0.1:0").unwrap();
        assert_eq!(server.body_limit, DEFAULT_BODY_LIMIT);
        assert_eq!(server.body_limit(64).body_limit, 64);
    }

    #[tokio::test]
    async fn stops_when_signalled() {
        let server = Server::bind("127.0.0.1:0").unwrap();
        server.serve_with_shutdown(Router::new(), async {}).await.unwrap();
    }
}
