//! Main proxy server implementation
//!
//! Wires the disposition engine into an axum router, serves it, and drains
//! in-flight requests for a bounded time on shutdown.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::Response;
use axum::middleware;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::core::DispositionEngine;
use crate::error::{ProxyError, ProxyResult};
use crate::services::record_exchange;
use crate::traits::Forwarder;

pub struct ProxyServer<F: Forwarder> {
    engine: Arc<DispositionEngine<F>>,
    bind_address: SocketAddr,
    drain_timeout: Duration,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: Option<mpsc::Receiver<()>>,
}

impl<F> ProxyServer<F>
where
    F: Forwarder + 'static,
{
    pub fn new(
        engine: DispositionEngine<F>,
        bind_address: SocketAddr,
        drain_timeout: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        Self {
            engine: Arc::new(engine),
            bind_address,
            drain_timeout,
            shutdown_tx,
            shutdown_rx: Some(shutdown_rx),
        }
    }

    /// Every method and every path goes through the engine
    pub fn build_router(&self) -> Router {
        Router::new()
            .fallback(proxy_handler::<F>)
            .with_state(self.engine.clone())
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(middleware::from_fn(record_exchange)),
            )
    }

    /// Sending on this stops the server after draining
    pub fn get_shutdown_sender(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }

    pub async fn bind(&self) -> ProxyResult<TcpListener> {
        TcpListener::bind(self.bind_address)
            .await
            .map_err(|source| ProxyError::ServerStartup {
                address: self.bind_address,
                source,
            })
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(&mut self) -> ProxyResult<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until a shutdown message arrives
    pub async fn serve(&mut self, listener: TcpListener) -> ProxyResult<()> {
        let mut shutdown_rx = self.shutdown_rx.take().ok_or(ProxyError::AlreadyRunning)?;
        let local_address = listener.local_addr()?;

        tracing::info!("🖴 serving at http://localhost:{}", local_address.port());

        let (drain_tx, drain_rx) = oneshot::channel::<()>();
        let server = axum::serve(listener, self.build_router())
            .with_graceful_shutdown(async move {
                let _ = drain_rx.await;
            });
        let mut server_task = tokio::spawn(async move { server.await });

        tokio::select! {
            result = &mut server_task => {
                // the server stopped on its own, nothing left to drain
                result??;
                return Ok(());
            }
            _ = shutdown_rx.recv() => {
                tracing::info!(timeout = ?self.drain_timeout, "⏳ draining in-flight requests");
            }
        }

        let _ = drain_tx.send(());
        match tokio::time::timeout(self.drain_timeout, &mut server_task).await {
            Ok(result) => result??,
            Err(_) => {
                tracing::warn!(
                    timeout = ?self.drain_timeout,
                    "could not drain in-flight requests in time, closing them"
                );
                server_task.abort();
            }
        }
        Ok(())
    }
}

async fn proxy_handler<F>(
    State(engine): State<Arc<DispositionEngine<F>>>,
    request: Request,
) -> Response<Body>
where
    F: Forwarder + 'static,
{
    engine.handle(request).await
}
