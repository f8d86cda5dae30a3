//! Test helper utilities for proxy integration tests

use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use mockproxy::{DispositionEngine, ProxyResult, ProxyServer, RealForwarder};

/// A proxy serving on an ephemeral loopback port
pub struct RunningProxy {
    pub address: SocketAddr,
    pub shutdown: mpsc::Sender<()>,
    pub handle: JoinHandle<ProxyResult<()>>,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.address, path)
    }

    /// Ask for shutdown and wait for the server task
    pub async fn stop(self) -> ProxyResult<()> {
        let _ = self.shutdown.send(()).await;
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("proxy did not stop in time")
            .expect("proxy task panicked")
    }
}

/// Start a proxy in front of `upstream` with the given YAML endpoints
pub async fn start_proxy(upstream: &str, endpoints: &str) -> RunningProxy {
    start_proxy_with_drain(upstream, endpoints, Duration::from_secs(5)).await
}

pub async fn start_proxy_with_drain(
    upstream: &str,
    endpoints: &str,
    drain: Duration,
) -> RunningProxy {
    let table = shared::parse_endpoints(endpoints).expect("invalid test endpoints");
    let forwarder = RealForwarder::new(shared::parse_domain(upstream).unwrap(), false).unwrap();
    let engine = DispositionEngine::from_table(&table, forwarder).expect("invalid test rules");

    let mut server = ProxyServer::new(engine, SocketAddr::from(([127, 0, 0, 1], 0)), drain);
    let listener = server.bind().await.unwrap();
    let address = listener.local_addr().unwrap();
    let shutdown = server.get_shutdown_sender();
    let handle = tokio::spawn(async move { server.serve(listener).await });

    RunningProxy {
        address,
        shutdown,
        handle,
    }
}

/// Client that never follows redirects, like the proxy itself
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
