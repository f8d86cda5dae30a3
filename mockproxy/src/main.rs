//! Tester proxy entry point

use clap::Parser;
use shared::logging;

use mockproxy::{Args, DispositionEngine, ProxyResult, ProxyServer, RealForwarder, Settings};

#[tokio::main]
async fn main() -> ProxyResult<()> {
    // .env values fill in unset MOCKPROXY_* variables
    dotenv::dotenv().ok();
    let args = Args::parse();

    // logging is not up yet, report configuration problems on stderr
    let settings = Settings::resolve(args).inspect_err(|e| eprintln!("error: {e}"))?;

    logging::init_tracing(&settings.log_level, settings.colors);
    logging::log_startup(&format!("mockproxy for {}", settings.upstream));

    let forwarder = RealForwarder::new(settings.upstream.clone(), settings.insecure)?;
    let engine = DispositionEngine::from_table(&settings.endpoints, forwarder)
        .inspect_err(|e| logging::log_error("Endpoint configuration", e))?;

    tracing::debug!(
        scheme = settings.upstream.scheme(),
        host = settings.upstream.host_str().unwrap_or_default(),
        endpoints = engine.route_count(),
        "🦖 initializing handler"
    );

    let mut server = ProxyServer::new(engine, settings.bind_address(), settings.drain_timeout);

    // Set up graceful shutdown
    let shutdown_sender = server.get_shutdown_sender();
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(signal) => {
                logging::log_shutdown(signal);
                let _ = shutdown_sender.send(()).await;
            }
            Err(err) => {
                logging::log_error("Signal handling", &err);
            }
        }
    });

    server
        .run()
        .await
        .inspect_err(|e| logging::log_error("Proxy server", e))?;

    logging::log_success("👋 bye!");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|_| "received Ctrl+C signal"),
        _ = terminate.recv() => Ok("received SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("received Ctrl+C signal")
}
