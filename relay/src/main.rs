use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use airlink_relay::{config::Config, control, forwarder, registry::Registry, sweeper};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::parse();
    let registry = Arc::new(Registry::new());
    let shutdown = CancellationToken::new();

    let control_listener = TcpListener::bind(&cfg.control_bind)
        .await
        .with_context(|| format!("binding control channel on {}", cfg.control_bind))?;
    let media_socket = UdpSocket::bind(&cfg.media_bind)
        .await
        .with_context(|| format!("binding datagram socket on {}", cfg.media_bind))?;

    info!(control = %cfg.control_bind, media = %cfg.media_bind, "relay starting");

    let sweeper_handle = tokio::spawn(sweeper::run(registry.clone(), shutdown.clone()));
    let forwarder_handle = tokio::spawn(forwarder::run(media_socket, registry.clone(), shutdown.clone()));

    tokio::select! {
        () = control::serve(control_listener, registry) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
        }
    }

    shutdown.cancel();
    let _ = tokio::join!(sweeper_handle, forwarder_handle);
    Ok(())
}
