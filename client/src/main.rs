use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use airlink_client::{config::Config, session::Session};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::parse();
    let session = match Session::new(&cfg.server_ip, cfg.udp_port, &cfg.target_ip) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let flags = session.flags.clone();
    let shutdown = session.shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown requested");
        flags.is_recording.store(false, std::sync::atomic::Ordering::Relaxed);
        flags.is_running.store(false, std::sync::atomic::Ordering::Relaxed);
        shutdown.cancel();
    });

    let quit_flags = session.flags.clone();
    let quit_shutdown = session.shutdown.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().eq_ignore_ascii_case("quit") {
                info!("quit requested on stdin");
                quit_flags.is_recording.store(false, std::sync::atomic::Ordering::Relaxed);
                quit_flags.is_running.store(false, std::sync::atomic::Ordering::Relaxed);
                quit_shutdown.cancel();
                break;
            }
        }
    });

    if let Err(e) = session.run().await {
        error!(error = %e, "session ended with an error");
        std::process::exit(1);
    }

    Ok(())
}
