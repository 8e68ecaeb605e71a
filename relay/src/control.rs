//! Control-channel acceptor: one short-lived handler per connection. Each
//! handler reads exactly one request, writes exactly one response, and
//! closes.

use std::sync::Arc;

use airlink_voice::{ControlRequest, ControlResponse};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::timeout,
};
use tracing::{info, warn};

use crate::{
    error::ControlReadError,
    registry::{HelloOutcome, Registry, TCP_TIMEOUT},
};

/// A request never exceeds a `HELLO` tag + u32 port + a reasonably-sized
/// host string; 4KiB leaves generous headroom without inviting abuse.
const MAX_REQUEST_BYTES: usize = 4096;

pub async fn serve(listener: TcpListener, registry: Arc<Registry>) {
    info!(addr = ?listener.local_addr().ok(), "control channel listening");
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let registry = registry.clone();
                tokio::spawn(async move {
                    handle_connection(stream, peer.ip().to_string(), registry).await;
                });
            }
            Err(e) => {
                warn!(error = %e, "control accept failed");
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream, host: String, registry: Arc<Registry>) {
    let response = match read_request(&mut stream).await {
        Ok(bytes) => dispatch(&registry, &host, &bytes),
        Err(ControlReadError::Timeout) => {
            warn!(%host, "control read timed out");
            ControlResponse::Timeout
        }
        Err(ControlReadError::Io(e)) => {
            warn!(%host, error = %e, "control read failed");
            ControlResponse::Error
        }
    };

    if let Err(e) = stream.write_all(response.as_bytes()).await {
        warn!(%host, error = %e, "failed to write control response");
    }
}

async fn read_request(stream: &mut TcpStream) -> Result<Vec<u8>, ControlReadError> {
    let mut buf = vec![0u8; MAX_REQUEST_BYTES];
    let n = timeout(TCP_TIMEOUT, stream.read(&mut buf))
        .await
        .map_err(|_| ControlReadError::Timeout)??;
    buf.truncate(n);
    Ok(buf)
}

fn dispatch(registry: &Registry, host: &str, raw: &[u8]) -> ControlResponse {
    match ControlRequest::parse(raw) {
        None => ControlResponse::Invalid,
        Some(ControlRequest::Hello { listen_port, target_host }) => {
            match registry.hello(host, listen_port, &target_host) {
                HelloOutcome::Welcome => {
                    info!(%host, listen_port, %target_host, "registered");
                    ControlResponse::Welcome
                }
                HelloOutcome::Full => {
                    warn!(%host, "registry full, rejecting HELLO");
                    ControlResponse::Full
                }
            }
        }
        Some(ControlRequest::Heartbeat) => {
            registry.heartbeat(host);
            ControlResponse::Alive
        }
        Some(ControlRequest::Disconnect) => {
            registry.disconnect(host);
            info!(%host, "disconnected");
            ControlResponse::Bye
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_message_maps_to_invalid() {
        let registry = Registry::new();
        assert_eq!(dispatch(&registry, "10.0.0.1", b"NONSENSE"), ControlResponse::Invalid);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn hello_then_heartbeat_then_disconnect() {
        let registry = Registry::new();
        assert_eq!(
            dispatch(&registry, "10.0.0.1", &ControlRequest::Hello { listen_port: 1, target_host: "x".into() }.encode()),
            ControlResponse::Welcome
        );
        assert_eq!(dispatch(&registry, "10.0.0.1", b"HEARTBEAT"), ControlResponse::Alive);
        assert_eq!(dispatch(&registry, "10.0.0.1", b"DISCONNECT"), ControlResponse::Bye);
        assert_eq!(registry.len(), 0);
    }
}
