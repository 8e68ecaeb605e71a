//! Datagram forwarder: address-rewriting only. Never inspects sequence
//! numbers, EOT, or payload length.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use airlink_voice::RECV_BUFFER_LEN;

use crate::registry::Registry;

/// Readiness poll deadline — purely for shutdown responsiveness, not a
/// throughput knob.
const POLL_DEADLINE: Duration = Duration::from_secs(1);

pub async fn run(socket: UdpSocket, registry: Arc<Registry>, shutdown: CancellationToken) {
    let mut buf = vec![0u8; RECV_BUFFER_LEN];
    loop {
        let recv = tokio::time::timeout(POLL_DEADLINE, socket.recv_from(&mut buf));
        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = recv => {
                match result {
                    Err(_elapsed) => continue, // no datagram within the poll window; check shutdown again
                    Ok(Err(e)) => {
                        warn!(error = %e, "datagram receive failed");
                        continue;
                    }
                    Ok(Ok((n, src))) => forward_one(&socket, &registry, &buf[..n], src).await,
                }
            }
        }
    }
}

async fn forward_one(socket: &UdpSocket, registry: &Registry, payload: &[u8], src: SocketAddr) {
    let host = src.ip().to_string();
    let Some((target_host, target_port)) = registry.forward_target(&host) else {
        return; // unregistered sender or pairing not yet resolved
    };

    let dest = format!("{target_host}:{target_port}");
    let dest: SocketAddr = match dest.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!(%dest, error = %e, "unparseable forward target");
            return;
        }
    };

    if let Err(e) = socket.send_to(payload, dest).await {
        warn!(%host, %dest, error = %e, "forward failed");
    }
}
