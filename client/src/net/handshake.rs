//! Control-channel client: short-lived connections that each send one
//! request and read one response, mirroring the relay's single-shot
//! handling on the other end.

use std::time::Duration;

use airlink_voice::{ControlRequest, ControlResponse};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tracing::warn;

use crate::error::HandshakeError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const HANDSHAKE_RETRIES: usize = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

async fn send_request(control_addr: &str, req: &ControlRequest) -> Result<ControlResponse, HandshakeError> {
    let mut stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(control_addr))
        .await
        .map_err(|_| HandshakeError::Timeout)??;
    stream.write_all(&req.encode()).await?;

    let mut buf = [0u8; 64];
    let n = timeout(CONNECT_TIMEOUT, stream.read(&mut buf))
        .await
        .map_err(|_| HandshakeError::Timeout)??;
    ControlResponse::parse(&buf[..n]).ok_or(HandshakeError::UnrecognizedResponse)
}

/// Register with the relay, retrying up to `HANDSHAKE_RETRIES` times on a
/// connect/read failure. A non-`WELCOME` response is not retried — the
/// relay has already made its decision.
pub async fn hello(control_addr: &str, listen_port: u32, target_host: &str) -> Result<(), HandshakeError> {
    let req = ControlRequest::Hello { listen_port, target_host: target_host.to_string() };

    let mut last_err = None;
    for attempt in 1..=HANDSHAKE_RETRIES {
        match send_request(control_addr, &req).await {
            Ok(ControlResponse::Welcome) => return Ok(()),
            Ok(other) => return Err(HandshakeError::Rejected(other)),
            Err(e) => {
                warn!(attempt, error = %e, "handshake attempt failed");
                last_err = Some(e);
                if attempt < HANDSHAKE_RETRIES {
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
            }
        }
    }
    Err(last_err.unwrap_or(HandshakeError::Timeout))
}

/// Send one heartbeat. `Ok(true)` means the relay answered `ALIVE`;
/// `Ok(false)` means it answered with something else; `Err` means the
/// connection itself failed.
pub async fn heartbeat(control_addr: &str) -> Result<bool, HandshakeError> {
    let resp = send_request(control_addr, &ControlRequest::Heartbeat).await?;
    Ok(resp == ControlResponse::Alive)
}

pub async fn disconnect(control_addr: &str) -> Result<(), HandshakeError> {
    let _ = send_request(control_addr, &ControlRequest::Disconnect).await?;
    Ok(())
}
