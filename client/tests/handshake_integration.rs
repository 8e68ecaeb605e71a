//! Exercises the client's control-channel handshake against a real relay
//! control listener, the same way the relay's own integration tests drive
//! it from the other side.

use std::sync::Arc;

use airlink_client::net::handshake;
use airlink_relay::{control, registry::Registry};
use tokio::net::TcpListener;

async fn spawn_relay_control() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let registry = Arc::new(Registry::new());
    tokio::spawn(control::serve(listener, registry));
    addr.to_string()
}

#[tokio::test]
async fn hello_then_heartbeat_then_disconnect_round_trip() {
    let control_addr = spawn_relay_control().await;

    handshake::hello(&control_addr, 40000, "nobody").await.unwrap();

    let alive = handshake::heartbeat(&control_addr).await.unwrap();
    assert!(alive);

    handshake::disconnect(&control_addr).await.unwrap();
}

#[tokio::test]
async fn hello_retries_until_the_relay_is_listening() {
    // Reserve a port, then bind the relay to it only after the client has
    // already started its first (failing) connection attempt.
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = probe.local_addr().unwrap().to_string();
    drop(probe);

    let hello_addr = addr.clone();
    let client = tokio::spawn(async move { handshake::hello(&hello_addr, 1, "nobody").await });

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    let registry = Arc::new(Registry::new());
    tokio::spawn(control::serve(listener, registry));

    client.await.unwrap().unwrap();
}
