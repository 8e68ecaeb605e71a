//! Datagram receive loop: validates arrivals against the relay's address,
//! decodes the sequence header, and feeds the jitter buffer. Runs until
//! EOT arrives or the session is torn down.

use std::{
    net::IpAddr,
    sync::{atomic::Ordering, Arc, Mutex},
    time::Duration,
};

use airlink_voice::{AudioDatagram, BYTES_PER_PACKET, RECV_BUFFER_LEN};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::session::SharedFlags;
use airlink_voice::JitterBuffer;

const READ_DEADLINE: Duration = Duration::from_secs(1);

pub async fn run(socket: UdpSocket, relay_ip: IpAddr, jitter: Arc<Mutex<JitterBuffer>>, flags: Arc<SharedFlags>) {
    let mut buf = vec![0u8; RECV_BUFFER_LEN];

    while flags.is_running.load(Ordering::Relaxed) {
        let recv = tokio::time::timeout(READ_DEADLINE, socket.recv_from(&mut buf)).await;
        let (n, src) = match recv {
            Err(_elapsed) => continue,
            Ok(Err(e)) => {
                warn!(error = %e, "datagram receive failed");
                continue;
            }
            Ok(Ok(pair)) => pair,
        };

        if src.ip() != relay_ip {
            debug!(src = %src, "dropping datagram not from the relay");
            continue;
        }

        let Some(datagram) = AudioDatagram::parse(&buf[..n]) else {
            continue; // shorter than the sequence header
        };

        if datagram.is_eot() {
            flags.eot_received.store(true, Ordering::Relaxed);
            break;
        }

        if datagram.payload.len() != BYTES_PER_PACKET {
            continue;
        }

        if let Ok(mut jb) = jitter.lock() {
            jb.insert(datagram.seq, datagram.payload);
        }
    }
}
