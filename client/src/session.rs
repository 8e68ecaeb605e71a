//! Glues the four concurrent activities together: capture callback,
//! datagram receive, playback, and the client-side heartbeat. The
//! receive and playback sides share only the jitter buffer; everything
//! else communicates through the atomic flags below.

use std::{
    net::{IpAddr, UdpSocket as StdUdpSocket},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use airlink_voice::{JitterBuffer, CHUNK_SIZE, SAMPLE_RATE};
use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    audio::{cpal_device::{CpalCapture, CpalPlayback}, CaptureDevice, PlaybackDevice},
    net::{handshake, receiver, sender::Sender},
    playback,
};

/// Receive-side reordering tolerance; 4 packets of slack at 20ms/packet.
const JITTER_BUFFER_SIZE: usize = 4;
const CLIENT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Default)]
pub struct SharedFlags {
    pub is_running: AtomicBool,
    pub is_recording: AtomicBool,
    pub eot_received: AtomicBool,
}

pub struct Session {
    pub control_addr: String,
    pub media_addr: String,
    pub relay_ip: IpAddr,
    pub local_udp_port: u16,
    pub target_ip: String,
    pub flags: Arc<SharedFlags>,
    /// Wakes the heartbeat loop's 30s ticker immediately on shutdown,
    /// rather than leaving it to poll `is_running` on its own cadence.
    pub shutdown: CancellationToken,
}

impl Session {
    pub fn new(server_ip: &str, udp_port: u16, target_ip: &str) -> Result<Self> {
        let relay_ip: IpAddr = server_ip.parse().context("server_ip must be an IP literal")?;
        let flags = Arc::new(SharedFlags {
            is_running: AtomicBool::new(true),
            is_recording: AtomicBool::new(true),
            eot_received: AtomicBool::new(false),
        });
        Ok(Self {
            control_addr: format!("{server_ip}:8888"),
            media_addr: format!("{server_ip}:9999"),
            relay_ip,
            local_udp_port: udp_port,
            target_ip: target_ip.to_string(),
            flags,
            shutdown: CancellationToken::new(),
        })
    }

    /// Registers with the relay, then runs until `stop()` is called from
    /// another task or EOT is observed on the receive side.
    pub async fn run(&self) -> Result<()> {
        handshake::hello(&self.control_addr, self.local_udp_port as u32, &self.target_ip).await?;
        info!(target = %self.target_ip, "registered with relay");

        let jitter = Arc::new(Mutex::new(JitterBuffer::new(JITTER_BUFFER_SIZE)));

        let recv_socket = UdpSocket::bind(("0.0.0.0", self.local_udp_port)).await?;
        let receiver_handle = tokio::spawn(receiver::run(
            recv_socket,
            self.relay_ip,
            jitter.clone(),
            self.flags.clone(),
        ));

        let playback_device = CpalPlayback::start(SAMPLE_RATE, 1)?;
        let playback_flags = self.flags.clone();
        let playback_jitter = jitter.clone();
        let playback_handle =
            tokio::spawn(async move { playback::run(playback_device, playback_jitter, playback_flags).await });

        let send_socket = StdUdpSocket::bind("0.0.0.0:0")?;
        let sender = Arc::new(Sender::new(send_socket, self.media_addr.clone(), self.flags.clone()));
        let capture_sender = sender.clone();
        let _capture_device = CpalCapture::start(
            SAMPLE_RATE,
            1,
            CHUNK_SIZE,
            Box::new(move |frame: &[f32]| capture_sender.on_frame(frame)),
        )?;

        let heartbeat_handle = tokio::spawn(run_heartbeat(
            self.control_addr.clone(),
            self.flags.clone(),
            self.shutdown.clone(),
        ));

        // Wait for whichever of the three background loops ends first —
        // EOT, a heartbeat failure, or an external stop() call all surface
        // through `is_running`/`eot_received`, which each loop also
        // observes, so this just joins them all.
        let _ = tokio::join!(receiver_handle, playback_handle, heartbeat_handle);

        sender.send_eot();
        let _ = handshake::disconnect(&self.control_addr).await;
        Ok(())
    }

    pub fn stop(&self) {
        // Stop capture before signaling shutdown so no real audio packet can
        // follow the EOT this triggers in `run`.
        self.flags.is_recording.store(false, Ordering::Relaxed);
        self.flags.is_running.store(false, Ordering::Relaxed);
        self.shutdown.cancel();
    }
}

async fn run_heartbeat(control_addr: String, flags: Arc<SharedFlags>, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(CLIENT_HEARTBEAT_INTERVAL);
    ticker.tick().await; // first tick fires immediately; the registration HELLO already counts as alive

    while flags.is_running.load(Ordering::Relaxed) {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if !flags.is_running.load(Ordering::Relaxed) {
            break;
        }
        match handshake::heartbeat(&control_addr).await {
            Ok(true) => {}
            Ok(false) => {
                warn!("relay heartbeat response was not ALIVE, tearing down session");
                flags.is_running.store(false, Ordering::Relaxed);
                flags.is_recording.store(false, Ordering::Relaxed);
                break;
            }
            Err(e) => {
                warn!(error = %e, "heartbeat connection failed, tearing down session");
                flags.is_running.store(false, Ordering::Relaxed);
                flags.is_recording.store(false, Ordering::Relaxed);
                break;
            }
        }
    }
}
