//! Packetizer: turns one capture-callback frame into zero-or-one outbound
//! datagrams. Invoked synchronously on the capture backend's own thread,
//! so sends go through a plain blocking socket rather than an async one.

use std::{
    net::UdpSocket,
    sync::{atomic::{AtomicU32, Ordering}, Arc},
};

use airlink_voice::{packet, AudioDatagram, BYTES_PER_PACKET};
use tracing::warn;

use crate::session::SharedFlags;

pub struct Sender {
    socket: UdpSocket,
    relay_media_addr: String,
    next_seq: AtomicU32,
    flags: Arc<SharedFlags>,
}

impl Sender {
    pub fn new(socket: UdpSocket, relay_media_addr: String, flags: Arc<SharedFlags>) -> Self {
        Self { socket, relay_media_addr, next_seq: AtomicU32::new(0), flags }
    }

    /// Convert one `f32` capture frame to 16-bit PCM and send it as a
    /// single packet. A frame shorter than `BYTES_PER_PACKET` once encoded
    /// is discarded rather than padded.
    pub fn on_frame(&self, frame: &[f32]) {
        if !self.flags.is_recording.load(Ordering::Relaxed) {
            return;
        }

        let mut pcm = Vec::with_capacity(frame.len() * 2);
        for &sample in frame {
            let clamped = sample.clamp(-1.0, 1.0);
            let quantized = (clamped * 32767.0) as i16;
            pcm.extend_from_slice(&quantized.to_le_bytes());
        }
        if pcm.len() != BYTES_PER_PACKET {
            return;
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let wire = packet::encode(seq, &pcm);
        if let Err(e) = self.socket.send_to(&wire, &self.relay_media_addr) {
            warn!(error = %e, seq, "audio send failed");
        }
    }

    pub fn send_eot(&self) {
        let wire = AudioDatagram::eot();
        if let Err(e) = self.socket.send_to(&wire, &self.relay_media_addr) {
            warn!(error = %e, "EOT send failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airlink_voice::CHUNK_SIZE;
    use std::sync::atomic::AtomicBool;

    fn test_sender() -> (Sender, UdpSocket) {
        let sink = UdpSocket::bind("127.0.0.1:0").unwrap();
        let sink_addr = sink.local_addr().unwrap().to_string();
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let flags = Arc::new(SharedFlags {
            is_running: AtomicBool::new(true),
            is_recording: AtomicBool::new(true),
            eot_received: AtomicBool::new(false),
        });
        (Sender::new(socket, sink_addr, flags), sink)
    }

    #[test]
    fn a_full_frame_is_sent_as_one_sequenced_packet() {
        let (sender, sink) = test_sender();
        sink.set_read_timeout(Some(std::time::Duration::from_secs(1))).unwrap();

        sender.on_frame(&[0.5f32; CHUNK_SIZE]);

        let mut buf = [0u8; 2200];
        let n = sink.recv(&mut buf).unwrap();
        assert_eq!(n, 4 + BYTES_PER_PACKET);
        assert_eq!(&buf[..4], &0u32.to_be_bytes());
    }

    #[test]
    fn sequence_numbers_increment_per_frame() {
        let (sender, sink) = test_sender();
        sink.set_read_timeout(Some(std::time::Duration::from_secs(1))).unwrap();

        sender.on_frame(&[0.0f32; CHUNK_SIZE]);
        sender.on_frame(&[0.0f32; CHUNK_SIZE]);

        let mut buf = [0u8; 2200];
        sink.recv(&mut buf).unwrap();
        let n = sink.recv(&mut buf).unwrap();
        assert_eq!(n, 4 + BYTES_PER_PACKET);
        assert_eq!(&buf[..4], &1u32.to_be_bytes());
    }

    #[test]
    fn stopped_recording_drops_the_frame() {
        let (sender, sink) = test_sender();
        sink.set_read_timeout(Some(std::time::Duration::from_millis(200))).unwrap();
        sender.flags.is_recording.store(false, Ordering::Relaxed);

        sender.on_frame(&[0.5f32; CHUNK_SIZE]);

        let mut buf = [0u8; 64];
        assert!(sink.recv(&mut buf).is_err());
    }

    #[test]
    fn short_frame_is_discarded_rather_than_padded() {
        let (sender, sink) = test_sender();
        sink.set_read_timeout(Some(std::time::Duration::from_millis(200))).unwrap();

        sender.on_frame(&[0.0f32; 10]);

        let mut buf = [0u8; 64];
        assert!(sink.recv(&mut buf).is_err());
    }
}
