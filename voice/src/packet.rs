//! Audio datagram wire format: `u32-BE seq || payload`.
//!
//! Normal audio payload is always [`BYTES_PER_PACKET`] bytes; an end-of-
//! transmission datagram uses the [`EOT_SEQ_NUM`] sentinel with a
//! zero-filled payload of the same length.

use bytes::{BufMut, Bytes, BytesMut};

/// Capture/playback sample rate, in Hz.
pub const SAMPLE_RATE: u32 = 44_100;
/// Mono audio only.
pub const CHANNELS: u16 = 1;
/// Samples per 20ms capture callback / playback tick.
pub const CHUNK_SIZE: usize = 882;
/// `CHUNK_SIZE` 16-bit samples, little-endian.
pub const BYTES_PER_PACKET: usize = CHUNK_SIZE * 2;
/// Sequence number prefix length (u32-BE).
pub const SEQ_HEADER_LEN: usize = 4;
/// Total on-wire datagram size for normal audio and EOT.
pub const DATAGRAM_LEN: usize = SEQ_HEADER_LEN + BYTES_PER_PACKET;
/// Receive buffer size, sized generously above `DATAGRAM_LEN`.
pub const RECV_BUFFER_LEN: usize = 2200;
/// Sentinel sequence number marking end-of-transmission.
pub const EOT_SEQ_NUM: u32 = 99_999_999;

/// A parsed audio datagram: a sequence number and its payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioDatagram {
    pub seq: u32,
    pub payload: Bytes,
}

impl AudioDatagram {
    pub fn is_eot(&self) -> bool {
        self.seq == EOT_SEQ_NUM
    }

    /// Build the single EOT datagram a sender emits on shutdown.
    pub fn eot() -> Bytes {
        encode(EOT_SEQ_NUM, &[0u8; BYTES_PER_PACKET])
    }

    /// Parse a datagram off the wire. Returns `None` for anything shorter
    /// than the sequence header — the caller decides what "too short"
    /// versus "wrong payload length" means for its side of the wire.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < SEQ_HEADER_LEN {
            return None;
        }
        let seq = u32::from_be_bytes(bytes[..SEQ_HEADER_LEN].try_into().ok()?);
        Some(Self {
            seq,
            payload: Bytes::copy_from_slice(&bytes[SEQ_HEADER_LEN..]),
        })
    }
}

/// Encode `seq || payload` for the wire.
pub fn encode(seq: u32, payload: &[u8]) -> Bytes {
    let mut b = BytesMut::with_capacity(SEQ_HEADER_LEN + payload.len());
    b.put_u32(seq);
    b.extend_from_slice(payload);
    b.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_normal_packet() {
        let payload = vec![7u8; BYTES_PER_PACKET];
        let wire = encode(42, &payload);
        assert_eq!(wire.len(), DATAGRAM_LEN);

        let parsed = AudioDatagram::parse(&wire).unwrap();
        assert_eq!(parsed.seq, 42);
        assert_eq!(&parsed.payload[..], &payload[..]);
        assert!(!parsed.is_eot());
    }

    #[test]
    fn eot_datagram_is_recognized() {
        let wire = AudioDatagram::eot();
        let parsed = AudioDatagram::parse(&wire).unwrap();
        assert!(parsed.is_eot());
        assert_eq!(parsed.payload.len(), BYTES_PER_PACKET);
        assert!(parsed.payload.iter().all(|&b| b == 0));
    }

    #[test]
    fn short_datagram_fails_to_parse() {
        assert!(AudioDatagram::parse(&[0, 0, 1]).is_none());
    }
}
