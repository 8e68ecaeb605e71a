//! Wire formats and the jitter buffer shared between the relay and the client.
//!
//! Nothing in this crate touches a socket or an audio device — it only knows
//! how to turn bytes into typed messages and back, and how to reorder audio
//! packets for playback. That keeps it trivially unit-testable and lets both
//! binaries agree on the wire without duplicating parsing logic.

pub mod control_wire;
pub mod jitter;
pub mod packet;

pub use control_wire::{ControlRequest, ControlResponse};
pub use jitter::JitterBuffer;
pub use packet::{
    AudioDatagram, BYTES_PER_PACKET, CHUNK_SIZE, DATAGRAM_LEN, EOT_SEQ_NUM, RECV_BUFFER_LEN,
    SAMPLE_RATE,
};
