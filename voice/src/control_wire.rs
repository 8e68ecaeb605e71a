//! Control-channel wire protocol: single-shot, unframed request/response
//! messages exchanged over a short-lived TCP connection.
//!
//! Requests:
//!   `HELLO` || u32-BE(listen_port) || ASCII(target_host)
//!   `HEARTBEAT`
//!   `DISCONNECT`
//!
//! Responses are fixed ASCII tokens: `WELCOME`, `FULL`, `ALIVE`, `BYE`,
//! `INVALID`, `TIMEOUT`, `ERROR`.

use bytes::{BufMut, Bytes, BytesMut};

const HELLO_TAG: &[u8] = b"HELLO";
const HEARTBEAT_TAG: &[u8] = b"HEARTBEAT";
const DISCONNECT_TAG: &[u8] = b"DISCONNECT";

/// Minimum length of a well-formed HELLO message: tag + u32 port. A
/// zero-length target host is syntactically accepted here (it will simply
/// never match another registrant's host at the registry layer).
const MIN_HELLO_LEN: usize = HELLO_TAG.len() + 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlRequest {
    Hello { listen_port: u32, target_host: String },
    Heartbeat,
    Disconnect,
}

impl ControlRequest {
    /// Parse a raw control message. `None` covers both "unrecognized
    /// message" and "malformed HELLO" — both answer with `INVALID` and
    /// neither mutates registry state.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.starts_with(HELLO_TAG) {
            if data.len() < MIN_HELLO_LEN {
                return None;
            }
            let port_bytes = &data[HELLO_TAG.len()..HELLO_TAG.len() + 4];
            let listen_port = u32::from_be_bytes(port_bytes.try_into().ok()?);
            let target_host =
                String::from_utf8_lossy(&data[HELLO_TAG.len() + 4..]).into_owned();
            return Some(Self::Hello { listen_port, target_host });
        }
        if data == HEARTBEAT_TAG {
            return Some(Self::Heartbeat);
        }
        if data == DISCONNECT_TAG {
            return Some(Self::Disconnect);
        }
        None
    }

    /// Encode this request for the wire (used by the client).
    pub fn encode(&self) -> Bytes {
        match self {
            Self::Hello { listen_port, target_host } => {
                let mut b = BytesMut::with_capacity(HELLO_TAG.len() + 4 + target_host.len());
                b.extend_from_slice(HELLO_TAG);
                b.put_u32(*listen_port);
                b.extend_from_slice(target_host.as_bytes());
                b.freeze()
            }
            Self::Heartbeat => Bytes::from_static(HEARTBEAT_TAG),
            Self::Disconnect => Bytes::from_static(DISCONNECT_TAG),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlResponse {
    Welcome,
    Full,
    Alive,
    Bye,
    Invalid,
    Timeout,
    Error,
}

impl ControlResponse {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Welcome => b"WELCOME",
            Self::Full => b"FULL",
            Self::Alive => b"ALIVE",
            Self::Bye => b"BYE",
            Self::Invalid => b"INVALID",
            Self::Timeout => b"TIMEOUT",
            Self::Error => b"ERROR",
        }
    }

    pub fn parse(data: &[u8]) -> Option<Self> {
        Some(match data {
            b"WELCOME" => Self::Welcome,
            b"FULL" => Self::Full,
            b"ALIVE" => Self::Alive,
            b"BYE" => Self::Bye,
            b"INVALID" => Self::Invalid,
            b"TIMEOUT" => Self::Timeout,
            b"ERROR" => Self::Error,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hello() {
        let req = ControlRequest::Hello { listen_port: 20_000, target_host: "10.0.0.2".into() };
        let wire = req.encode();
        assert_eq!(ControlRequest::parse(&wire), Some(req));
    }

    #[test]
    fn rejects_short_hello() {
        // "HELLO" + 3 bytes of port is too short to carry a u32 port at all.
        let mut bad = BytesMut::new();
        bad.extend_from_slice(HELLO_TAG);
        bad.extend_from_slice(&[0, 0, 1]);
        assert_eq!(ControlRequest::parse(&bad), None);
    }

    #[test]
    fn parses_heartbeat_and_disconnect() {
        assert_eq!(ControlRequest::parse(b"HEARTBEAT"), Some(ControlRequest::Heartbeat));
        assert_eq!(ControlRequest::parse(b"DISCONNECT"), Some(ControlRequest::Disconnect));
    }

    #[test]
    fn unknown_message_is_none() {
        assert_eq!(ControlRequest::parse(b"PING"), None);
    }

    #[test]
    fn response_tokens_round_trip() {
        for r in [
            ControlResponse::Welcome,
            ControlResponse::Full,
            ControlResponse::Alive,
            ControlResponse::Bye,
            ControlResponse::Invalid,
            ControlResponse::Timeout,
            ControlResponse::Error,
        ] {
            assert_eq!(ControlResponse::parse(r.as_bytes()), Some(r));
        }
    }
}
