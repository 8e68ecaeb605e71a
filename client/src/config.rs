use clap::Parser;

/// Three positional arguments match the established launch convention:
/// the relay's host, the local datagram port to receive on, and the host
/// of the partner endpoint to pair with.
#[derive(Parser, Debug, Clone)]
#[command(name = "airlink-client", about = "Two-party voice relay endpoint")]
pub struct Config {
    /// Relay host (control channel on 8888, datagram channel on 9999).
    pub server_ip: String,

    /// Local UDP port this endpoint listens on for incoming audio.
    pub udp_port: u16,

    /// Host of the partner endpoint to request pairing with.
    pub target_ip: String,
}
