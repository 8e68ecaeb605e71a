use clap::Parser;

/// All flags are optional and default to the relay's well-known
/// addresses, so running with no arguments reproduces the fixed control
/// and media ports.
#[derive(Parser, Debug, Clone)]
#[command(name = "airlink-relay", about = "Two-party voice relay")]
pub struct Config {
    /// Control-channel (TCP) bind address.
    #[arg(long, default_value = "0.0.0.0:8888")]
    pub control_bind: String,

    /// Datagram (UDP) bind address.
    #[arg(long, default_value = "0.0.0.0:9999")]
    pub media_bind: String,
}
