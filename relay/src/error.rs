use thiserror::Error;

/// Outcome of reading and parsing a single control-channel request. The
/// handler branches on this to decide which fixed response token to send.
#[derive(Error, Debug)]
pub enum ControlReadError {
    #[error("read timed out")]
    Timeout,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
