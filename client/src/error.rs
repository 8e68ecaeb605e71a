use airlink_voice::ControlResponse;

/// Control-channel failures the caller needs to branch on: a connect/read
/// failure is retryable, a non-`WELCOME`/`ALIVE` reply is not.
#[derive(thiserror::Error, Debug)]
pub enum HandshakeError {
    #[error("connect or read timed out")]
    Timeout,
    #[error("control connection failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("relay sent an unrecognized response")]
    UnrecognizedResponse,
    #[error("relay rejected the request: {0:?}")]
    Rejected(ControlResponse),
}
