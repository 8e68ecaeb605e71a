pub mod handshake;
pub mod receiver;
pub mod sender;
