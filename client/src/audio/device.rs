//! The capture/playback boundary. Everything upstream (packetizer, jitter
//! buffer, playback loop) depends only on these traits, never on a
//! concrete backend, so the pipeline is testable against a fake device
//! that never touches hardware.

use anyhow::Result;

/// A duplex PCM input. `start` begins delivering `frame_samples`-sized
/// `f32` frames in `[-1.0, 1.0]` to `on_frame`, called from the backend's
/// own thread for as long as the returned device is alive.
pub trait CaptureDevice: Send {
    fn start(
        sample_rate: u32,
        channels: u16,
        frame_samples: usize,
        on_frame: Box<dyn FnMut(&[f32]) + Send>,
    ) -> Result<Self>
    where
        Self: Sized;
}

/// A duplex PCM output. `write` is called once per playback tick with
/// exactly `frame_samples` samples (silence or decoded payload).
pub trait PlaybackDevice: Send {
    fn start(sample_rate: u32, channels: u16) -> Result<Self>
    where
        Self: Sized;

    fn write(&self, frame: &[f32]);
}
