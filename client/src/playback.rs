//! Playback loop: drains the jitter buffer on a fixed tick and writes
//! either decoded audio or silence to the output device.

use std::sync::{atomic::Ordering, Arc, Mutex};
use std::time::Duration;

use airlink_voice::{JitterBuffer, CHUNK_SIZE};

use crate::audio::PlaybackDevice;
use crate::session::SharedFlags;

const PLAYBACK_INTERVAL: Duration = Duration::from_millis(20);
const PREFILL_DELAY: Duration = Duration::from_millis(200);

pub async fn run<D: PlaybackDevice>(device: D, jitter: Arc<Mutex<JitterBuffer>>, flags: Arc<SharedFlags>) {
    tokio::time::sleep(PREFILL_DELAY).await;

    let mut ticker = tokio::time::interval(PLAYBACK_INTERVAL);
    while flags.is_running.load(Ordering::Relaxed) && !flags.eot_received.load(Ordering::Relaxed) {
        ticker.tick().await;

        let entry = jitter.lock().ok().and_then(|mut jb| jb.pop_ready());
        match entry {
            None => device.write(&[0.0f32; CHUNK_SIZE]),
            Some((_seq, payload)) => {
                let mut frame = [0.0f32; CHUNK_SIZE];
                for (i, chunk) in payload.chunks(2).enumerate() {
                    if i >= CHUNK_SIZE || chunk.len() < 2 {
                        break;
                    }
                    let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
                    frame[i] = sample as f32 / 32767.0;
                }
                device.write(&frame);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airlink_voice::packet;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex as StdMutex;

    struct FakeDevice {
        frames: Arc<StdMutex<Vec<Vec<f32>>>>,
    }

    impl PlaybackDevice for FakeDevice {
        fn start(_sample_rate: u32, _channels: u16) -> anyhow::Result<Self> {
            unreachable!("fake device is constructed directly in tests")
        }

        fn write(&self, frame: &[f32]) {
            self.frames.lock().unwrap().push(frame.to_vec());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn silence_plays_when_the_buffer_is_empty() {
        let frames = Arc::new(StdMutex::new(Vec::new()));
        let device = FakeDevice { frames: frames.clone() };
        let jitter = Arc::new(Mutex::new(JitterBuffer::new(4)));
        let flags = Arc::new(SharedFlags {
            is_running: AtomicBool::new(true),
            is_recording: AtomicBool::new(true),
            eot_received: AtomicBool::new(false),
        });

        let stop_flags = flags.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            stop_flags.is_running.store(false, Ordering::Relaxed);
        });

        run(device, jitter, flags).await;

        let written = frames.lock().unwrap();
        assert!(!written.is_empty());
        assert!(written[0].iter().all(|&s| s == 0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn buffered_payload_is_decoded_before_playback() {
        let frames = Arc::new(StdMutex::new(Vec::new()));
        let device = FakeDevice { frames: frames.clone() };
        let jitter = Arc::new(Mutex::new(JitterBuffer::new(4)));

        let mut pcm = vec![0u8; airlink_voice::BYTES_PER_PACKET];
        pcm[0..2].copy_from_slice(&16384i16.to_le_bytes());
        let wire = packet::encode(0, &pcm);
        jitter.lock().unwrap().insert(0, wire.slice(4..));

        let flags = Arc::new(SharedFlags {
            is_running: AtomicBool::new(true),
            is_recording: AtomicBool::new(true),
            eot_received: AtomicBool::new(false),
        });

        let stop_flags = flags.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            stop_flags.is_running.store(false, Ordering::Relaxed);
        });

        run(device, jitter, flags).await;

        let written = frames.lock().unwrap();
        let first_sample = written[0][0];
        assert!((first_sample - (16384.0 / 32767.0)).abs() < 1e-6);
    }
}
