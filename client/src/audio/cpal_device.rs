use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapCons, HeapProd, HeapRb,
};
use std::sync::{Arc, Mutex};

use super::device::{CaptureDevice, PlaybackDevice};

/// cpal-backed capture. The callback fires with whatever buffer size the
/// device hands back, which rarely lines up with `frame_samples`, so
/// incoming samples are accumulated and drained in fixed-size slices
/// before reaching the caller's frame callback.
pub struct CpalCapture {
    _stream: cpal::Stream,
}

// cpal::Stream carries raw platform handles that are Send but not Sync on
// some backends; the stream is only ever touched to keep it alive.
unsafe impl Send for CpalCapture {}
unsafe impl Sync for CpalCapture {}

impl CaptureDevice for CpalCapture {
    fn start(
        sample_rate: u32,
        channels: u16,
        frame_samples: usize,
        mut on_frame: Box<dyn FnMut(&[f32]) + Send>,
    ) -> Result<Self> {
        let host = cpal::default_host();
        let dev = host.default_input_device().ok_or_else(|| anyhow!("no input device"))?;
        let (stream_cfg, actual_channels) = compatible_input_config(&dev, sample_rate, channels)?;

        let mut acc: Vec<f32> = Vec::with_capacity(frame_samples * 2);
        let target_ch = channels;

        let stream = dev.build_input_stream(
            &stream_cfg,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if actual_channels == target_ch {
                    acc.extend_from_slice(data);
                } else {
                    for chunk in data.chunks(actual_channels as usize) {
                        if let Some(&s) = chunk.first() {
                            acc.push(s);
                        }
                    }
                }
                while acc.len() >= frame_samples {
                    let frame: Vec<f32> = acc.drain(..frame_samples).collect();
                    on_frame(&frame);
                }
            },
            move |err| {
                tracing::warn!(error = %err, "capture stream error");
            },
            None,
        )?;
        stream.play()?;
        Ok(Self { _stream: stream })
    }
}

/// cpal-backed playback, fed through a ring buffer so the real-time
/// output callback never blocks on the playback loop's own cadence.
pub struct CpalPlayback {
    _stream: cpal::Stream,
    prod: Arc<Mutex<HeapProd<f32>>>,
    channels: u16,
}

unsafe impl Send for CpalPlayback {}
unsafe impl Sync for CpalPlayback {}

impl PlaybackDevice for CpalPlayback {
    fn start(sample_rate: u32, channels: u16) -> Result<Self> {
        let host = cpal::default_host();
        let dev = host.default_output_device().ok_or_else(|| anyhow!("no output device"))?;
        let (stream_cfg, actual_channels) = compatible_output_config(&dev, sample_rate, channels)?;

        let rb = HeapRb::<f32>::new(sample_rate as usize * channels as usize);
        let (prod, cons): (HeapProd<f32>, HeapCons<f32>) = rb.split();
        let prod = Arc::new(Mutex::new(prod));
        let cons = Arc::new(Mutex::new(cons));
        let target_ch = channels;

        let stream = dev.build_output_stream(
            &stream_cfg,
            move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let Ok(mut c) = cons.lock() else { return };
                if actual_channels == target_ch {
                    for o in out.iter_mut() {
                        *o = c.try_pop().unwrap_or(0.0);
                    }
                } else {
                    for frame in out.chunks_mut(actual_channels as usize) {
                        let sample = c.try_pop().unwrap_or(0.0);
                        for o in frame.iter_mut() {
                            *o = sample;
                        }
                    }
                }
            },
            move |err| {
                tracing::warn!(error = %err, "playback stream error");
            },
            None,
        )?;
        stream.play()?;
        Ok(Self { _stream: stream, prod, channels })
    }

    fn write(&self, frame: &[f32]) {
        let Ok(mut p) = self.prod.lock() else { return };
        for &s in frame {
            for _ in 0..self.channels {
                let _ = p.try_push(s);
            }
        }
    }
}

fn compatible_input_config(
    dev: &cpal::Device,
    target_rate: u32,
    target_channels: u16,
) -> Result<(cpal::StreamConfig, u16)> {
    if let Ok(ranges) = dev.supported_input_configs() {
        for range in ranges {
            if range.channels() == target_channels
                && range.min_sample_rate().0 <= target_rate
                && range.max_sample_rate().0 >= target_rate
            {
                return Ok((
                    cpal::StreamConfig {
                        channels: target_channels,
                        sample_rate: cpal::SampleRate(target_rate),
                        buffer_size: cpal::BufferSize::Default,
                    },
                    target_channels,
                ));
            }
        }
    }
    if let Ok(ranges) = dev.supported_input_configs() {
        for range in ranges {
            if range.min_sample_rate().0 <= target_rate && range.max_sample_rate().0 >= target_rate {
                let ch = range.channels();
                return Ok((
                    cpal::StreamConfig {
                        channels: ch,
                        sample_rate: cpal::SampleRate(target_rate),
                        buffer_size: cpal::BufferSize::Default,
                    },
                    ch,
                ));
            }
        }
    }
    let default = dev.default_input_config().context("no supported input configuration")?;
    let ch = default.channels();
    Ok((default.config(), ch))
}

fn compatible_output_config(
    dev: &cpal::Device,
    target_rate: u32,
    target_channels: u16,
) -> Result<(cpal::StreamConfig, u16)> {
    if let Ok(ranges) = dev.supported_output_configs() {
        for range in ranges {
            if range.channels() == target_channels
                && range.min_sample_rate().0 <= target_rate
                && range.max_sample_rate().0 >= target_rate
            {
                return Ok((
                    cpal::StreamConfig {
                        channels: target_channels,
                        sample_rate: cpal::SampleRate(target_rate),
                        buffer_size: cpal::BufferSize::Default,
                    },
                    target_channels,
                ));
            }
        }
    }
    if let Ok(ranges) = dev.supported_output_configs() {
        for range in ranges {
            if range.min_sample_rate().0 <= target_rate && range.max_sample_rate().0 >= target_rate {
                let ch = range.channels();
                return Ok((
                    cpal::StreamConfig {
                        channels: ch,
                        sample_rate: cpal::SampleRate(target_rate),
                        buffer_size: cpal::BufferSize::Default,
                    },
                    ch,
                ));
            }
        }
    }
    let default = dev.default_output_config().context("no supported output configuration")?;
    let ch = default.channels();
    Ok((default.config(), ch))
}
