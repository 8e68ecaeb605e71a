pub mod cpal_device;
pub mod device;

pub use device::{CaptureDevice, PlaybackDevice};
