// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// Video input system
///
/// - `FrameSource` / `Capture` / `DeviceGuard`: the seam the session pulls frames through
/// - `CameraSource`: local camera via FFmpeg (DirectShow/AVFoundation/V4L2)
/// - `DecodeFilter`: YUV420P → RGB on the FFmpeg decode thread
/// - `SyntheticSource`: generated frames, no hardware needed
pub mod camera;
pub mod decode_filter;
pub mod source;
pub mod synthetic;

pub use camera::{get_camera_devices, CameraCapture, CameraConfig, CameraSource};
pub use decode_filter::DecodeFilter;
pub use source::{Capture, DeviceGuard, FrameSource};
pub use synthetic::{SyntheticCapture, SyntheticSource};
