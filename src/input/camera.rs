// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Local camera source over FFmpeg: DirectShow (Windows) / AVFoundation (macOS) /
//! V4L2 (Linux).
//!
//! The FFmpeg pipeline decodes on its own thread and hands RGB frames over a
//! single-slot channel; [`CameraCapture::read`] pulls from it on the session thread.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::{AVMediaType, FfmpegContext, Input};
use tracing::{info, warn};

use super::decode_filter::DecodeFilter;
use super::source::{Capture, FrameSource};
use crate::error::{FireError, Result};
use crate::frame::Frame;

const SUPERVISE_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct CameraConfig {
    pub device_index: usize,
    /// Requested `WIDTHxHEIGHT`; `None` lets the driver negotiate.
    pub video_size: Option<String>,
    pub framerate: Option<u32>,
    /// Attempts before the device is reported unavailable (busy cameras often
    /// succeed on a second try).
    pub open_retries: u32,
    pub open_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            video_size: None,
            framerate: None,
            open_retries: 3,
            open_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_millis(100),
        }
    }
}

pub struct CameraSource {
    config: CameraConfig,
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }

    /// Platform input URL for the device.
    fn format_camera_url(index: usize, name: &str) -> String {
        #[cfg(target_os = "windows")]
        {
            let _ = index;
            format!("video={}", name)
        }
        #[cfg(target_os = "macos")]
        {
            let _ = name;
            format!("{}", index)
        }
        #[cfg(target_os = "linux")]
        {
            let _ = name;
            format!("/dev/video{}", index)
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            let _ = name;
            format!("{}", index)
        }
    }

    fn input_format() -> &'static str {
        #[cfg(target_os = "windows")]
        let format = "dshow";
        #[cfg(target_os = "macos")]
        let format = "avfoundation";
        #[cfg(target_os = "linux")]
        let format = "v4l2";
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        let format = "video4linux2";
        format
    }

    fn device_name(&self) -> Option<String> {
        get_camera_devices()
            .into_iter()
            .find(|(index, _)| *index == self.config.device_index)
            .map(|(_, name)| name)
    }

    fn unavailable(&self, reason: impl Into<String>) -> FireError {
        FireError::DeviceUnavailable {
            device: self.describe(),
            reason: reason.into(),
        }
    }
}

impl FrameSource for CameraSource {
    type Capture = CameraCapture;

    fn open(&mut self) -> Result<CameraCapture> {
        let name = match self.device_name() {
            Some(name) => name,
            None if cfg!(target_os = "windows") => {
                return Err(self.unavailable("no such capture device"));
            }
            None => String::new(),
        };
        let url = Self::format_camera_url(self.config.device_index, &name);
        let format = Self::input_format();
        info!("🎥 opening camera {} (format: {}, input: {})", self.describe(), format, url);

        let mut opts: HashMap<String, String> = HashMap::new();
        if let Some(fps) = self.config.framerate {
            opts.insert("framerate".to_string(), fps.to_string());
        }
        if let Some(size) = &self.config.video_size {
            opts.insert("video_size".to_string(), size.clone());
        }

        let (tx, rx) = crossbeam_channel::bounded(1);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<std::result::Result<(), String>>(1);
        let stop = Arc::new(AtomicBool::new(false));
        let filter = DecodeFilter::new(tx, stop.clone());
        let worker_stop = stop.clone();
        let max_retries = self.config.open_retries.max(1);

        let worker = std::thread::Builder::new()
            .name("camera-decode".to_string())
            .spawn(move || {
                let mut retry_count = 0;
                loop {
                    if worker_stop.load(Ordering::Relaxed) {
                        return;
                    }
                    let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
                    let pipe = pipe.filter("decode", Box::new(filter.clone()));
                    let out = create_null_output().add_frame_pipeline(pipe);

                    let mut input = Input::new(url.as_str()).set_format(format);
                    if !opts.is_empty() {
                        input = input.set_input_opts(opts.clone().into_iter().collect::<Vec<(String, String)>>());
                    }

                    let started = FfmpegContext::builder()
                        .input(input)
                        .filter_desc("format=yuv420p")
                        .output(out)
                        .build()
                        .map_err(|e| e.to_string())
                        .and_then(|ctx| ctx.start().map_err(|e| e.to_string()));

                    match started {
                        Ok(sch) => {
                            let _ = ready_tx.send(Ok(()));
                            if supervise(&worker_stop, || sch.is_ended(), SUPERVISE_POLL) {
                                let _ = sch.wait();
                                info!("📹 camera decode loop finished");
                            } else {
                                sch.abort();
                                info!("📹 camera decode loop aborted");
                            }
                            return;
                        }
                        Err(e) => {
                            retry_count += 1;
                            if retry_count >= max_retries {
                                let _ = ready_tx.send(Err(e));
                                return;
                            }
                            warn!(
                                "⚠️ camera busy or unavailable, retrying in 1s ({}/{}): {}",
                                retry_count, max_retries, e
                            );
                            std::thread::sleep(Duration::from_secs(1));
                        }
                    }
                }
            })
            .map_err(|e| self.unavailable(format!("failed to spawn decode thread: {e}")))?;

        match ready_rx.recv_timeout(self.config.open_timeout) {
            Ok(Ok(())) => {
                info!("✅ camera {} connected", self.describe());
                Ok(CameraCapture {
                    frames: Some(rx),
                    stop,
                    worker: Some(worker),
                    read_timeout: self.config.read_timeout,
                })
            }
            Ok(Err(reason)) => Err(self.unavailable(reason)),
            Err(_) => {
                stop.store(true, Ordering::Relaxed);
                Err(self.unavailable("timed out waiting for the device"))
            }
        }
    }

    fn describe(&self) -> String {
        format!("camera #{}", self.config.device_index)
    }
}

/// An open camera. Dropping it closes the device.
pub struct CameraCapture {
    frames: Option<Receiver<Frame>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    read_timeout: Duration,
}

impl Capture for CameraCapture {
    fn read(&mut self) -> Option<Frame> {
        let rx = self.frames.as_ref()?;
        match rx.recv_timeout(self.read_timeout) {
            Ok(frame) => Some(frame),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    fn close(&mut self) {
        if self.frames.is_none() {
            return;
        }
        self.stop.store(true, Ordering::Relaxed);
        self.frames = None;
        // the worker aborts the pipeline; the device is free once it returns
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("⚠️ camera decode thread panicked");
            }
        }
        info!("📷 camera released");
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        self.close();
    }
}

/// Waits on a running pipeline. Returns `true` if it ended by itself and `false` once
/// `stop` is raised.
fn supervise(stop: &AtomicBool, mut ended: impl FnMut() -> bool, poll: Duration) -> bool {
    loop {
        if ended() {
            return true;
        }
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        std::thread::sleep(poll);
    }
}

/// Available capture devices as `(index, name)`.
pub fn get_camera_devices() -> Vec<(usize, String)> {
    match ez_ffmpeg::device::get_input_video_devices() {
        Ok(devices) => devices.into_iter().enumerate().collect(),
        Err(e) => {
            warn!("⚠️ failed to list capture devices: {}", e);
            vec![]
        }
    }
}
