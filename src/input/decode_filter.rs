// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Sender, TrySendError};
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::{AVMediaType, Frame};
use tracing::{debug, info, warn};

use crate::frame::Frame as RgbFrame;

/// Largest accepted decode resolution per side.
const MAX_SIDE: u32 = 4096;

/// FFmpeg frame filter: YUV420P → RGB8 [`RgbFrame`] handed to the capture over a
/// single-slot channel.
///
/// When the slot is still occupied the new frame is dropped. Setting `stop` (or
/// dropping the receiver) ends the decode pipeline on the next frame.
#[derive(Clone)]
pub struct DecodeFilter {
    tx: Sender<RgbFrame>,
    stop: Arc<AtomicBool>,
    count: usize,
    last: Instant,
    current_fps: f64,
    dropped_frames: usize,
    total_frames: usize,
}

impl DecodeFilter {
    pub fn new(tx: Sender<RgbFrame>, stop: Arc<AtomicBool>) -> Self {
        Self {
            tx,
            stop,
            count: 0,
            last: Instant::now(),
            current_fps: 0.0,
            dropped_frames: 0,
            total_frames: 0,
        }
    }

    fn drop_frame(&mut self, why: std::fmt::Arguments<'_>) -> Result<Option<Frame>, String> {
        self.dropped_frames += 1;
        if self.total_frames <= 10 {
            warn!("⚠️ dropped frame #{}: {}", self.total_frames, why);
        }
        Ok(None)
    }
}

impl FrameFilter for DecodeFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        info!("✅ camera decode thread started");
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        if self.stop.load(Ordering::Relaxed) {
            return Err("capture closed".to_string());
        }

        unsafe {
            self.total_frames += 1;

            if frame.as_ptr().is_null() || frame.is_empty() || frame.is_corrupt() {
                return self.drop_frame(format_args!("empty or corrupt"));
            }

            let w = (*frame.as_ptr()).width as u32;
            let h = (*frame.as_ptr()).height as u32;
            if w == 0 || h == 0 || w > MAX_SIDE || h > MAX_SIDE {
                return self.drop_frame(format_args!("bad resolution {}x{}", w, h));
            }

            let y_plane = (*frame.as_ptr()).data[0];
            let u_plane = (*frame.as_ptr()).data[1];
            let v_plane = (*frame.as_ptr()).data[2];
            let y_stride = (*frame.as_ptr()).linesize[0] as usize;
            let uv_stride = (*frame.as_ptr()).linesize[1] as usize;

            if y_plane.is_null() || u_plane.is_null() || v_plane.is_null() {
                return self.drop_frame(format_args!("null YUV plane"));
            }
            if y_stride < w as usize || uv_stride < (w as usize).div_ceil(2) {
                return self.drop_frame(format_args!(
                    "bad stride y_stride={} uv_stride={}",
                    y_stride, uv_stride
                ));
            }

            let mut rgb = vec![0u8; w as usize * h as usize * 3];
            yuv420p_to_rgb(
                y_plane,
                u_plane,
                v_plane,
                y_stride,
                uv_stride,
                &mut rgb,
                w as usize,
                h as usize,
            );

            self.count += 1;
            if self.last.elapsed().as_secs_f64() >= 1.0 {
                let elapsed = self.last.elapsed().as_secs_f64();
                self.current_fps = self.count as f64 / elapsed;
                debug!(
                    "📺 decode: {} frames | {:.1}fps | total {} | dropped {}",
                    self.count, self.current_fps, self.total_frames, self.dropped_frames
                );
                self.last = Instant::now();
                self.count = 0;
            }

            let Some(decoded) = RgbFrame::from_rgb(w, h, rgb) else {
                return self.drop_frame(format_args!("buffer size mismatch"));
            };
            match self.tx.try_send(decoded) {
                Ok(()) => {}
                // consumer has not picked up the previous frame yet
                Err(TrySendError::Full(_)) => self.dropped_frames += 1,
                Err(TrySendError::Disconnected(_)) => {
                    return Err("capture closed".to_string());
                }
            }

            Ok(Some(frame))
        }
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        info!("✅ camera decode thread exited");
    }
}

/// BT.601 integer YUV420P → packed RGB.
///
/// # Safety
/// Planes must cover `height` rows at the given strides (chroma at half height).
#[allow(clippy::too_many_arguments)]
#[inline]
unsafe fn yuv420p_to_rgb(
    y_plane: *const u8,
    u_plane: *const u8,
    v_plane: *const u8,
    y_stride: usize,
    uv_stride: usize,
    buffer: &mut [u8],
    width: usize,
    height: usize,
) {
    let mut out_idx = 0;
    for y in 0..height {
        let y_row = y * y_stride;
        let uv_row = (y >> 1) * uv_stride;

        for x in 0..width {
            let y_val = *y_plane.add(y_row + x) as i32;
            let u_val = *u_plane.add(uv_row + (x >> 1)) as i32 - 128;
            let v_val = *v_plane.add(uv_row + (x >> 1)) as i32 - 128;
            let (r, g, b) = yuv_to_rgb(y_val, u_val, v_val);
            buffer[out_idx] = r;
            buffer[out_idx + 1] = g;
            buffer[out_idx + 2] = b;
            out_idx += 3;
        }
    }
}

/// `u` and `v` are already centred on zero.
#[inline]
fn yuv_to_rgb(y: i32, u: i32, v: i32) -> (u8, u8, u8) {
    (
        (y + ((v * 179) >> 7)).clamp(0, 255) as u8,
        (y - ((u * 44) >> 7) - ((v * 91) >> 7)).clamp(0, 255) as u8,
        (y + ((u * 227) >> 7)).clamp(0, 255) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_chroma_is_grey() {
        assert_eq!(yuv_to_rgb(128, 0, 0), (128, 128, 128));
        assert_eq!(yuv_to_rgb(0, 0, 0), (0, 0, 0));
        assert_eq!(yuv_to_rgb(255, 0, 0), (255, 255, 255));
    }

    #[test]
    fn strong_v_is_red() {
        let (r, g, b) = yuv_to_rgb(80, -40, 110);
        assert!(r > 200 && g < 80 && b < 40, "{r} {g} {b}");
    }

    #[test]
    fn converts_a_2x2_block() {
        let y = [16u8, 16, 235, 235];
        let u = [128u8];
        let v = [128u8];
        let mut out = vec![0u8; 12];
        unsafe { yuv420p_to_rgb(y.as_ptr(), u.as_ptr(), v.as_ptr(), 2, 1, &mut out, 2, 2) };
        assert_eq!(&out[0..3], &[16, 16, 16]);
        assert_eq!(&out[9..12], &[235, 235, 235]);
    }
}
