// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Generated frames for running without a camera (`--camera stub`).
//!
//! Each frame is a dark background with an orange blob drifting across it and a
//! little per-pixel noise.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use super::source::{Capture, FrameSource};
use crate::error::Result;
use crate::frame::Frame;

pub struct SyntheticSource {
    width: u32,
    height: u32,
    seed: u64,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            seed: 0x5EED,
        }
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

impl FrameSource for SyntheticSource {
    type Capture = SyntheticCapture;

    fn open(&mut self) -> Result<SyntheticCapture> {
        info!("🎥 {} connected (synthetic)", self.describe());
        Ok(SyntheticCapture {
            width: self.width,
            height: self.height,
            frame_count: 0,
            rng: StdRng::seed_from_u64(self.seed),
            open: true,
        })
    }

    fn describe(&self) -> String {
        format!("stub {}x{}", self.width, self.height)
    }
}

pub struct SyntheticCapture {
    width: u32,
    height: u32,
    frame_count: u64,
    rng: StdRng,
    open: bool,
}

impl SyntheticCapture {
    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }
}

impl Capture for SyntheticCapture {
    fn read(&mut self) -> Option<Frame> {
        if !self.open {
            return None;
        }
        self.frame_count = self.frame_count.wrapping_add(1);

        let (w, h) = (self.width, self.height);
        let blob = (w / 6).max(1);
        let cx = (self.frame_count.wrapping_mul(4) % u64::from(w)) as u32;
        let cy = h / 2;

        let mut data = Vec::with_capacity(w as usize * h as usize * 3);
        for y in 0..h {
            for x in 0..w {
                let noise: u8 = self.rng.gen_range(0..8);
                let inside = x.abs_diff(cx) < blob && y.abs_diff(cy) < blob;
                if inside {
                    data.extend_from_slice(&[250 - noise, 120 + noise, 20]);
                } else {
                    data.extend_from_slice(&[20 + noise, 20 + noise, 28 + noise]);
                }
            }
        }
        Frame::from_rgb(w, h, data)
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            info!("📷 synthetic camera released after {} frames", self.frame_count);
        }
    }
}
