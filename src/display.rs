// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::time::Instant;

use tracing::{debug, info};

use crate::frame::Frame;

/// Where annotated frames end up.
pub trait DisplaySink {
    fn show(&mut self, frame: &Frame);
}

impl<K: DisplaySink + ?Sized> DisplaySink for &mut K {
    fn show(&mut self, frame: &Frame) {
        (**self).show(frame)
    }
}

/// Headless sink: counts frames and reports the display rate once per second.
pub struct LogSink {
    shown: u64,
    count: u64,
    last: Instant,
}

impl Default for LogSink {
    fn default() -> Self {
        Self {
            shown: 0,
            count: 0,
            last: Instant::now(),
        }
    }
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> u64 {
        self.shown
    }
}

impl DisplaySink for LogSink {
    fn show(&mut self, frame: &Frame) {
        self.shown += 1;
        self.count += 1;
        debug!("🖼️ frame {} ({}x{})", self.shown, frame.width(), frame.height());

        let elapsed = self.last.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            info!("📺 display {:.1}fps | total {}", self.count as f64 / elapsed, self.shown);
            self.count = 0;
            self.last = Instant::now();
        }
    }
}
