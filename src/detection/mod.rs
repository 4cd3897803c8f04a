// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// Detection system
///
/// - `Detection` / `DetectionBatch`: frame-relative boxes
/// - `Detector`: the seam between the session loop and the model
pub mod types;

pub use types::{Detection, DetectionBatch, FIRE_LABEL};

use crate::error::Result;
use crate::frame::Frame;

/// Given a frame, returns the boxes the model believes contain fire.
///
/// Calls are synchronous and block the calling thread; the session issues one
/// call per tick.
pub trait Detector {
    fn detect(&mut self, frame: &Frame) -> Result<DetectionBatch>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, frame: &Frame) -> Result<DetectionBatch> {
        (**self).detect(frame)
    }
}
