// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// Model implementations behind the `Detector` seam
///
/// - **YOLOv8**: load (ONNX Runtime) → letterbox → run → decode + NMS
///
/// ```text
/// Frame → preprocess → NCHW tensor → OrtBackend::run → [1, 4+nc, N] → decode → NMS → DetectionBatch
/// ```
pub mod yolov8;

pub use yolov8::{decode_predictions, YOLOv8, YOLOv8Config};
