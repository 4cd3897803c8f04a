#![allow(clippy::type_complexity)]
// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod annotate; // 检测框叠加
pub mod app; // 两个前端共用的启动流程
pub mod config; // 命令行参数
pub mod detection; // 检测结果与检测器接口
pub mod display; // 显示输出接口
pub mod error;
pub mod event_log; // 火情事件日志与 xlsx 导出
pub mod frame;
pub mod input; // 视频输入系统
pub mod models; // 模型接口与具体实现
pub mod ort_backend;
pub mod renderer; // macroquad + egui 窗口
pub mod session; // 定时轮询循环
pub mod settings; // JSON 参数文件

pub use crate::annotate::Annotator;
pub use crate::config::Args;
pub use crate::detection::{Detection, DetectionBatch, Detector};
pub use crate::error::{FireError, Result};
pub use crate::event_log::{Alert, EventLog, EventRecord};
pub use crate::frame::Frame;
pub use crate::models::{YOLOv8, YOLOv8Config};
pub use crate::ort_backend::{OrtBackend, OrtConfig, OrtEP};
pub use crate::session::{Cycle, Session, SessionState};

/// Greedy NMS: keeps the highest-confidence box of every overlapping group.
pub fn non_max_suppression(xs: &mut Vec<Detection>, iou_threshold: f32) {
    xs.sort_by(|b1, b2| {
        b2.confidence
            .partial_cmp(&b1.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            let iou = xs[prev_index].iou(&xs[index]);
            if iou > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}
