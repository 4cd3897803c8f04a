// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::Parser;

use crate::models::YOLOv8Config;
use crate::settings::{Settings, SETTINGS_FILE};
use crate::OrtEP;

/// Model artifact looked up beside the executable.
pub const MODEL_FILE: &str = "firedetect.onnx";

/// Which camera to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraChoice {
    Device(usize),
    /// Generated frames, no hardware.
    Stub,
}

impl FromStr for CameraChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stub" | "synthetic" => Ok(CameraChoice::Stub),
            other => other
                .parse::<usize>()
                .map(CameraChoice::Device)
                .map_err(|_| format!("expected a device index or `stub`, got `{s}`")),
        }
    }
}

/// Real-time fire detection
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Real-time fire detection", long_about = None)]
pub struct Args {
    /// ONNX model path (default: firedetect.onnx beside the executable)
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Camera device index, or `stub` for generated frames
    #[arg(short, long, default_value = "0")]
    pub camera: CameraChoice,

    /// Requested capture size, e.g. 640x480
    #[arg(long)]
    pub video_size: Option<String>,

    /// Settings file (created with defaults when missing)
    #[arg(long, default_value = SETTINGS_FILE)]
    pub settings: PathBuf,

    /// Run without a window until Ctrl-C
    #[arg(long)]
    pub headless: bool,

    /// List capture devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Detection log export path (overrides the settings file)
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Confidence threshold (overrides the settings file)
    #[arg(long)]
    pub conf: Option<f32>,

    /// Using CUDA EP
    #[arg(long)]
    pub cuda: bool,

    /// Using TensorRT EP
    #[arg(long)]
    pub trt: bool,

    /// Using TensorRT EP (FP16)
    #[arg(long)]
    pub fp16: bool,

    /// device id
    #[arg(long, default_value_t = 0)]
    pub device_id: i32,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log per-stage model timings
    #[arg(long)]
    pub profile: bool,
}

impl Args {
    pub fn ep(&self) -> OrtEP {
        if self.trt {
            OrtEP::Trt(self.device_id)
        } else if self.cuda {
            OrtEP::CUDA(self.device_id)
        } else {
            OrtEP::CPU
        }
    }

    /// CLI flags win over the settings file.
    pub fn apply_overrides(&self, mut settings: Settings) -> Settings {
        if let Some(model) = &self.model {
            settings.model = Some(model.clone());
        }
        if let Some(export) = &self.export {
            settings.export_file = export.clone();
        }
        if let Some(conf) = self.conf {
            settings.conf_threshold = conf;
        }
        settings.sanitized()
    }

    pub fn model_config(&self, settings: &Settings) -> YOLOv8Config {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        YOLOv8Config {
            model: resolve_model_path(settings.model.as_deref(), &exe_dir),
            ep: self.ep(),
            trt_fp16: self.fp16,
            input_size: settings.input_size,
            conf: settings.conf_threshold,
            iou: settings.iou_threshold,
            profile: self.profile,
        }
    }
}

/// Explicit path first; otherwise the first of `<exe>/firedetect.onnx`,
/// `<exe>/models/firedetect.onnx`, `./models/firedetect.onnx` that exists. When none
/// exists the executable-relative path is returned so the load error names it.
pub fn resolve_model_path(explicit: Option<&Path>, exe_dir: &Path) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let beside = exe_dir.join(MODEL_FILE);
    [
        beside.clone(),
        exe_dir.join("models").join(MODEL_FILE),
        Path::new("models").join(MODEL_FILE),
    ]
    .into_iter()
    .find(|p| p.is_file())
    .unwrap_or(beside)
}
