// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Detector and session settings, tuned through a JSON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{FireError, Result};
use crate::event_log::EXPORT_FILE;

pub const SETTINGS_FILE: &str = "fire_detect.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === detection ===
    pub conf_threshold: f32, // minimum box confidence
    pub iou_threshold: f32,  // NMS IoU
    pub input_size: u32,     // square model input side

    // === session ===
    pub tick_ms: u64,

    // === overlays ===
    pub label_margin: i32,
    pub box_thickness: u32,
    pub font_path: Option<PathBuf>,

    // === paths ===
    pub model: Option<PathBuf>,
    pub export_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            input_size: 640,

            tick_ms: 30,

            label_margin: 10,
            box_thickness: 2,
            font_path: None,

            model: None,
            export_file: PathBuf::from(EXPORT_FILE),
        }
    }
}

impl Settings {
    /// Loads settings from `path`. A missing file is created with defaults; a malformed
    /// one is reported and defaults are used.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str::<Settings>(&json) {
                Ok(settings) => {
                    info!("✅ settings loaded from {}", path.display());
                    settings.sanitized()
                }
                Err(e) => {
                    warn!("⚠️ failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("📝 {} not found, writing defaults", path.display());
                let settings = Self::default();
                if let Err(e) = settings.save(path) {
                    warn!("⚠️ {}", e);
                }
                settings
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| FireError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        fs::write(path, json).map_err(|e| FireError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        info!("💾 settings saved to {}", path.display());
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Pulls out-of-range values back to something the pipeline can run with.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(0.0..=1.0).contains(&self.conf_threshold) {
            warn!("⚠️ conf_threshold {} out of range", self.conf_threshold);
            self.conf_threshold = defaults.conf_threshold;
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            warn!("⚠️ iou_threshold {} out of range", self.iou_threshold);
            self.iou_threshold = defaults.iou_threshold;
        }
        if self.input_size < 32 || self.input_size % 32 != 0 {
            warn!("⚠️ input_size {} is not a positive multiple of 32", self.input_size);
            self.input_size = defaults.input_size;
        }
        self.tick_ms = self.tick_ms.max(1);
        self.box_thickness = self.box_thickness.max(1);
        self.label_margin = self.label_margin.max(0);
        self
    }

    pub fn print_summary(&self) {
        info!(
            "🎛️ conf {:.2} | iou {:.2} | input {} | tick {}ms | export {}",
            self.conf_threshold,
            self.iou_threshold,
            self.input_size,
            self.tick_ms,
            self.export_file.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let settings = Settings::load(&path);
        assert_eq!(settings, Settings::default());
        assert!(path.exists());
        assert_eq!(Settings::load(&path), settings);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{ "conf_threshold": 0.6, "tick_ms": 50 }"#).unwrap();
        let settings = Settings::load(&path);
        assert_eq!(settings.conf_threshold, 0.6);
        assert_eq!(settings.tick(), Duration::from_millis(50));
        assert_eq!(settings.iou_threshold, 0.45);
        assert_eq!(settings.export_file, PathBuf::from("fire_detection_log.xlsx"));
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
        // left as-is for the user to fix
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn out_of_range_values_are_reset() {
        let s = Settings {
            conf_threshold: 3.0,
            input_size: 100,
            tick_ms: 0,
            ..Settings::default()
        }
        .sanitized();
        assert_eq!(s.conf_threshold, 0.25);
        assert_eq!(s.input_size, 640);
        assert_eq!(s.tick_ms, 1);
    }

    #[test]
    fn save_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::default()
            .save(&dir.path().join("nope").join(SETTINGS_FILE))
            .unwrap_err();
        assert!(matches!(err, FireError::Settings { .. }));
    }
}
