// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error taxonomy shared by the capture, model, session and export layers.
//!
//! Transient per-cycle problems (a frame that could not be read) are not errors at
//! all: the frame source reports them as `None` and the cycle is skipped.

use std::path::PathBuf;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum FireError {
    /// The camera could not be opened. The session stays idle.
    #[error("camera `{device}` unavailable: {reason}")]
    DeviceUnavailable { device: String, reason: String },

    /// The model artifact is missing or ONNX Runtime rejected it. Fatal at startup.
    #[error("failed to load model {}", path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// A detection call failed mid-cycle.
    #[error("inference failed")]
    Inference(#[source] BoxError),

    /// The detection log could not be written (locked file, unwritable path).
    #[error("failed to export detection log to {}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("settings file {}: {reason}", path.display())]
    Settings { path: PathBuf, reason: String },
}

impl FireError {
    pub fn inference(e: impl Into<BoxError>) -> Self {
        FireError::Inference(e.into())
    }

    pub fn model_load(path: impl Into<PathBuf>, e: impl Into<BoxError>) -> Self {
        FireError::ModelLoad {
            path: path.into(),
            source: e.into(),
        }
    }
}

pub type Result<T, E = FireError> = std::result::Result<T, E>;

/// One-line rendering of an error and its sources, for logs and the status line.
pub fn report(e: &(dyn std::error::Error + 'static)) -> String {
    let mut out = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
