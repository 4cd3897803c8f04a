// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// YOLOv8 detection model: load, letterbox, inference, decode + NMS

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use fast_image_resize as fr;
use ndarray::{s, Array, Array4, ArrayViewD, Axis, IxDyn};
use tracing::{debug, info};

use crate::detection::{Detection, DetectionBatch, Detector};
use crate::error::FireError;
use crate::frame::Frame;
use crate::{non_max_suppression, OrtBackend, OrtConfig, OrtEP};

const CXYWH_OFFSET: usize = 4;

/// Letterbox fill value (YOLO grey).
const PAD_VALUE: f32 = 144.0 / 255.0;

#[derive(Debug, Clone)]
pub struct YOLOv8Config {
    pub model: PathBuf,
    pub ep: OrtEP,
    pub trt_fp16: bool,
    pub input_size: u32,
    pub conf: f32,
    pub iou: f32,
    pub profile: bool,
}

/// YOLOv8 detector exported to ONNX (`yolo export format=onnx`).
pub struct YOLOv8 {
    engine: OrtBackend,
    width: u32,
    height: u32,
    conf: f32,
    iou: f32,
    profile: bool,
}

impl YOLOv8 {
    /// Loads the model once. A missing or malformed artifact is a `ModelLoad` error;
    /// there is no fallback.
    pub fn new(config: YOLOv8Config) -> Result<Self, FireError> {
        if !config.model.is_file() {
            return Err(FireError::model_load(
                &config.model,
                format!("no such file: {}", config.model.display()),
            ));
        }
        let engine = OrtBackend::build(OrtConfig {
            f: config.model.clone(),
            ep: config.ep,
            trt_fp16: config.trt_fp16,
            intra_threads: None,
        })
        .map_err(|e| FireError::model_load(&config.model, e))?;

        let model = Self {
            engine,
            width: config.input_size,
            height: config.input_size,
            conf: config.conf,
            iou: config.iou,
            profile: config.profile,
        };
        model.summary(&config.model);
        Ok(model)
    }

    fn scale_wh(&self, w0: f32, h0: f32, w1: f32, h1: f32) -> (f32, f32, f32) {
        let r = (w1 / w0).min(h1 / h0);
        (r, (w0 * r).round(), (h0 * r).round())
    }

    /// Letterbox: aspect-preserving resize into the top-left corner of a grey canvas.
    pub fn preprocess(&self, x: &Frame) -> Result<Array4<f32>> {
        let (w0, h0) = (x.width() as f32, x.height() as f32);
        let (_, w_new, h_new) = self.scale_wh(w0, h0, self.width as f32, self.height as f32);
        let (w_new, h_new) = ((w_new as u32).max(1), (h_new as u32).max(1));

        let src = fr::images::ImageRef::new(x.width(), x.height(), x.as_bytes(), fr::PixelType::U8x3)
            .context("failed to wrap frame for resize")?;
        let mut dst = fr::images::Image::new(w_new, h_new, fr::PixelType::U8x3);
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear));
        fr::Resizer::new()
            .resize(&src, &mut dst, Some(&options))
            .context("letterbox resize failed")?;

        let mut ys = Array::from_elem(
            (1, 3, self.height as usize, self.width as usize),
            PAD_VALUE,
        );
        let raw = dst.buffer();
        let row = w_new as usize * 3;
        for y in 0..h_new as usize {
            for x in 0..w_new as usize {
                let i = y * row + x * 3;
                ys[[0, 0, y, x]] = raw[i] as f32 / 255.0;
                ys[[0, 1, y, x]] = raw[i + 1] as f32 / 255.0;
                ys[[0, 2, y, x]] = raw[i + 2] as f32 / 255.0;
            }
        }
        Ok(ys)
    }

    pub fn postprocess(
        &self,
        xs: Vec<Array<f32, IxDyn>>,
        width_original: u32,
        height_original: u32,
    ) -> Result<DetectionBatch> {
        let preds = xs.first().context("model produced no outputs")?;
        let ratio = (self.width as f32 / width_original as f32)
            .min(self.height as f32 / height_original as f32);
        let mut data = decode_predictions(
            preds.view(),
            ratio,
            width_original,
            height_original,
            self.conf,
        )?;
        non_max_suppression(&mut data, self.iou);
        Ok(data)
    }

    pub fn run(&mut self, x: &Frame) -> Result<DetectionBatch> {
        let t_pre = Instant::now();
        let xs = self.preprocess(x)?;
        if self.profile {
            debug!("[Model Preprocess]: {:?}", t_pre.elapsed());
        }

        let ys = self.engine.run(xs, self.profile)?;

        let t_post = Instant::now();
        let ys = self.postprocess(ys, x.width(), x.height())?;
        if self.profile {
            debug!("[Model Postprocess]: {:?}", t_post.elapsed());
        }
        Ok(ys)
    }

    fn summary(&self, path: &std::path::Path) {
        info!(
            "✅ model loaded: {} | EP: {:?} | input {}x{} ({}) | conf: {} iou: {}",
            path.display(),
            self.engine.ep(),
            self.width,
            self.height,
            self.engine.input_name(),
            self.conf,
            self.iou,
        );
    }
}

impl Detector for YOLOv8 {
    fn detect(&mut self, frame: &Frame) -> crate::error::Result<DetectionBatch> {
        self.run(frame).map_err(FireError::inference)
    }
}

/// Decodes a raw `[1, 4 + nc, N]` detection head for one image.
///
/// Boxes are rescaled from model input space with `ratio` and clamped to the original
/// frame. Candidates whose best class score is below `conf` are dropped. NMS is left to
/// the caller.
pub fn decode_predictions(
    preds: ArrayViewD<'_, f32>,
    ratio: f32,
    width_original: u32,
    height_original: u32,
    conf: f32,
) -> Result<Vec<Detection>> {
    let shape = preds.shape();
    anyhow::ensure!(
        shape.len() == 3 && shape[1] > CXYWH_OFFSET,
        "unexpected detection head shape {:?}",
        shape
    );
    let nc = shape[1] - CXYWH_OFFSET;

    let mut data = Vec::new();
    let anchor = preds.index_axis(Axis(0), 0);
    for pred in anchor.axis_iter(Axis(1)) {
        let bbox = pred.slice(s![0..CXYWH_OFFSET]);
        let clss = pred.slice(s![CXYWH_OFFSET..CXYWH_OFFSET + nc]);

        let Some((id, &confidence)) = clss
            .iter()
            .enumerate()
            .reduce(|max, x| if x.1 > max.1 { x } else { max })
        else {
            continue;
        };
        if confidence < conf {
            continue;
        }

        let cx = bbox[0] / ratio;
        let cy = bbox[1] / ratio;
        let w = bbox[2] / ratio;
        let h = bbox[3] / ratio;
        data.push(
            Detection::from_xywh(cx - w / 2., cy - h / 2., w, h, confidence, id)
                .clamped(width_original, height_original),
        );
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a `[1, 4 + nc, N]` head from per-candidate rows `[cx, cy, w, h, scores..]`.
    fn head(rows: &[Vec<f32>]) -> Array<f32, IxDyn> {
        let features = rows[0].len();
        let mut a = Array::zeros(IxDyn(&[1, features, rows.len()]));
        for (n, row) in rows.iter().enumerate() {
            for (f, v) in row.iter().enumerate() {
                a[[0, f, n]] = *v;
            }
        }
        a
    }

    #[test]
    fn drops_low_confidence_candidates() {
        let preds = head(&[
            vec![100.0, 100.0, 20.0, 20.0, 0.9],
            vec![300.0, 300.0, 20.0, 20.0, 0.1],
        ]);
        let out = decode_predictions(preds.view(), 1.0, 640, 640, 0.25).unwrap();
        assert_eq!(out.len(), 1);
        let d = out[0];
        assert_eq!((d.x1, d.y1, d.x2, d.y2), (90.0, 90.0, 110.0, 110.0));
    }

    #[test]
    fn rescales_and_clamps_to_original_frame() {
        // 1280x720 frame letterboxed into 640: ratio 0.5
        let preds = head(&[vec![630.0, 350.0, 40.0, 40.0, 0.8]]);
        let out = decode_predictions(preds.view(), 0.5, 1280, 720, 0.25).unwrap();
        let d = out[0];
        assert_eq!((d.x1, d.y1), (1220.0, 660.0));
        assert_eq!((d.x2, d.y2), (1280.0, 720.0));
    }

    #[test]
    fn picks_best_class() {
        let preds = head(&[vec![50.0, 50.0, 10.0, 10.0, 0.3, 0.7]]);
        let out = decode_predictions(preds.view(), 1.0, 640, 640, 0.25).unwrap();
        assert_eq!(out[0].class_id, 1);
        assert!((out[0].confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn rejects_malformed_head() {
        let preds = Array::<f32, _>::zeros(IxDyn(&[1, 4, 10]));
        assert!(decode_predictions(preds.view(), 1.0, 640, 640, 0.25).is_err());
    }

    #[test]
    fn decode_then_nms_merges_overlaps() {
        let preds = head(&[
            vec![100.0, 100.0, 40.0, 40.0, 0.9],
            vec![102.0, 101.0, 40.0, 40.0, 0.6],
            vec![400.0, 400.0, 40.0, 40.0, 0.5],
        ]);
        let mut out = decode_predictions(preds.view(), 1.0, 640, 640, 0.25).unwrap();
        non_max_suppression(&mut out, 0.45);
        assert_eq!(out.len(), 2);
        assert!((out[0].confidence - 0.9).abs() < 1e-6);
    }
}
