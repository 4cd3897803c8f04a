// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Detection overlays.
//!
//! [`Annotator::overlays`] plans one box + label per detection; [`Annotator::annotate`]
//! draws the plan onto a copy of the frame so the buffer the display holds is never
//! written to.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::{debug, warn};

use crate::detection::Detection;
use crate::frame::Frame;

pub const BOX_COLOR: [u8; 3] = [255, 0, 0];
pub const LABEL_MARGIN: i32 = 10;

/// One planned overlay primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlay {
    /// Box outline, at least 1x1 and inside the frame.
    pub rect: Rect,
    pub label: &'static str,
    /// Bottom-left of the label: the box's top-left corner moved up by the margin,
    /// clamped into the frame.
    pub anchor: (i32, i32),
}

pub struct Annotator {
    color: [u8; 3],
    thickness: u32,
    margin: i32,
    font: Option<FontVec>,
    scale: PxScale,
}

impl Default for Annotator {
    fn default() -> Self {
        Self {
            color: BOX_COLOR,
            thickness: 2,
            margin: LABEL_MARGIN,
            font: None,
            scale: PxScale::from(22.0),
        }
    }
}

impl Annotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_margin(mut self, margin: i32) -> Self {
        self.margin = margin.max(0);
        self
    }

    pub fn with_thickness(mut self, thickness: u32) -> Self {
        self.thickness = thickness.max(1);
        self
    }

    /// Loads the label font. On failure the annotator keeps drawing filled tags in
    /// place of glyphs and the problem is logged here, once.
    pub fn with_font(mut self, path: &Path) -> Self {
        match std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| FontVec::try_from_vec(bytes).map_err(|e| e.to_string()))
        {
            Ok(font) => {
                debug!("🔤 label font loaded from {}", path.display());
                self.font = Some(font);
            }
            Err(e) => {
                warn!(
                    "⚠️ label font {} unavailable ({}), labels drawn as tags",
                    path.display(),
                    e
                );
                self.font = None;
            }
        }
        self
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn overlays(&self, batch: &[Detection], width: u32, height: u32) -> Vec<Overlay> {
        let max_x = width.saturating_sub(1) as i32;
        let max_y = height.saturating_sub(1) as i32;
        batch
            .iter()
            .map(|d| {
                let d = d.clamped(width, height);
                let (x1, y1, x2, y2) = d.corners();
                let x1 = x1.clamp(0, max_x);
                let y1 = y1.clamp(0, max_y);
                let w = (x2 - x1).max(1) as u32;
                let h = (y2 - y1).max(1) as u32;
                Overlay {
                    rect: Rect::at(x1, y1).of_size(w, h),
                    label: d.label(),
                    anchor: (x1, (y1 - self.margin).clamp(0, max_y)),
                }
            })
            .collect()
    }

    /// Returns an annotated copy; `frame` is left untouched.
    pub fn annotate(&self, frame: &Frame, batch: &[Detection]) -> Frame {
        let (width, height) = (frame.width(), frame.height());
        let mut img = frame.clone().into_image();
        let color = Rgb(self.color);

        for overlay in self.overlays(batch, width, height) {
            self.draw_box(&mut img, overlay.rect, color);
            self.draw_label(&mut img, &overlay, color);
        }

        Frame::from_image(img)
    }

    fn draw_box(&self, img: &mut RgbImage, rect: Rect, color: Rgb<u8>) {
        for inset in 0..self.thickness as i32 {
            let w = rect.width() as i32 - 2 * inset;
            let h = rect.height() as i32 - 2 * inset;
            if w < 1 || h < 1 {
                break;
            }
            let r = Rect::at(rect.left() + inset, rect.top() + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(img, r, color);
        }
    }

    fn draw_label(&self, img: &mut RgbImage, overlay: &Overlay, color: Rgb<u8>) {
        let (x, baseline) = overlay.anchor;
        match &self.font {
            Some(font) => {
                let (_, text_h) = text_size(self.scale, font, overlay.label);
                let top = (baseline - text_h as i32).max(0);
                draw_text_mut(img, color, x, top, self.scale, font, overlay.label);
            }
            None => {
                // glyph-free stand-in roughly the size of the text
                let tag_w = overlay.label.len() as u32 * 8 + 4;
                let tag_h = 12;
                let top = (baseline - tag_h as i32).max(0);
                draw_filled_rect_mut(img, Rect::at(x, top).of_size(tag_w, tag_h), color);
            }
        }
    }
}
