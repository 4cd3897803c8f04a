// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// Label drawn on every box. The fire model may report several classes
/// (flame, smoke, ...) but all of them are presented as fire.
pub const FIRE_LABEL: &str = "Fire";

/// Detection box in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: usize,
}

/// All detections produced from one frame. Order carries no meaning.
pub type DetectionBatch = Vec<Detection>;

impl Detection {
    /// Corners may be given in any order; they are normalised so that
    /// `x1 <= x2` and `y1 <= y2`.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class_id: usize) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
            confidence,
            class_id,
        }
    }

    pub fn from_xywh(x: f32, y: f32, w: f32, h: f32, confidence: f32, class_id: usize) -> Self {
        Self::new(x, y, x + w, y + h, confidence, class_id)
    }

    /// Clamps all corners into `[0, width] x [0, height]`. NaN coordinates collapse to 0.
    pub fn clamped(self, width: u32, height: u32) -> Self {
        let clamp = |v: f32, max: u32| {
            if v.is_nan() {
                0.0
            } else {
                v.clamp(0.0, max as f32)
            }
        };
        Self::new(
            clamp(self.x1, width),
            clamp(self.y1, height),
            clamp(self.x2, width),
            clamp(self.y2, height),
            self.confidence,
            self.class_id,
        )
    }

    pub fn label(&self) -> &'static str {
        FIRE_LABEL
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn intersection_area(&self, another: &Detection) -> f32 {
        let l = self.x1.max(another.x1);
        let r = self.x2.min(another.x2);
        let t = self.y1.max(another.y1);
        let b = self.y2.min(another.y2);
        (r - l).max(0.) * (b - t).max(0.)
    }

    pub fn union(&self, another: &Detection) -> f32 {
        self.area() + another.area() - self.intersection_area(another)
    }

    pub fn iou(&self, another: &Detection) -> f32 {
        let union = self.union(another);
        if union <= 0.0 {
            return 0.0;
        }
        self.intersection_area(another) / union
    }

    /// Integer pixel corners (truncating), as used for drawing.
    pub fn corners(&self) -> (i32, i32, i32, i32) {
        (self.x1 as i32, self.y1 as i32, self.x2 as i32, self.y2 as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn corners_are_normalised() {
        let d = Detection::new(50.0, 40.0, 10.0, 20.0, 0.9, 0);
        assert_eq!((d.x1, d.y1, d.x2, d.y2), (10.0, 20.0, 50.0, 40.0));
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let d = Detection::new(0.0, 0.0, 10.0, 10.0, 0.5, 0);
        assert!((d.iou(&d) - 1.0).abs() < 1e-6);
        let far = Detection::new(100.0, 100.0, 110.0, 110.0, 0.5, 0);
        assert_eq!(d.iou(&far), 0.0);
    }

    #[test]
    fn degenerate_boxes_have_zero_iou() {
        let p = Detection::new(5.0, 5.0, 5.0, 5.0, 0.5, 0);
        assert_eq!(p.iou(&p), 0.0);
    }

    proptest! {
        #[test]
        fn clamped_boxes_stay_inside_the_frame(
            x1 in -2000.0f32..2000.0,
            y1 in -2000.0f32..2000.0,
            x2 in -2000.0f32..2000.0,
            y2 in -2000.0f32..2000.0,
            w in 1u32..1920,
            h in 1u32..1080,
        ) {
            let d = Detection::new(x1, y1, x2, y2, 0.5, 0).clamped(w, h);
            prop_assert!(d.x1 <= d.x2);
            prop_assert!(d.y1 <= d.y2);
            prop_assert!(d.x1 >= 0.0 && d.x2 <= w as f32);
            prop_assert!(d.y1 >= 0.0 && d.y2 <= h as f32);
        }
    }
}
