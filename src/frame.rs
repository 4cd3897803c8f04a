// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use image::RgbImage;

/// Number of interleaved channels in a [`Frame`] (R, G, B).
pub const CHANNELS: usize = 3;

/// One captured image: tightly packed RGB8, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl Frame {
    /// Wraps an RGB8 buffer. Returns `None` when the buffer length does not match
    /// `width * height * 3`.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * CHANNELS {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// A frame filled with a single colour.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * CHANNELS)
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.width as usize * CHANNELS
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = y as usize * self.stride() + x as usize * CHANNELS;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    pub fn into_image(self) -> RgbImage {
        let (w, h) = (self.width, self.height);
        // length checked at construction
        RgbImage::from_raw(w, h, self.data).unwrap_or_else(|| RgbImage::new(w, h))
    }

    pub fn from_image(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }

    /// RGBA copy for texture upload (alpha = 255).
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for px in self.data.chunks_exact(CHANNELS) {
            rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }
        rgba
    }
}
