//! Pixel-level helpers shared by classification and extraction.

use image::{Rgba, RgbaImage, imageops};

/// An axis-aligned pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Builds a rect from its top-left and bottom-right corners.
    pub const fn from_corners(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x: x0, y: y0, width: x1 - x0, height: y1 - y0 }
    }

    /// Crops the rect out of `img`, clamped to the image bounds.
    pub fn crop(&self, img: &RgbaImage) -> RgbaImage {
        let x = self.x.min(img.width());
        let y = self.y.min(img.height());
        let width = self.width.min(img.width() - x);
        let height = self.height.min(img.height() - y);
        imageops::crop_imm(img, x, y, width, height).to_image()
    }
}

/// Sum of absolute per-channel differences over R, G and B. Alpha is
/// ignored. Ranges from 0 to 765.
pub fn color_delta(a: Rgba<u8>, b: Rgba<u8>) -> u32 {
    a[0].abs_diff(b[0]) as u32 + a[1].abs_diff(b[1]) as u32 + a[2].abs_diff(b[2]) as u32
}

/// Likeness factor between two images: 1.0 = identical, 0.0 = maximally
/// different.
///
/// Pixel positions where either side is not fully opaque are left out of
/// both the accumulated difference and the pixel count, so transparent
/// regions in a template never count against a match. With no comparable
/// pixels at all the score is 0.0.
pub fn image_compare(a: &RgbaImage, b: &RgbaImage) -> f64 {
    let width = a.width().min(b.width());
    let height = a.height().min(b.height());

    let mut total = 0u64;
    let mut n = 0u64;
    for y in 0..height {
        for x in 0..width {
            let ca = *a.get_pixel(x, y);
            let cb = *b.get_pixel(x, y);
            if ca[3] == 0xff && cb[3] == 0xff {
                total += color_delta(ca, cb) as u64;
                n += 1;
            }
        }
    }

    if n == 0 {
        return 0.0;
    }
    1.0 - total as f64 / (n * 3 * 0xff) as f64
}

/// Mean color of the pixels with any channel brighter than `floor`, or
/// `None` when nothing crosses it. Alpha is ignored.
pub fn dominant_color(img: &RgbaImage, floor: u8) -> Option<Rgba<u8>> {
    let mut r = 0u32;
    let mut g = 0u32;
    let mut b = 0u32;
    let mut n = 0u32;

    for px in img.pixels() {
        if px[0] > floor || px[1] > floor || px[2] > floor {
            r += px[0] as u32;
            g += px[1] as u32;
            b += px[2] as u32;
            n += 1;
        }
    }

    if n == 0 {
        return None;
    }
    Some(Rgba([(r / n) as u8, (g / n) as u8, (b / n) as u8, 0xff]))
}

/// Crops a `width`×`height` window centered in `img`, insets rounding down.
pub fn middle_crop(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let inset_x = img.width().saturating_sub(width) / 2;
    let inset_y = img.height().saturating_sub(height) / 2;
    imageops::crop_imm(img, inset_x, inset_y, width, height).to_image()
}
