//! Raster preprocessing: crop non-square input to a centred square, resize
//! to the codec's working side, and mask it to the disc the fan actually
//! displays.

use bytes::Bytes;
use image::{imageops::FilterType, DynamicImage, RgbImage};

use crate::codec::{PixelOrder, RasterFrame};
use crate::error::Result;

/// Crop `image` to a centred square (the shorter of width/height), resize
/// it to `side` pixels, and zero out every pixel outside the inscribed
/// circle. The result is exactly what [`crate::codec::PolarEncoder`]
/// expects as input.
pub fn preprocess(image: &DynamicImage, side: u32) -> Result<RasterFrame> {
    let squared = center_crop_to_square(image);
    let resized = squared.resize_exact(side, side, FilterType::Triangle).to_rgb8();
    let masked = apply_circular_mask(resized);
    RasterFrame::new(side, PixelOrder::Rgb, Bytes::from(masked.into_raw()))
}

fn center_crop_to_square(image: &DynamicImage) -> DynamicImage {
    let (w, h) = (image.width(), image.height());
    let side = w.min(h);
    let x = (w - side) / 2;
    let y = (h - side) / 2;
    image.crop_imm(x, y, side, side)
}

/// Black out every pixel whose centre falls outside the circle inscribed
/// in the (square) image — the fan's rays never sample past `rho = 0.5`,
/// so anything outside that disc would never be displayed anyway; zeroing
/// it here keeps encoder output deterministic regardless of what the
/// camera put in the corners.
fn apply_circular_mask(mut img: RgbImage) -> RgbImage {
    let side = f64::from(img.width());
    let radius = side / 2.0;
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let dx = f64::from(x) + 0.5 - radius;
        let dy = f64::from(y) + 0.5 - radius;
        if dx * dx + dy * dy > radius * radius {
            *pixel = image::Rgb([0, 0, 0]);
        }
    }
    img
}
