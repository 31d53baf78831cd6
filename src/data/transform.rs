// ============================================================
// Layer 4 — Image Transforms
// ============================================================
// CLEVR renders are 480x320 PNGs; the model wants 128x128 RGB
// in channel-first f32, scaled to [0, 1].
//
// Train split gets light augmentation: the resized image is
// padded by 8 black pixels on every side and a random 128x128
// window is cropped back out, jittering object positions by up
// to ±8 pixels. Validation images are only resized so that
// evaluation stays deterministic.
//
// Reference: image crate documentation

use std::path::Path;

use anyhow::{Context, Result};
use image::{imageops, imageops::FilterType, RgbImage};
use rand::Rng;

/// Model input edge length in pixels
pub const IMAGE_SIZE: u32 = 128;

/// Border added before the random crop during training
const CROP_PAD: u32 = 8;

/// Load a PNG, resize it, optionally augment it, and return the
/// pixels as a CHW-ordered f32 buffer of length 3 * 128 * 128.
pub fn load_pixels(path: &Path, augment: bool) -> Result<Vec<f32>> {
    let img = image::open(path)
        .with_context(|| format!("Cannot open image '{}'", path.display()))?
        .to_rgb8();

    let resized = imageops::resize(&img, IMAGE_SIZE, IMAGE_SIZE, FilterType::Triangle);
    let image = if augment { pad_random_crop(&resized) } else { resized };

    Ok(to_chw(&image))
}

/// Pad with a black border then crop a random window back to
/// the original size.
fn pad_random_crop(img: &RgbImage) -> RgbImage {
    let padded_size = IMAGE_SIZE + 2 * CROP_PAD;
    let mut canvas = RgbImage::new(padded_size, padded_size);
    imageops::overlay(&mut canvas, img, CROP_PAD as i64, CROP_PAD as i64);

    let mut rng = rand::thread_rng();
    let x = rng.gen_range(0..=2 * CROP_PAD);
    let y = rng.gen_range(0..=2 * CROP_PAD);
    imageops::crop_imm(&canvas, x, y, IMAGE_SIZE, IMAGE_SIZE).to_image()
}

/// HWC u8 → CHW f32 in [0, 1]
fn to_chw(img: &RgbImage) -> Vec<f32> {
    let (w, h) = img.dimensions();
    let mut out = Vec::with_capacity((3 * w * h) as usize);
    for channel in 0..3 {
        for y in 0..h {
            for x in 0..w {
                out.push(img.get_pixel(x, y)[channel] as f32 / 255.0);
            }
        }
    }
    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_chw_layout_and_scaling() {
        let mut img = RgbImage::new(2, 2);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 0]));
        img.put_pixel(0, 1, Rgb([0, 0, 255]));
        img.put_pixel(1, 1, Rgb([255, 255, 255]));

        let chw = to_chw(&img);
        assert_eq!(chw.len(), 3 * 2 * 2);
        // red channel plane comes first, row-major
        assert_eq!(&chw[0..4], &[1.0, 0.0, 0.0, 1.0]);
        // green plane
        assert_eq!(&chw[4..8], &[0.0, 1.0, 0.0, 1.0]);
        // blue plane
        assert_eq!(&chw[8..12], &[0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_random_crop_preserves_size() {
        let img = RgbImage::new(IMAGE_SIZE, IMAGE_SIZE);
        let cropped = pad_random_crop(&img);
        assert_eq!(cropped.dimensions(), (IMAGE_SIZE, IMAGE_SIZE));
    }
}
