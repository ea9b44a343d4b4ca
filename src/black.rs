//! §4.C (black path): luminosity-threshold black extraction, 3x3 bloom
//! dilation, and subtraction from the original raster before it enters
//! cleanup.

use rayon::prelude::*;

use crate::types::{BinaryImage, RasterRGBA};

/// Threshold `0.299r + 0.587g + 0.114b < threshold` into a binary mask.
pub fn extract_black(raster: &RasterRGBA, luminosity_threshold_black: f32) -> BinaryImage {
    let width = raster.width;
    let height = raster.height;
    let bits: Vec<bool> = (0..raster.len())
        .into_par_iter()
        .map(|i| {
            let x = (i as u32) % width;
            let y = (i as u32) / width;
            let (r, g, b, _a) = raster.get(x, y);
            let luminosity = 0.299 * r + 0.587 * g + 0.114 * b;
            luminosity < luminosity_threshold_black
        })
        .collect();
    BinaryImage::from_bits(width, height, bits)
}

/// 3x3 OR dilation: any of the 9 neighbors (including self) set => result set.
pub fn bloom_dilate(mask: &BinaryImage) -> BinaryImage {
    let width = mask.width;
    let height = mask.height;
    let bits: Vec<bool> = (0..(width as usize * height as usize))
        .into_par_iter()
        .map(|i| {
            let x = (i as u32 % width) as i32;
            let y = (i as u32 / width) as i32;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if mask.get_signed(x + dx, y + dy) {
                        return true;
                    }
                }
            }
            false
        })
        .collect();
    BinaryImage::from_bits(width, height, bits)
}

/// Replace every pixel in `bloom` with opaque white in a copy of `original`.
/// Feeds the HSV cleanup stage so black ink never pollutes hue/saturation
/// statistics of colored lines.
pub fn subtract_bloom(original: &RasterRGBA, bloom: &BinaryImage) -> RasterRGBA {
    let width = original.width;
    let mut pixels = original.pixels.clone();
    pixels
        .par_chunks_mut(4)
        .enumerate()
        .for_each(|(i, px)| {
            let x = i as u32 % width;
            let y = i as u32 / width;
            if bloom.get(x, y) {
                px.copy_from_slice(&[255, 255, 255, 255]);
            }
        });
    RasterRGBA::new(original.width, original.height, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_raster(w: u32, h: u32, rgb: (u8, u8, u8)) -> RasterRGBA {
        let mut pixels = Vec::with_capacity(4 * w as usize * h as usize);
        for _ in 0..(w * h) {
            pixels.extend_from_slice(&[rgb.0, rgb.1, rgb.2, 255]);
        }
        RasterRGBA::new(w, h, pixels)
    }

    #[test]
    fn extract_black_flags_dark_pixels_only() {
        let raster = solid_raster(2, 1, (0, 0, 0));
        let mut pixels = raster.pixels.clone();
        pixels[4..8].copy_from_slice(&[255, 255, 255, 255]);
        let raster = RasterRGBA::new(2, 1, pixels);
        let mask = extract_black(&raster, 0.20);
        assert!(mask.get(0, 0));
        assert!(!mask.get(1, 0));
    }

    #[test]
    fn bloom_dilate_grows_mask_by_one_pixel() {
        let mut mask = BinaryImage::new(3, 3);
        mask.set(1, 1, true);
        let bloom = bloom_dilate(&mask);
        for y in 0..3 {
            for x in 0..3 {
                assert!(bloom.get(x, y), "expected ({x},{y}) to be in bloom");
            }
        }
    }

    #[test]
    fn subtract_bloom_whites_out_masked_pixels() {
        let raster = solid_raster(1, 1, (10, 20, 30));
        let mut bloom = BinaryImage::new(1, 1);
        bloom.set(0, 0, true);
        let result = subtract_bloom(&raster, &bloom);
        assert_eq!(result.pixels, vec![255, 255, 255, 255]);
    }

    #[test]
    fn subtract_bloom_leaves_unmasked_pixels() {
        let raster = solid_raster(1, 1, (10, 20, 30));
        let bloom = BinaryImage::new(1, 1);
        let result = subtract_bloom(&raster, &bloom);
        assert_eq!(result.pixels, vec![10, 20, 30, 255]);
    }
}
