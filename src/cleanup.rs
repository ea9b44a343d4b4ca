//! §4.B HSV cleanup: threshold the value channel to a binary line mask,
//! median-filter saturation and hue, and recombine into a denoised RGBA
//! image for palettization.

use rayon::prelude::*;

use crate::channels::HUE_GRAYSCALE;
use crate::types::{BinaryImage, ChannelF32, RasterRGBA};

/// Threshold `value < value_threshold` into a binary mask (1 = line).
pub fn value_mask(value: &ChannelF32, value_threshold: f32) -> BinaryImage {
    let bits: Vec<bool> = value.data.iter().map(|&v| v < value_threshold).collect();
    BinaryImage::from_bits(value.width, value.height, bits)
}

/// 3x3 median filter with replicate-boundary clamping. Runs exactly once in
/// the pipeline on each of saturation and hue.
pub fn median_filter_3x3(channel: &ChannelF32) -> ChannelF32 {
    let width = channel.width;
    let height = channel.height;
    let mut out = vec![0.0f32; width as usize * height as usize];

    out.par_iter_mut().enumerate().for_each(|(i, o)| {
        let x = (i as u32 % width) as i32;
        let y = (i as u32 / width) as i32;
        let mut window = [0.0f32; 9];
        let mut k = 0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                window[k] = channel.get_clamped(x + dx, y + dy);
                k += 1;
            }
        }
        window.sort_by(|a, b| a.partial_cmp(b).unwrap());
        *o = window[4];
    });

    ChannelF32 {
        width,
        height,
        data: out,
    }
}

/// Recombine the value mask with the median-filtered saturation/hue into an
/// opaque RGBA image: white where the mask is background, black where the
/// pixel is effectively achromatic, otherwise full-saturation HSV(hue,1,1).
///
/// This output is what's displayed to the user per spec §4.B and is also,
/// per §4.C, the input to palettization.
pub fn recombine(
    mask: &BinaryImage,
    saturation: &ChannelF32,
    hue: &ChannelF32,
    saturation_delta_sentinel: f32,
) -> RasterRGBA {
    let width = mask.width;
    let height = mask.height;
    let mut pixels = vec![0u8; 4 * width as usize * height as usize];

    pixels
        .par_chunks_mut(4)
        .enumerate()
        .for_each(|(i, px)| {
            let x = i as u32 % width;
            let y = i as u32 / width;

            if !mask.get(x, y) {
                px.copy_from_slice(&[255, 255, 255, 255]);
                return;
            }

            let s = saturation.get(x, y);
            let h = hue.get(x, y);
            if s < saturation_delta_sentinel || h == HUE_GRAYSCALE {
                px.copy_from_slice(&[0, 0, 0, 255]);
                return;
            }

            let (r, g, b) = hsv_to_rgb(h, 1.0, 1.0);
            px[0] = (r * 255.0).round() as u8;
            px[1] = (g * 255.0).round() as u8;
            px[2] = (b * 255.0).round() as u8;
            px[3] = 255;
        });

    RasterRGBA::new(width, height, pixels)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let i = (h * 6.0).floor();
    let f = h * 6.0 - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);
    match (i as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_mask_thresholds_at_half() {
        let mut value = ChannelF32::new(2, 1, 0.0);
        value.set(0, 0, 0.2);
        value.set(1, 0, 0.8);
        let mask = value_mask(&value, 0.5);
        assert!(mask.get(0, 0));
        assert!(!mask.get(1, 0));
    }

    #[test]
    fn median_filter_removes_single_pixel_noise() {
        let mut channel = ChannelF32::new(3, 3, 0.0);
        channel.set(1, 1, 1.0); // lone spike in an otherwise-zero field
        let filtered = median_filter_3x3(&channel);
        assert!((filtered.get(1, 1) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn recombine_background_is_white() {
        let mask = BinaryImage::new(1, 1);
        let saturation = ChannelF32::new(1, 1, 0.0);
        let hue = ChannelF32::new(1, 1, HUE_GRAYSCALE);
        let raster = recombine(&mask, &saturation, &hue, 0.10);
        assert_eq!(raster.pixels, vec![255, 255, 255, 255]);
    }

    #[test]
    fn recombine_grayscale_foreground_is_black() {
        let mut mask = BinaryImage::new(1, 1);
        mask.set(0, 0, true);
        let saturation = ChannelF32::new(1, 1, 0.0);
        let hue = ChannelF32::new(1, 1, HUE_GRAYSCALE);
        let raster = recombine(&mask, &saturation, &hue, 0.10);
        assert_eq!(raster.pixels, vec![0, 0, 0, 255]);
    }

    #[test]
    fn recombine_saturated_foreground_is_hue_colored() {
        let mut mask = BinaryImage::new(1, 1);
        mask.set(0, 0, true);
        let mut saturation = ChannelF32::new(1, 1, 0.0);
        saturation.set(0, 0, 1.0);
        let mut hue = ChannelF32::new(1, 1, 0.0);
        hue.set(0, 0, 0.0); // red
        let raster = recombine(&mask, &saturation, &hue, 0.10);
        assert_eq!(raster.pixels, vec![255, 0, 0, 255]);
    }
}
