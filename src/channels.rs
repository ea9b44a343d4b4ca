//! §4.A Channel decomposition: split an RGBA raster into value, saturation,
//! and hue channels.

use rayon::prelude::*;

use crate::types::{ChannelF32, RasterRGBA};

/// Hue sentinel for grayscale pixels (delta below `saturation_delta_sentinel`).
pub const HUE_GRAYSCALE: f32 = -1.0;

/// Decompose `raster` into (value, saturation, hue) channels.
///
/// `value = min(r, g, b)` — *not* traditional V (see spec §9: this
/// inverts brightness so saturated-color ink clusters with black ink under
/// a single threshold in §4.B).
pub fn decompose(raster: &RasterRGBA, saturation_delta_sentinel: f32) -> (ChannelF32, ChannelF32, ChannelF32) {
    let n = raster.len();
    let mut value = vec![0.0f32; n];
    let mut saturation = vec![0.0f32; n];
    let mut hue = vec![0.0f32; n];

    value
        .par_iter_mut()
        .zip(saturation.par_iter_mut())
        .zip(hue.par_iter_mut())
        .enumerate()
        .for_each(|(i, ((v, s), h))| {
            let x = (i as u32) % raster.width;
            let y = (i as u32) / raster.width;
            let (r, g, b, _a) = raster.get(x, y);
            let mn = r.min(g).min(b);
            let mx = r.max(g).max(b);
            let delta = mx - mn;

            *v = mn;
            *s = delta;
            *h = if delta <= saturation_delta_sentinel {
                HUE_GRAYSCALE
            } else {
                hue_sector(r, g, b, mx, delta)
            };
        });

    (
        ChannelF32 {
            width: raster.width,
            height: raster.height,
            data: value,
        },
        ChannelF32 {
            width: raster.width,
            height: raster.height,
            data: saturation,
        },
        ChannelF32 {
            width: raster.width,
            height: raster.height,
            data: hue,
        },
    )
}

/// Standard six-sector HSV hue computation, normalized into [0, 1).
fn hue_sector(r: f32, g: f32, b: f32, mx: f32, delta: f32) -> f32 {
    let raw = if mx == r {
        ((g - b) / delta) % 6.0
    } else if mx == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    let mut h = raw / 6.0;
    if h < 0.0 {
        h += 1.0;
    }
    h
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
    fn white_pixel_is_grayscale_with_high_value() {
        let raster = solid_raster(2, 2, (255, 255, 255));
        let (value, saturation, hue) = decompose(&raster, 0.10);
        assert!((value.get(0, 0) - 1.0).abs() < 1e-6);
        assert!((saturation.get(0, 0) - 0.0).abs() < 1e-6);
        assert_eq!(hue.get(0, 0), HUE_GRAYSCALE);
    }

    #[test]
    fn saturated_red_has_low_value() {
        // min(r,g,b) for pure red is 0, so it clusters with black ink.
        let raster = solid_raster(1, 1, (255, 0, 0));
        let (value, saturation, hue) = decompose(&raster, 0.10);
        assert!(value.get(0, 0) < 0.01);
        assert!((saturation.get(0, 0) - 1.0).abs() < 1e-4);
        assert!((hue.get(0, 0) - 0.0).abs() < 1e-4);
    }

    #[test]
    fn blue_hue_is_two_thirds() {
        let raster = solid_raster(1, 1, (0, 0, 255));
        let (_, _, hue) = decompose(&raster, 0.10);
        assert!((hue.get(0, 0) - (2.0 / 3.0)).abs() < 1e-3);
    }
}
