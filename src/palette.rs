//! §4.C (color path): palettization and per-color median cleanup.

use rayon::prelude::*;

use crate::types::{Palette, PalettizedImage, RasterRGBA, NEAR_BLACK_LUMINOSITY};

/// Snap each pixel of the cleanup-recombined image to the nearest palette
/// entry, forcing near-black pixels to the background index.
pub fn palettize(recombined: &RasterRGBA, palette: &Palette) -> PalettizedImage {
    let width = recombined.width;
    let height = recombined.height;
    let indices: Vec<u8> = (0..recombined.len())
        .into_par_iter()
        .map(|i| {
            let x = (i as u32) % width;
            let y = (i as u32) / width;
            let (r, g, b, _a) = recombined.get(x, y);
            palette.nearest_index((r, g, b)) as u8
        })
        .collect();
    PalettizedImage {
        width,
        height,
        indices,
    }
}

/// One pass of the non-standard 3x3 median cleanup described in spec §4.C:
/// replace an isolated-island center with the dominant neighbor color, or a
/// cavity/barnacle center (dominant neighbor appears >= 6 times and differs
/// from center) with the dominant neighbor; otherwise keep center untouched.
///
/// This "do nothing near plausible edges" rule is intentionally conservative
/// (spec §9) — a majority-rule mode filter would destroy thin diagonal lines
/// and sharp corners.
pub fn median_cleanup_pass(image: &PalettizedImage) -> PalettizedImage {
    let width = image.width;
    let height = image.height;
    let indices: Vec<u8> = (0..(width as usize * height as usize))
        .into_par_iter()
        .map(|i| {
            let x = (i as u32 % width) as i32;
            let y = (i as u32 / width) as i32;
            let center = image.get_clamped(x, y);

            let mut counts = [0u32; 16];
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let neighbor = image.get_clamped(x + dx, y + dy);
                    counts[neighbor as usize] += 1;
                }
            }

            let (dominant, max_count) = counts
                .iter()
                .enumerate()
                .max_by_key(|&(_, &count)| count)
                .map(|(idx, &count)| (idx as u8, count))
                .unwrap();

            if counts[center as usize] == 0 {
                // Isolated island: center's color doesn't appear among neighbors.
                dominant
            } else if max_count >= 6 && dominant != center {
                // Cavity/barnacle: a near-unanimous neighbor disagrees with center.
                dominant
            } else {
                center
            }
        })
        .collect();

    PalettizedImage {
        width,
        height,
        indices,
    }
}

/// Run `passes` rounds of [`median_cleanup_pass`].
pub fn median_cleanup(image: &PalettizedImage, passes: u32) -> PalettizedImage {
    let mut current = image.clone();
    for _ in 0..passes {
        current = median_cleanup_pass(&current);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaletteEntry;

    fn white_red_palette() -> Palette {
        Palette::from_entries(vec![
            PaletteEntry {
                input_color: (255, 255, 255),
                output_color: (255, 255, 255),
                map_to_bg: true,
            },
            PaletteEntry {
                input_color: (255, 0, 0),
                output_color: (255, 0, 0),
                map_to_bg: false,
            },
        ])
        .unwrap()
    }

    #[test]
    fn palettize_assigns_nearest_entry() {
        let mut pixels = vec![255u8; 4 * 2];
        pixels[4] = 255;
        pixels[5] = 0;
        pixels[6] = 0;
        let raster = RasterRGBA::new(2, 1, pixels);
        let palette = white_red_palette();
        let palettized = palettize(&raster, &palette);
        assert_eq!(palettized.get(0, 0), 0);
        assert_eq!(palettized.get(1, 0), 1);
    }

    #[test]
    fn median_cleanup_replaces_isolated_island() {
        // A single foreground pixel surrounded entirely by background.
        let mut image = PalettizedImage::new(3, 3);
        image.set(1, 1, 1);
        let cleaned = median_cleanup_pass(&image);
        assert_eq!(cleaned.get(1, 1), 0);
    }

    #[test]
    fn median_cleanup_preserves_plausible_edge() {
        // Half-and-half checkerboard-ish split: no neighbor reaches 6/8, so
        // the center (which does appear among neighbors) is kept.
        let mut image = PalettizedImage::new(3, 3);
        for y in 0..3u32 {
            for x in 0..3u32 {
                if x < 1 {
                    image.set(x, y, 1);
                }
            }
        }
        let before = image.indices.clone();
        let cleaned = median_cleanup_pass(&image);
        assert_eq!(cleaned.indices, before);
    }

    #[test]
    fn median_cleanup_is_idempotent_after_three_passes() {
        let mut image = PalettizedImage::new(5, 5);
        image.set(2, 2, 1);
        image.set(2, 1, 1);
        let three = median_cleanup(&image, 3);
        let four = median_cleanup(&three, 1);
        assert_eq!(three.indices, four.indices);
    }
}
