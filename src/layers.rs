//! §4.D Per-color extraction: emit one binary mask per non-background,
//! non-mapped-to-bg palette index that contains at least one pixel.

use rayon::prelude::*;

use crate::types::{BinaryImage, Palette, PalettizedImage};

/// A color layer ready for thinning: its palette index and its mask.
pub struct ColorLayer {
    pub color_index: usize,
    pub mask: BinaryImage,
}

pub fn extract_color_layers(image: &PalettizedImage, palette: &Palette) -> Vec<ColorLayer> {
    let eligible_indices: Vec<usize> = palette
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, entry)| !entry.map_to_bg)
        .map(|(i, _)| i)
        .collect();

    eligible_indices
        .into_par_iter()
        .filter_map(|color_index| {
            let bits: Vec<bool> = image
                .indices
                .iter()
                .map(|&idx| idx as usize == color_index)
                .collect();
            if bits.iter().any(|&b| b) {
                Some(ColorLayer {
                    color_index,
                    mask: BinaryImage::from_bits(image.width, image.height, bits),
                })
            } else {
                None
            }
        })
        .collect()
}
