//! §4.E Zhang–Suen morphological thinning to a 1-pixel-wide skeleton.

use crate::error::Warning;
use crate::types::BinaryImage;

/// N, NE, E, SE, S, SW, W, NW — the standard 8-neighbor cyclic order used
/// both by the weighted pre-pass median and by the Zhang–Suen conditions.
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Weighted 3x3 median pre-pass: corners weight 1, cardinal edges weight 2,
/// center weight 1 (13 samples total); keep the pixel set iff >= 7 of the 13
/// weighted samples are set. Smooths the input mask before thinning so
/// isolated pixels don't survive and staircase artifacts are suppressed.
pub fn weighted_median_prepass(mask: &BinaryImage) -> BinaryImage {
    let width = mask.width;
    let height = mask.height;
    let mut out = BinaryImage::new(width, height);

    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let mut weighted_sum = 0u32;
            // Center, weight 1.
            if mask.get_signed(x, y) {
                weighted_sum += 1;
            }
            // Cardinal neighbors (N, E, S, W), weight 2 each.
            for &(dx, dy) in &[(0, -1), (1, 0), (0, 1), (-1, 0)] {
                if mask.get_signed(x + dx, y + dy) {
                    weighted_sum += 2;
                }
            }
            // Diagonal neighbors (NE, SE, SW, NW), weight 1 each.
            for &(dx, dy) in &[(1, -1), (1, 1), (-1, 1), (-1, -1)] {
                if mask.get_signed(x + dx, y + dy) {
                    weighted_sum += 1;
                }
            }
            out.set(x as u32, y as u32, weighted_sum >= 7);
        }
    }
    out
}

/// The 8 neighbor values P2..P9 in standard order, each 0 or 1.
fn neighbor_values(mask: &BinaryImage, x: i32, y: i32) -> [u8; 8] {
    let mut values = [0u8; 8];
    for (i, &(dx, dy)) in NEIGHBOR_OFFSETS.iter().enumerate() {
        values[i] = mask.get_signed(x + dx, y + dy) as u8;
    }
    values
}

fn foreground_count(neighbors: &[u8; 8]) -> u32 {
    neighbors.iter().map(|&v| v as u32).sum()
}

/// Number of 0->1 transitions in the cyclic sequence P2,P3,...,P9,P2.
fn transition_count(neighbors: &[u8; 8]) -> u32 {
    let mut count = 0;
    for i in 0..8 {
        let a = neighbors[i];
        let b = neighbors[(i + 1) % 8];
        if a == 0 && b == 1 {
            count += 1;
        }
    }
    count
}

fn marked_for_deletion(neighbors: &[u8; 8], pass: u32) -> bool {
    let b = foreground_count(neighbors);
    if !(2..=6).contains(&b) {
        return false;
    }
    if transition_count(neighbors) != 1 {
        return false;
    }
    // P2=idx0, P3=idx1, P4=idx2, P5=idx3, P6=idx4, P7=idx5, P8=idx6, P9=idx7
    let (p2, p4, p6, p8) = (
        neighbors[0] as u32,
        neighbors[2] as u32,
        neighbors[4] as u32,
        neighbors[6] as u32,
    );
    if pass == 0 {
        p2 * p4 * p6 == 0 && p4 * p6 * p8 == 0
    } else {
        p2 * p4 * p8 == 0 && p2 * p6 * p8 == 0
    }
}

/// Run Zhang–Suen thinning to convergence (or the iteration cap). Returns
/// the skeleton and, if the cap was hit without reaching a fixpoint, a
/// [`Warning::NonConvergedThinning`].
pub fn thin(mask: &BinaryImage, max_iterations: u32, color_index: i32) -> (BinaryImage, Option<Warning>) {
    let smoothed = weighted_median_prepass(mask);
    zhang_suen(&smoothed, max_iterations, color_index)
}

/// The Zhang–Suen subiteration loop alone, with no pre-pass. A pixel chain
/// that is already exactly one pixel wide is a fixpoint of this loop on its
/// own (each interior pixel has exactly 2 foreground neighbors adjacent in
/// the cyclic order, so `A(P1) != 1` and it is never marked) — see spec §8
/// property 8. The pre-pass is a separate smoothing step applied once
/// beforehand (spec §4.E) and is not re-entered here.
pub fn zhang_suen(mask: &BinaryImage, max_iterations: u32, color_index: i32) -> (BinaryImage, Option<Warning>) {
    let mut current = mask.clone();
    let width = current.width;
    let height = current.height;

    for iteration in 0..max_iterations {
        let mut total_deleted = 0usize;

        for pass in 0..2u32 {
            let mut to_delete = Vec::new();
            for y in 0..height as i32 {
                for x in 0..width as i32 {
                    if !current.get_signed(x, y) {
                        continue;
                    }
                    let neighbors = neighbor_values(&current, x, y);
                    if marked_for_deletion(&neighbors, pass) {
                        to_delete.push((x as u32, y as u32));
                    }
                }
            }
            total_deleted += to_delete.len();
            for (x, y) in to_delete {
                current.set(x, y, false);
            }
        }

        if total_deleted == 0 {
            return (current, None);
        }
        if iteration + 1 == max_iterations {
            return (
                current,
                Some(Warning::NonConvergedThinning {
                    color_index,
                    iterations: max_iterations,
                }),
            );
        }
    }

    (current, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_thin_skeleton_is_a_no_op() {
        // A single-pixel-wide horizontal stroke: the Zhang-Suen loop itself
        // (no pre-pass) should not remove anything (spec §8 property 8).
        let mut mask = BinaryImage::new(10, 3);
        for x in 2..8 {
            mask.set(x, 1, true);
        }
        let (thinned, warning) = zhang_suen(&mask, 20, 0);
        assert!(warning.is_none());
        for x in 2..8 {
            assert!(thinned.get(x, 1), "expected ({x},1) to remain foreground");
        }
    }

    #[test]
    fn thick_block_thins_to_single_pixel_width() {
        let mut mask = BinaryImage::new(10, 10);
        for y in 3..7 {
            for x in 3..7 {
                mask.set(x, y, true);
            }
        }
        let (thinned, _) = thin(&mask, 20, 0);
        // Every remaining foreground pixel has at most 2 foreground
        // neighbors in a thinned single-pixel-wide skeleton fragment, or is
        // a genuine junction; in particular the result must be strictly
        // smaller than the original solid block.
        assert!(thinned.count_set() < mask.count_set());
        assert!(thinned.count_set() > 0);
    }

    #[test]
    fn weighted_prepass_removes_lone_pixel() {
        let mut mask = BinaryImage::new(5, 5);
        mask.set(2, 2, true);
        let smoothed = weighted_median_prepass(&mask);
        assert!(!smoothed.get(2, 2));
    }
}
