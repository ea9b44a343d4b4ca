//! §4.H Output assembly: turn each color layer's simplified edges into
//! renderable [`Path`]s, ordered by palette index.

use crate::geometry;
use crate::types::{Path, PixelPoint, SimplifiedEdge, VectorizedLayer};

/// Build one [`Path`] from a simplified edge, or `None` if the optimizer
/// emitted no segments for it (spec §4.G.4's "fewer than 2 pixels" case).
pub fn build_path(simplified: &SimplifiedEdge) -> Option<Path> {
    let first = simplified.segments.first()?;
    let last = simplified.segments.last()?;

    let points: Vec<PixelPoint> = simplified
        .segments
        .iter()
        .flat_map(|s| s.source_pixels().iter().copied())
        .collect();

    let closed = geometry::distance(first.start_point(), last.end_point()) < 1e-4;

    Some(Path {
        points,
        closed,
        segments: simplified.segments.clone(),
    })
}

/// Assemble one color layer's worth of paths from its simplified edges.
pub fn assemble_layer(
    color_index: i32,
    width: u32,
    height: u32,
    simplified_edges: &[SimplifiedEdge],
) -> VectorizedLayer {
    let paths = simplified_edges.iter().filter_map(build_path).collect();
    VectorizedLayer {
        width,
        height,
        color_index,
        paths,
    }
}

/// Sort layers into palette-index order (spec §4.H).
pub fn order_layers(mut layers: Vec<VectorizedLayer>) -> Vec<VectorizedLayer> {
    layers.sort_by_key(|l| l.color_index);
    layers
}
