//! Data model shared by every pipeline stage (spec §3).

use serde::{Deserialize, Serialize};

/// A raw RGBA raster, row-major, 4 bytes per pixel. Immutable after creation.
#[derive(Debug, Clone)]
pub struct RasterRGBA {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RasterRGBA {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), 4 * width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> (f32, f32, f32, f32) {
        let idx = 4 * (y as usize * self.width as usize + x as usize);
        (
            self.pixels[idx] as f32 / 255.0,
            self.pixels[idx + 1] as f32 / 255.0,
            self.pixels[idx + 2] as f32 / 255.0,
            self.pixels[idx + 3] as f32 / 255.0,
        )
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One 32-bit float per pixel. Used for value/saturation/hue channels.
#[derive(Debug, Clone)]
pub struct ChannelF32 {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl ChannelF32 {
    pub fn new(width: u32, height: u32, fill: f32) -> Self {
        Self {
            width,
            height,
            data: vec![fill; width as usize * height as usize],
        }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, v: f32) {
        self.data[y as usize * self.width as usize + x as usize] = v;
    }

    /// Clamp (x, y) to the image bounds — replicate-boundary semantics used
    /// by the 3x3 median filters in cleanup and thinning.
    #[inline]
    pub fn get_clamped(&self, x: i32, y: i32) -> f32 {
        let cx = x.clamp(0, self.width as i32 - 1) as u32;
        let cy = y.clamp(0, self.height as i32 - 1) as u32;
        self.get(cx, cy)
    }
}

/// 1 bit per pixel, stored one byte per pixel for simplicity (0 or 1).
/// Bit 1 means foreground / line pixel.
#[derive(Debug, Clone)]
pub struct BinaryImage {
    pub width: u32,
    pub height: u32,
    bits: Vec<bool>,
}

impl BinaryImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    pub fn from_bits(width: u32, height: u32, bits: Vec<bool>) -> Self {
        debug_assert_eq!(bits.len(), width as usize * height as usize);
        Self {
            width,
            height,
            bits,
        }
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn get_signed(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && self.get(x as u32, y as u32)
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, v: bool) {
        self.bits[y as usize * self.width as usize + x as usize] = v;
    }

    pub fn count_set(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn iter_set(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.width;
        self.bits.iter().enumerate().filter_map(move |(i, &b)| {
            if b {
                Some((i as u32 % width, i as u32 / width))
            } else {
                None
            }
        })
    }
}

/// One palette entry: a mapping from an input color to an output color, with
/// a flag marking it as the background slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub input_color: (u8, u8, u8),
    pub output_color: (u8, u8, u8),
    pub map_to_bg: bool,
}

/// An ordered list of up to 16 [`PaletteEntry`] values. Index 0 is always the
/// background. See spec §3 invariants: exactly one background entry, and
/// near-black entries are excluded from nearest-color assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
}

/// Luminosity below this threshold marks a palette entry as "near-black":
/// forbidden as a nearest-color assignment target (spec §3, §4.C).
pub const NEAR_BLACK_LUMINOSITY: f32 = 0.10;

impl Palette {
    /// Builds a palette from entries, enforcing the two invariants named in
    /// spec §3: exactly one background entry, and at most 16 entries total.
    pub fn from_entries(entries: Vec<PaletteEntry>) -> Result<Self, crate::error::VectorizeError> {
        use crate::error::VectorizeError;

        if entries.is_empty() {
            return Err(VectorizeError::InvalidInput {
                detail: "palette must contain at least one entry".into(),
            });
        }
        if entries.len() > 16 {
            return Err(VectorizeError::InvalidInput {
                detail: format!("palette has {} entries, max is 16", entries.len()),
            });
        }
        let bg_count = entries.iter().filter(|e| e.map_to_bg).count();
        if bg_count != 1 {
            return Err(VectorizeError::InvalidInput {
                detail: format!(
                    "palette must have exactly one background entry, found {bg_count}"
                ),
            });
        }
        if !entries[0].map_to_bg {
            return Err(VectorizeError::InvalidInput {
                detail: "palette entry 0 must be the background entry".into(),
            });
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    pub fn background_index(&self) -> usize {
        self.entries
            .iter()
            .position(|e| e.map_to_bg)
            .expect("invariant: exactly one background entry")
    }

    fn luminosity(c: (u8, u8, u8)) -> f32 {
        0.299 * c.0 as f32 / 255.0 + 0.587 * c.1 as f32 / 255.0 + 0.114 * c.2 as f32 / 255.0
    }

    /// Nearest-palette assignment per spec §4.C: squared Euclidean RGB
    /// distance against each entry's expected on-page color
    /// (`input_color`), skipping near-black entries, unless the pixel
    /// itself is near-black (then force background).
    pub fn nearest_index(&self, rgb: (f32, f32, f32)) -> usize {
        let luminosity = 0.299 * rgb.0 + 0.587 * rgb.1 + 0.114 * rgb.2;
        if luminosity < NEAR_BLACK_LUMINOSITY {
            return self.background_index();
        }

        let mut best_index = self.background_index();
        let mut best_dist = f32::INFINITY;
        for (i, entry) in self.entries.iter().enumerate() {
            if Self::luminosity(entry.input_color) < NEAR_BLACK_LUMINOSITY {
                continue;
            }
            let (r, g, b) = (
                entry.input_color.0 as f32 / 255.0,
                entry.input_color.1 as f32 / 255.0,
                entry.input_color.2 as f32 / 255.0,
            );
            let dist = (r - rgb.0).powi(2) + (g - rgb.1).powi(2) + (b - rgb.2).powi(2);
            if dist < best_dist {
                best_dist = dist;
                best_index = i;
            }
        }
        best_index
    }
}

/// W×H, 4 bits per pixel (up to 16 palette indices), plus the palette used to
/// produce it.
#[derive(Debug, Clone)]
pub struct PalettizedImage {
    pub width: u32,
    pub height: u32,
    pub indices: Vec<u8>,
}

impl PalettizedImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            indices: vec![0; width as usize * height as usize],
        }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.indices[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, v: u8) {
        self.indices[y as usize * self.width as usize + x as usize] = v;
    }

    #[inline]
    pub fn get_clamped(&self, x: i32, y: i32) -> u8 {
        let cx = x.clamp(0, self.width as i32 - 1) as u32;
        let cy = y.clamp(0, self.height as i32 - 1) as u32;
        self.get(cx, cy)
    }
}

/// An integer pixel coordinate.
pub type PixelPoint = (i32, i32);

/// A floating point 2D point.
pub type Point2 = (f64, f64);

/// Tracer node: a skeleton pixel whose valid-neighbor count isn't exactly 2.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: usize,
    pub point: PixelPoint,
    pub incident_edges: Vec<usize>,
}

/// Tracer edge: an ordered pixel chain between two nodes (or a closed loop).
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: usize,
    pub ordered_points: Vec<PixelPoint>,
    /// -1 for loop edges with no junctions (matches spec §3's `nodeA = -1`).
    pub node_a: i64,
    pub node_b: i64,
}

impl Edge {
    pub fn is_loop(&self) -> bool {
        self.node_a < 0 && self.node_b < 0
    }
}

/// The traced planar graph: a node arena plus an ordered edge list.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// A fitted infinite line: a point on the line and a unit direction vector.
/// Internal fitting state only — not part of the §6 wire schema, which
/// carries just a segment's `start`/`end`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LineParams {
    pub point: Point2,
    pub direction: Point2,
}

/// A fitted circle/arc: center, radius, and (for arcs) the angular extent.
/// Flattened onto the parent `Segment` variant on the wire (spec §6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcParams {
    pub center: Point2,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    pub clockwise: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CircleParams {
    pub center: Point2,
    pub radius: f64,
}

/// A typed geometric primitive fitted to a contiguous pixel range (spec §3).
/// The wire shape (spec §6) is `{"type":"line"|"arc"|"circle", start, end,
/// ...params}` with `arc`/`circle` params flattened to the top level and no
/// `start`/`end` on circles; `line`/`source_pixels` are fitting-internal and
/// never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Segment {
    Line {
        start: Point2,
        end: Point2,
        #[serde(skip, default)]
        line: LineParams,
        #[serde(skip)]
        source_pixels: Vec<PixelPoint>,
    },
    Arc {
        start: Point2,
        end: Point2,
        #[serde(flatten)]
        arc: ArcParams,
        #[serde(skip)]
        source_pixels: Vec<PixelPoint>,
    },
    Circle {
        #[serde(flatten)]
        circle: CircleParams,
        #[serde(skip)]
        source_pixels: Vec<PixelPoint>,
    },
}

impl Segment {
    pub fn start_point(&self) -> Point2 {
        match self {
            Segment::Line { start, .. } => *start,
            Segment::Arc { start, .. } => *start,
            Segment::Circle { circle, .. } => (circle.center.0 + circle.radius, circle.center.1),
        }
    }

    pub fn end_point(&self) -> Point2 {
        match self {
            Segment::Line { end, .. } => *end,
            Segment::Arc { end, .. } => *end,
            Segment::Circle { circle, .. } => (circle.center.0 + circle.radius, circle.center.1),
        }
    }

    pub fn set_start(&mut self, p: Point2) {
        match self {
            Segment::Line { start, .. } => *start = p,
            Segment::Arc { start, .. } => *start = p,
            Segment::Circle { .. } => {}
        }
    }

    pub fn set_end(&mut self, p: Point2) {
        match self {
            Segment::Line { end, .. } => *end = p,
            Segment::Arc { end, .. } => *end = p,
            Segment::Circle { .. } => {}
        }
    }

    pub fn source_pixels(&self) -> &[PixelPoint] {
        match self {
            Segment::Line { source_pixels, .. } => source_pixels,
            Segment::Arc { source_pixels, .. } => source_pixels,
            Segment::Circle { source_pixels, .. } => source_pixels,
        }
    }
}

/// The optimizer's output for one graph edge.
#[derive(Debug, Clone)]
pub struct SimplifiedEdge {
    pub original: Edge,
    pub segments: Vec<Segment>,
}

/// A renderable path assembled from a simplified edge (spec §4.H).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Path {
    pub points: Vec<PixelPoint>,
    pub closed: bool,
    pub segments: Vec<Segment>,
}

/// One color layer's vectorized output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizedLayer {
    pub width: u32,
    pub height: u32,
    pub color_index: i32,
    pub paths: Vec<Path>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_requires_exactly_one_background() {
        let entries = vec![
            PaletteEntry {
                input_color: (255, 255, 255),
                output_color: (255, 255, 255),
                map_to_bg: true,
            },
            PaletteEntry {
                input_color: (255, 0, 0),
                output_color: (255, 0, 0),
                map_to_bg: true,
            },
        ];
        assert!(Palette::from_entries(entries).is_err());
    }

    #[test]
    fn palette_nearest_index_prefers_closest_non_black() {
        let entries = vec![
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
            PaletteEntry {
                input_color: (0, 0, 255),
                output_color: (0, 0, 255),
                map_to_bg: false,
            },
        ];
        let palette = Palette::from_entries(entries).unwrap();
        assert_eq!(palette.nearest_index((0.9, 0.05, 0.05)), 1);
        assert_eq!(palette.nearest_index((0.05, 0.05, 0.9)), 2);
    }

    #[test]
    fn palette_forces_background_for_near_black_pixel() {
        let entries = vec![
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
        ];
        let palette = Palette::from_entries(entries).unwrap();
        assert_eq!(palette.nearest_index((0.02, 0.0, 0.0)), 0);
    }
}
