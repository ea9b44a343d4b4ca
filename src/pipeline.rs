//! Pipeline orchestration: sequences stages A->H per spec.md §2/§5.
//!
//! Structured logging follows the teacher's narration style in `main()`:
//! a `log::debug!` on each stage's entry/exit with pixel counts and elapsed
//! time, `log::trace!` for iteration-level detail, `log::warn!` when a
//! warning is produced.

use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::assembly;
use crate::black;
use crate::channels;
use crate::cleanup;
use crate::config::Config;
use crate::error::{VectorizeError, Warning};
use crate::geometry;
use crate::layers;
use crate::optimizer;
use crate::palette;
use crate::thinning;
use crate::tracer;
use crate::types::{BinaryImage, Palette, RasterRGBA, SimplifiedEdge, VectorizedLayer};

/// The palette-index used for the extracted-black layer, which bypasses
/// palettization/per-color extraction entirely (spec.md §2, §4.C).
pub const BLACK_LAYER_INDEX: i32 = -1;

/// Per-stage wall-clock duration, returned alongside a page's output when
/// `Config::collect_timings` is set. Ambient profiling hook (SPEC_FULL.md
/// supplemental feature 2), not part of the spec'd external interface.
#[derive(Debug, Clone, Default)]
pub struct StageTimings {
    pub black_extraction: Duration,
    pub channel_decomposition: Duration,
    pub hsv_cleanup: Duration,
    pub palettization: Duration,
    pub color_extraction: Duration,
    pub layer_processing: Duration,
}

fn validate_raster(raster: &RasterRGBA) -> Result<(), VectorizeError> {
    if raster.width == 0 || raster.height == 0 {
        return Err(VectorizeError::InvalidInput {
            detail: format!("raster dimensions must be positive, got {}x{}", raster.width, raster.height),
        });
    }
    let expected = 4 * raster.width as usize * raster.height as usize;
    if raster.pixels.len() != expected {
        return Err(VectorizeError::InvalidInput {
            detail: format!(
                "pixel buffer length {} does not match {}x{}x4 = {}",
                raster.pixels.len(),
                raster.width,
                raster.height,
                expected
            ),
        });
    }
    let pixel_count = raster.width as u64 * raster.height as u64;
    if pixel_count > u32::MAX as u64 {
        return Err(VectorizeError::ResourceExhausted {
            dimension: "pixel count".into(),
            limit: u32::MAX as u64,
        });
    }
    Ok(())
}

fn process_layer(color_index: i32, mask: &BinaryImage, config: &Config) -> (VectorizedLayer, Vec<Warning>) {
    let start = Instant::now();
    let (skeleton, thinning_warning) = thinning::thin(mask, config.thinning_max_iterations, color_index);
    log::debug!(
        "layer {color_index}: thinned {} -> {} foreground pixels",
        mask.count_set(),
        skeleton.count_set()
    );
    if let Some(ref warning) = thinning_warning {
        log::warn!("layer {color_index}: {warning:?}");
    }

    let graph = tracer::trace(&skeleton);
    log::debug!(
        "layer {color_index}: traced {} nodes, {} edges",
        graph.nodes.len(),
        graph.edges.len()
    );

    let simplified: Vec<SimplifiedEdge> = graph.edges.iter().map(|edge| optimizer::optimize_edge(edge, config)).collect();

    let vectorized = assembly::assemble_layer(color_index, mask.width, mask.height, &simplified);
    log::debug!(
        "layer {color_index}: assembled {} paths in {:?}",
        vectorized.paths.len(),
        start.elapsed()
    );

    let warnings = thinning_warning.into_iter().collect();
    (vectorized, warnings)
}

/// Run the full A->H pipeline on one page, also returning per-stage timing
/// diagnostics. See [`vectorize_page`] for the spec'd entry point signature.
pub fn vectorize_page_with_timings(
    raster: &RasterRGBA,
    palette: &Palette,
    config: &Config,
) -> Result<(Vec<VectorizedLayer>, Vec<Warning>, StageTimings), VectorizeError> {
    config.validate()?;
    validate_raster(raster)?;

    let mut timings = StageTimings::default();

    // Black path: direct threshold + bloom dilation, subtracted from the
    // original before it enters the color path (spec.md §2).
    let t0 = Instant::now();
    let black_mask = black::extract_black(raster, config.luminosity_threshold_black);
    let bloom = black::bloom_dilate(&black_mask);
    let color_source = black::subtract_bloom(raster, &bloom);
    timings.black_extraction = t0.elapsed();
    log::debug!(
        "black extraction: {} black pixels in {:?}",
        black_mask.count_set(),
        timings.black_extraction
    );

    // A: channel decomposition.
    let t0 = Instant::now();
    let (value, saturation, hue) = channels::decompose(&color_source, config.saturation_delta_sentinel);
    timings.channel_decomposition = t0.elapsed();
    log::debug!("channel decomposition done in {:?}", timings.channel_decomposition);

    // B: HSV cleanup.
    let t0 = Instant::now();
    let line_mask = cleanup::value_mask(&value, config.value_threshold);
    let saturation_filtered = cleanup::median_filter_3x3(&saturation);
    let hue_filtered = cleanup::median_filter_3x3(&hue);
    let recombined = cleanup::recombine(&line_mask, &saturation_filtered, &hue_filtered, config.saturation_delta_sentinel);
    timings.hsv_cleanup = t0.elapsed();
    log::debug!("HSV cleanup done in {:?}", timings.hsv_cleanup);

    // C: palettization + median cleanup.
    let t0 = Instant::now();
    let palettized = palette::palettize(&recombined, palette);
    let palettized = palette::median_cleanup(&palettized, config.median_passes);
    timings.palettization = t0.elapsed();
    log::debug!("palettization done in {:?}", timings.palettization);

    // D: per-color extraction.
    let t0 = Instant::now();
    let color_layers = layers::extract_color_layers(&palettized, palette);
    timings.color_extraction = t0.elapsed();
    log::debug!(
        "color extraction: {} non-empty layers in {:?}",
        color_layers.len(),
        timings.color_extraction
    );

    // E -> F -> G -> H, stage-level parallel across independent layers
    // (black plus every non-empty color layer).
    let t0 = Instant::now();
    let mut work: Vec<(i32, BinaryImage)> = Vec::with_capacity(color_layers.len() + 1);
    if bloom.count_set() > 0 {
        work.push((BLACK_LAYER_INDEX, bloom));
    }
    for layer in color_layers {
        work.push((layer.color_index as i32, layer.mask));
    }

    let results: Vec<(VectorizedLayer, Vec<Warning>)> =
        work.into_par_iter().map(|(color_index, mask)| process_layer(color_index, &mask, config)).collect();

    let mut vectorized_layers = Vec::with_capacity(results.len());
    let mut warnings = Vec::new();
    for (layer, layer_warnings) in results {
        vectorized_layers.push(layer);
        warnings.extend(layer_warnings);
    }
    let vectorized_layers = assembly::order_layers(vectorized_layers);
    timings.layer_processing = t0.elapsed();
    log::debug!(
        "layer processing: {} layers in {:?}",
        vectorized_layers.len(),
        timings.layer_processing
    );

    Ok((vectorized_layers, warnings, timings))
}

/// Run the full A->H pipeline on one page (spec §7's
/// `Result<(Vec<VectorizedLayer>, Vec<Warning>), VectorizeError>`).
pub fn vectorize_page(
    raster: &RasterRGBA,
    palette: &Palette,
    config: &Config,
) -> Result<(Vec<VectorizedLayer>, Vec<Warning>), VectorizeError> {
    let (layers, warnings, _timings) = vectorize_page_with_timings(raster, palette, config)?;
    Ok((layers, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaletteEntry;

    fn white_palette() -> Palette {
        Palette::from_entries(vec![PaletteEntry {
            input_color: (255, 255, 255),
            output_color: (255, 255, 255),
            map_to_bg: true,
        }])
        .unwrap()
    }

    fn solid_white(w: u32, h: u32) -> RasterRGBA {
        RasterRGBA::new(w, h, vec![255u8; 4 * w as usize * h as usize])
    }

    #[test]
    fn rejects_mismatched_pixel_buffer() {
        let raster = RasterRGBA::new(2, 2, vec![0u8; 3]); // wrong length
        let result = vectorize_page(&raster, &white_palette(), &Config::default());
        assert!(matches!(result, Err(VectorizeError::InvalidInput { .. })));
    }

    #[test]
    fn fully_white_input_yields_zero_paths() {
        let raster = solid_white(20, 5);
        let (layers, warnings) = vectorize_page(&raster, &white_palette(), &Config::default()).unwrap();
        assert!(warnings.is_empty());
        let total_paths: usize = layers.iter().map(|l| l.paths.len()).sum();
        assert_eq!(total_paths, 0);
    }

    #[test]
    fn horizontal_line_scenario_yields_one_line_path() {
        // 20x5, all white except row 2 columns 2..17 black: spec Scenario 1.
        // The black layer entering E is the bloom-dilated mask (3px-tall),
        // which the weighted-median pre-pass smooths and thinning collapses
        // back to a single-pixel-wide skeleton down the middle row.
        let width = 20u32;
        let height = 5u32;
        let mut pixels = vec![255u8; 4 * width as usize * height as usize];
        for x in 2..17u32 {
            let idx = 4 * (2 * width as usize + x as usize);
            pixels[idx..idx + 4].copy_from_slice(&[0, 0, 0, 255]);
        }
        let raster = RasterRGBA::new(width, height, pixels);
        let (layers, _warnings) = vectorize_page(&raster, &white_palette(), &Config::default()).unwrap();

        let black_layer = layers.iter().find(|l| l.color_index == BLACK_LAYER_INDEX).expect("black layer present");
        assert_eq!(black_layer.paths.len(), 1);
        let path = &black_layer.paths[0];
        assert_eq!(path.segments.len(), 1);
        match &path.segments[0] {
            crate::types::Segment::Line { start, end, .. } => {
                assert!(geometry::distance(*start, (2.0, 2.0)) < 2.0);
                assert!(geometry::distance(*end, (16.0, 2.0)) < 2.0);
            }
            other => panic!("expected a line segment, got {other:?}"),
        }
    }
}
