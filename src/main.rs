//! CLI demo binary: loads a raster image and a palette, runs the
//! vectorization pipeline, and writes the resulting vector layers as JSON.
//!
//! Not part of the spec'd external interface (§6 delegates rasterization and
//! persistence to a host collaborator) — this is a harness for exercising
//! the library end to end against a file on disk.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::info;

use vectorcore::types::{Palette, PaletteEntry, RasterRGBA};
use vectorcore::{vectorize_page, Config};

#[derive(Parser)]
#[command(name = "vectorcore-cli")]
#[command(about = "Vectorize a rasterized drawing into lines and arcs.", long_about = None)]
struct Args {
    /// Load the input raster (PNG, JPEG, ...) from this FILE.
    #[arg(short = 'i', long = "input", value_name = "FILE", help_heading = "Input/Output")]
    input: PathBuf,

    /// Load the palette (JSON array of {inputColor, outputColor, mapToBg}) from this FILE.
    #[arg(short = 'p', long = "palette", value_name = "FILE", help_heading = "Input/Output")]
    palette: PathBuf,

    /// Write the vectorized layers as JSON to this FILE.
    #[arg(short = 'o', long = "out", value_name = "FILE", help_heading = "Input/Output")]
    out: PathBuf,

    /// Verbosity level (0 = error, 1 = info, 2 = debug).
    #[arg(short = 'v', long = "verbose", value_name = "N", default_value_t = 1, help_heading = "Performance")]
    verbose: u8,
}

#[derive(serde::Deserialize)]
struct PaletteEntryJson {
    input_color: [u8; 3],
    output_color: [u8; 3],
    map_to_bg: bool,
}

fn load_palette(path: &PathBuf) -> Result<Palette, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("reading palette file: {e}"))?;
    let raw: Vec<PaletteEntryJson> = serde_json::from_str(&text).map_err(|e| format!("parsing palette JSON: {e}"))?;
    let entries = raw
        .into_iter()
        .map(|e| PaletteEntry {
            input_color: (e.input_color[0], e.input_color[1], e.input_color[2]),
            output_color: (e.output_color[0], e.output_color[1], e.output_color[2]),
            map_to_bg: e.map_to_bg,
        })
        .collect();
    Palette::from_entries(entries).map_err(|e| format!("invalid palette: {e}"))
}

fn load_raster(path: &PathBuf) -> Result<RasterRGBA, String> {
    let img = image::open(path).map_err(|e| format!("loading image: {e}"))?.to_rgba8();
    let (width, height) = img.dimensions();
    Ok(RasterRGBA::new(width, height, img.into_raw()))
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    info!("Loading raster from {:?}...", args.input);
    let raster = match load_raster(&args.input) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error loading input image: {e}");
            process::exit(1);
        }
    };

    info!("Loading palette from {:?}...", args.palette);
    let palette = match load_palette(&args.palette) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error loading palette: {e}");
            process::exit(1);
        }
    };

    info!("Vectorizing...");
    let (layers, warnings) = match vectorize_page(&raster, &palette, &Config::default()) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error vectorizing page: {e}");
            process::exit(1);
        }
    };
    for warning in &warnings {
        log::warn!("{warning:?}");
    }

    info!("Saving {} layers to {:?}...", layers.len(), args.out);
    let json = match serde_json::to_string_pretty(&layers) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Error serializing output: {e}");
            process::exit(1);
        }
    };
    if let Err(e) = fs::write(&args.out, json) {
        eprintln!("Error writing output file: {e}");
        process::exit(1);
    }
}
