//! CLI for geojson-tiles - slice a GeoJSON file into vector tiles.
//!
//! This is a thin wrapper around the geojson-tiles-core library.

use anyhow::{Context, Result};
use clap::Parser;
use geojson::GeoJson;
use geojson_tiles_core::{features_from_geojson, Options, Tile, Tiler};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "geojson-tiles",
    about = "Slice GeoJSON into a pyramid of pre-clipped vector tiles",
    version
)]
struct Args {
    /// Input GeoJSON file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Tile to print as JSON, addressed as z/x/y (omit to print index
    /// statistics instead)
    #[arg(long, value_name = "Z/X/Y")]
    tile: Option<String>,

    /// Deepest zoom the pyramid will produce
    #[arg(long, default_value = "18")]
    max_zoom: u8,

    /// Deepest zoom to pre-build during indexing
    #[arg(long, default_value = "5")]
    index_max_zoom: u8,

    /// Skip pre-subdivision of tiles with at most this many points
    #[arg(long, default_value = "100000")]
    index_max_points: usize,

    /// Simplification tolerance in tile-extent units at max zoom
    #[arg(long, default_value = "3.0")]
    tolerance: f64,

    /// Tile-local coordinate resolution
    #[arg(long, default_value = "4096")]
    extent: u16,

    /// Tile-local pixels of feature overlap beyond tile edges
    #[arg(long, default_value = "64")]
    buffer: u16,

    /// Subdivide even through full-coverage fill tiles
    #[arg(long)]
    solid_children: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn options(&self) -> Options {
        Options::default()
            .with_max_zoom(self.max_zoom)
            .with_index_max_zoom(self.index_max_zoom)
            .with_index_max_points(self.index_max_points)
            .with_tolerance(self.tolerance)
            .with_extent(self.extent)
            .with_buffer(self.buffer)
            .with_solid_children(self.solid_children)
    }

    fn parse_tile(&self) -> Result<Option<(u8, u32, u32)>> {
        let Some(address) = &self.tile else {
            return Ok(None);
        };
        let parts: Vec<&str> = address.split('/').collect();
        if parts.len() != 3 {
            anyhow::bail!("invalid tile address {address:?}, expected z/x/y");
        }
        let z = parts[0].parse().context("invalid zoom")?;
        let x = parts[1].parse().context("invalid tile x")?;
        let y = parts[2].parse().context("invalid tile y")?;
        Ok(Some((z, x, y)))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let geojson: GeoJson = text.parse().context("failed to parse GeoJSON")?;
    let features = features_from_geojson(&geojson).context("failed to convert features")?;

    log::info!("loaded {} features from {}", features.len(), args.input.display());

    let mut tiler =
        Tiler::new(features, args.options()).context("failed to build tile pyramid")?;

    match args.parse_tile()? {
        Some((z, x, y)) => {
            let tile = tiler
                .get_tile(z, x, y)
                .with_context(|| format!("failed to fetch tile {z}/{x}/{y}"))?;
            println!("{}", serde_json::to_string_pretty(&tile_to_json(tile))?);
        }
        None => {
            println!("tiles generated: {}", tiler.total());
            for (zoom, count) in tiler.stats_by_zoom() {
                println!("    z{zoom}: {count}");
            }
        }
    }

    Ok(())
}

/// Render a tile as JSON: tile-local integer geometry plus carried-through
/// properties and the tile's build statistics.
fn tile_to_json(tile: &Tile) -> serde_json::Value {
    let features: Vec<serde_json::Value> = tile
        .features
        .iter()
        .map(|feature| {
            json!({
                "type": feature.kind,
                "geometry": feature.tile_geometry,
                "properties": feature.properties,
            })
        })
        .collect();

    json!({
        "features": features,
        "numFeatures": tile.num_features,
        "numPoints": tile.num_points,
        "numSimplified": tile.num_simplified,
    })
}
