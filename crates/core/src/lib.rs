//! Core library for slicing GeoJSON features into a pyramid of vector tiles.
//!
//! Features expressed in WGS84 longitude/latitude are projected into a
//! normalized web-mercator unit square, simplified with a tolerance-marking
//! Douglas-Peucker pass, duplicated across the antimeridian, and then
//! recursively subdivided into tiles addressed by (z, x, y). Each tile's
//! geometry is clipped to the tile bounds plus a buffer zone and lazily
//! converted to tile-local integer coordinates on request.
//!
//! # Examples
//!
//! ```no_run
//! use geojson_tiles_core::{features_from_geojson, Options, Tiler};
//!
//! let geojson: geojson::GeoJson = std::fs::read_to_string("input.geojson")
//!     .unwrap()
//!     .parse()
//!     .unwrap();
//! let features = features_from_geojson(&geojson).unwrap();
//!
//! let options = Options::default().with_max_zoom(14);
//! let mut tiler = Tiler::new(features, options).unwrap();
//!
//! let tile = tiler.get_tile(5, 10, 10).unwrap();
//! println!("{} features", tile.features.len());
//! ```

use thiserror::Error;

pub mod clip;
pub mod feature;
pub mod io;
pub mod project;
pub mod simplify;
pub mod tile;
pub mod tiler;
pub mod wrap;

pub use feature::{
    Bounds, Feature, FeatureKind, ProjectedFeature, ProjectedGeometry, ProjectedPoint,
    ProjectedRing, Properties,
};
pub use io::features_from_geojson;
pub use tile::{Tile, TileCoord, TileFeature, TileGeometry, TilePoint};
pub use tiler::{tile_id, Tiler};

/// Errors that can occur while building or querying a tile pyramid
#[derive(Error, Debug)]
pub enum Error {
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometry(&'static str),

    #[error("invalid GeoJSON input: {0}")]
    InvalidGeoJson(String),

    #[error("invalid tiler options: {0}")]
    InvalidOptions(String),

    #[error("tile coordinate out of range: {z}/{x}/{y}")]
    TileOutOfRange { z: u8, x: u32, y: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Deepest zoom level the pyramid supports.
///
/// Tile ids and the subdivision work stack are sized for this ceiling; the
/// original mapbox tiling scheme documents the same limit.
pub const MAX_SUPPORTED_ZOOM: u8 = 24;

/// Configuration for pyramid building and drill-down
#[derive(Debug, Clone)]
pub struct Options {
    /// Deepest zoom the pyramid will ever produce; upper bound on drill-down
    pub max_zoom: u8,
    /// Deepest zoom to pre-build during the initial indexing pass
    pub index_max_zoom: u8,
    /// Skip pre-subdivision of tiles with at most this many retained points
    pub index_max_points: usize,
    /// Simplification tolerance in tile-extent units at `max_zoom`
    pub tolerance: f64,
    /// Tile-local coordinate resolution (default: 4096)
    pub extent: u16,
    /// Tile-local pixels of feature overlap beyond tile edges
    pub buffer: u16,
    /// Subdivide even through full-coverage fill tiles
    pub solid_children: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_zoom: 18,
            index_max_zoom: 5,
            index_max_points: 100_000,
            tolerance: 3.0,
            extent: 4096,
            buffer: 64,
            solid_children: false,
        }
    }
}

impl Options {
    /// Set the deepest zoom the pyramid will produce.
    pub fn with_max_zoom(mut self, max_zoom: u8) -> Self {
        self.max_zoom = max_zoom;
        self
    }

    /// Set the deepest zoom of the initial indexing pass.
    pub fn with_index_max_zoom(mut self, index_max_zoom: u8) -> Self {
        self.index_max_zoom = index_max_zoom;
        self
    }

    /// Set the point-count threshold below which indexing stops early.
    pub fn with_index_max_points(mut self, index_max_points: usize) -> Self {
        self.index_max_points = index_max_points;
        self
    }

    /// Set the simplification tolerance, in tile-extent units at `max_zoom`.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the tile extent.
    pub fn with_extent(mut self, extent: u16) -> Self {
        self.extent = extent;
        self
    }

    /// Set the buffer in tile-local pixels.
    pub fn with_buffer(mut self, buffer: u16) -> Self {
        self.buffer = buffer;
        self
    }

    /// Keep subdividing through full-coverage fill tiles.
    pub fn with_solid_children(mut self, solid_children: bool) -> Self {
        self.solid_children = solid_children;
        self
    }

    /// Check that the options describe a buildable pyramid.
    pub fn validate(&self) -> Result<()> {
        if self.max_zoom > MAX_SUPPORTED_ZOOM {
            return Err(Error::InvalidOptions(format!(
                "max_zoom {} exceeds the supported ceiling of {}",
                self.max_zoom, MAX_SUPPORTED_ZOOM
            )));
        }
        if self.index_max_zoom > self.max_zoom {
            return Err(Error::InvalidOptions(format!(
                "index_max_zoom {} exceeds max_zoom {}",
                self.index_max_zoom, self.max_zoom
            )));
        }
        if self.extent == 0 {
            return Err(Error::InvalidOptions("extent must be non-zero".to_string()));
        }
        if u32::from(self.buffer) * 2 >= u32::from(self.extent) {
            return Err(Error::InvalidOptions(format!(
                "buffer {} must be smaller than half the extent {}",
                self.buffer, self.extent
            )));
        }
        if !(self.tolerance >= 0.0) {
            return Err(Error::InvalidOptions(
                "tolerance must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}
