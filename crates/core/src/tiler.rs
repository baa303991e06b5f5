//! The pyramid builder: recursive subdivision into a (z, x, y)-keyed index.
//!
//! Subdivision runs on an explicit LIFO work stack rather than the call
//! stack, since pyramids can reach 24 zoom levels and every frame carries a
//! feature set. Each popped tile is built (or found), then either retained
//! as a frontier leaf with its `source` feature set, or split into four
//! children by two axis-aligned clipping passes. `get_tile` serves indexed
//! tiles directly and drills down from the nearest frontier ancestor for
//! everything else.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use crate::clip::{clip, Axis};
use crate::feature::{Feature, ProjectedFeature};
use crate::project::convert;
use crate::tile::{clipped_square, Tile, TileCoord};
use crate::wrap::wrap;
use crate::{Error, Options, Result};

/// Pack (z, x, y) into a persistent tile id: `(((1 << z) * y + x) * 32) + z`,
/// with z in the low 5 bits.
///
/// Fails for z above 31 or when the packed row index would overflow.
pub fn tile_id(z: u8, x: u32, y: u32) -> Result<u64> {
    if z > 31 {
        return Err(Error::TileOutOfRange { z, x, y });
    }
    (1u64 << z)
        .checked_mul(u64::from(y))
        .and_then(|row| row.checked_add(u64::from(x)))
        .and_then(|cell| cell.checked_mul(32))
        .and_then(|packed| packed.checked_add(u64::from(z)))
        .ok_or(Error::TileOutOfRange { z, x, y })
}

/// Packing for coordinates the tiler generated itself; z is capped at
/// [`crate::MAX_SUPPORTED_ZOOM`], so the arithmetic cannot overflow.
fn pack_id(z: u8, x: u32, y: u32) -> u64 {
    (((1u64 << z) * u64::from(y) + u64::from(x)) * 32) + u64::from(z)
}

/// A tile pyramid over one feature set.
///
/// Construction projects, wraps, and pre-indexes the features down to
/// `index_max_zoom`; [`Tiler::get_tile`] drills further on demand, growing
/// the index as it goes. The index only ever grows; tiles are never
/// removed.
pub struct Tiler {
    options: Options,
    tiles: HashMap<u64, Tile>,
    stats: BTreeMap<u8, usize>,
    total: usize,
    empty: Tile,
}

impl Tiler {
    /// Project, wrap, and pre-index a feature set.
    pub fn new(features: Vec<Feature>, options: Options) -> Result<Self> {
        options.validate()?;

        let z2 = f64::from(1u32 << options.max_zoom);
        let tolerance = options.tolerance / (z2 * f64::from(options.extent));
        let projected = convert(&features, tolerance)?;

        let buffer = f64::from(options.buffer) / f64::from(options.extent);
        let wrapped = wrap(projected, buffer);

        let mut tiler = Self {
            options,
            tiles: HashMap::new(),
            stats: BTreeMap::new(),
            total: 0,
            empty: Tile::empty(),
        };

        if !wrapped.is_empty() {
            tiler.split_tile(wrapped, 0, 0, 0, None);
            if let Some(root) = tiler.tiles.get(&pack_id(0, 0, 0)) {
                log::debug!(
                    "indexed {} tiles; root has {} features, {} points",
                    tiler.total,
                    root.num_features,
                    root.num_points
                );
            }
        }
        Ok(tiler)
    }

    /// Fetch the tile at (z, x, y), drilling down from an indexed ancestor
    /// when needed.
    ///
    /// The x coordinate wraps modulo 2^z, so tiles across the antimeridian
    /// resolve to their in-world twins. Addresses with no geometry, and any
    /// address deeper than `max_zoom`, return the shared empty tile. The
    /// returned tile is transformed into tile-local integer coordinates.
    pub fn get_tile(&mut self, z: u8, x: u32, y: u32) -> Result<&Tile> {
        if z > 31 {
            return Err(Error::TileOutOfRange { z, x, y });
        }
        let z2 = 1u32 << z;
        let x = x % z2;
        if y >= z2 {
            return Err(Error::TileOutOfRange { z, x, y });
        }
        if z > self.options.max_zoom {
            return Ok(&self.empty);
        }

        let id = tile_id(z, x, y)?;
        let resolved = self.resolve(TileCoord::new(x, y, z), id)?;

        let extent = self.options.extent;
        if let Some(rid) = resolved {
            if let Some(tile) = self.tiles.get_mut(&rid) {
                tile.transform(extent);
            }
            if let Some(tile) = self.tiles.get(&rid) {
                return Ok(tile);
            }
        }
        Ok(&self.empty)
    }

    /// Find the id of the tile to serve for `target`: the target itself
    /// once indexed, or a clipped-square ancestor standing in for all of
    /// its descendants. `None` means no geometry reaches the target.
    ///
    /// Every drill-down pass subdivides the found ancestor and clears its
    /// `source`, so the loop walks strictly deeper and terminates.
    fn resolve(&mut self, target: TileCoord, id: u64) -> Result<Option<u64>> {
        loop {
            if self.tiles.contains_key(&id) {
                return Ok(Some(id));
            }

            // nearest ancestor still holding its source feature set
            let mut found = None;
            let (mut z0, mut x0, mut y0) = (target.z, target.x, target.y);
            while z0 > 0 {
                z0 -= 1;
                x0 /= 2;
                y0 /= 2;
                let aid = tile_id(z0, x0, y0)?;
                if let Some(tile) = self.tiles.get(&aid) {
                    if !tile.source.is_empty() {
                        found = Some((aid, z0, x0, y0));
                        break;
                    }
                }
            }

            let Some((aid, z0, x0, y0)) = found else {
                return Ok(None);
            };

            let (square, source) = match self.tiles.get(&aid) {
                Some(tile) => (
                    tile.is_clipped_square(self.options.extent, self.options.buffer),
                    tile.source.clone(),
                ),
                None => return Ok(None),
            };

            // a solid fill is identical in every descendant; serve the
            // ancestor instead of slicing it further
            if !self.options.solid_children && square {
                return Ok(Some(aid));
            }

            log::debug!(
                "drilling down to z{}/{}/{} from z{z0}/{x0}/{y0}",
                target.z,
                target.x,
                target.y
            );
            self.split_tile(source, z0, x0, y0, Some(target));
        }
    }

    /// Subdivide a feature set from (z, x, y) downward.
    ///
    /// With no target this is the index-building pass, bounded by
    /// `index_max_zoom` and `index_max_points`; with a target it drills
    /// along the ancestor path of that tile, stopping at `max_zoom` or at
    /// the target's zoom.
    fn split_tile(
        &mut self,
        features: Vec<ProjectedFeature>,
        z: u8,
        x: u32,
        y: u32,
        target: Option<TileCoord>,
    ) {
        let max_zoom = self.options.max_zoom;
        let extent = f64::from(self.options.extent);
        let base_tolerance = self.options.tolerance;

        let mut stack = vec![(features, z, x, y)];
        while let Some((features, z, x, y)) = stack.pop() {
            let z2 = 1u32 << z;
            let id = pack_id(z, x, y);
            let tile_tolerance = if z == max_zoom {
                0.0
            } else {
                base_tolerance / (f64::from(z2) * extent)
            };

            let tile = match self.tiles.entry(id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let tile = Tile::build(&features, z2, x, y, tile_tolerance, z == max_zoom);
                    log::debug!(
                        "tile z{z}/{x}/{y}: {} features, {} points, {} simplified",
                        tile.num_features,
                        tile.num_points,
                        tile.num_simplified
                    );
                    self.total += 1;
                    *self.stats.entry(z).or_default() += 1;
                    entry.insert(tile)
                }
            };

            // a solid fill propagates identically to every descendant
            let solid = !self.options.solid_children
                && clipped_square(&features, z2, x, y, self.options.extent, self.options.buffer);

            let stop = solid
                || match target {
                    // index pass: bounded depth, and no point slicing
                    // further once a tile is simple enough
                    None => {
                        z == self.options.index_max_zoom
                            || tile.num_points <= self.options.index_max_points
                    }
                    // drill-down: stop at the floor, at the target's zoom,
                    // or off the target's ancestor path
                    Some(t) => {
                        if z == max_zoom || z == t.z {
                            true
                        } else {
                            let shift = t.z - z;
                            x != t.x >> shift || y != t.y >> shift
                        }
                    }
                };

            if stop {
                // keep the source so a later drill-down can resume here
                tile.source = features;
                continue;
            }
            tile.source = Vec::new();

            let k1 = 0.5 * f64::from(self.options.buffer) / extent;
            let k2 = 0.5 - k1;
            let k3 = 0.5 + k1;
            let k4 = 1.0 + k1;
            let scale = f64::from(z2);
            let (fx, fy) = (f64::from(x), f64::from(y));
            let (min_x, max_x) = (tile.bounds.min_x, tile.bounds.max_x);
            let (min_y, max_y) = (tile.bounds.min_y, tile.bounds.max_y);

            let left = clip(&features, scale, fx - k1, fx + k3, Axis::X, min_x, max_x);
            let right = clip(&features, scale, fx + k2, fx + k4, Axis::X, min_x, max_x);

            if !left.is_empty() {
                let tl = clip(&left, scale, fy - k1, fy + k3, Axis::Y, min_y, max_y);
                let bl = clip(&left, scale, fy + k2, fy + k4, Axis::Y, min_y, max_y);
                if !tl.is_empty() {
                    stack.push((tl, z + 1, x * 2, y * 2));
                }
                if !bl.is_empty() {
                    stack.push((bl, z + 1, x * 2, y * 2 + 1));
                }
            }
            if !right.is_empty() {
                let tr = clip(&right, scale, fy - k1, fy + k3, Axis::Y, min_y, max_y);
                let br = clip(&right, scale, fy + k2, fy + k4, Axis::Y, min_y, max_y);
                if !tr.is_empty() {
                    stack.push((tr, z + 1, x * 2 + 1, y * 2));
                }
                if !br.is_empty() {
                    stack.push((br, z + 1, x * 2 + 1, y * 2 + 1));
                }
            }
        }
    }

    /// All tiles materialized so far, keyed by packed id.
    pub fn tiles(&self) -> &HashMap<u64, Tile> {
        &self.tiles
    }

    /// Number of tiles created over the pyramid's lifetime.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Tiles created per zoom level.
    pub fn stats_by_zoom(&self) -> &BTreeMap<u8, usize> {
        &self.stats
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Properties;
    use geo::{line_string, point, polygon};

    fn input(geometry: impl Into<geo::Geometry<f64>>) -> Feature {
        Feature::new(geometry.into(), Properties::new())
    }

    // ========== tile ids ==========

    #[test]
    fn test_tile_id_packing() {
        assert_eq!(tile_id(0, 0, 0).unwrap(), 0);
        // z in the low 5 bits
        assert_eq!(tile_id(1, 0, 0).unwrap(), 1);
        assert_eq!(tile_id(1, 1, 0).unwrap(), 33);
        assert_eq!(tile_id(1, 0, 1).unwrap(), 65);
        assert_eq!(tile_id(2, 3, 1).unwrap(), (4 + 3) * 32 + 2);
    }

    #[test]
    fn test_tile_id_unique_per_coordinate() {
        let mut seen = std::collections::HashSet::new();
        for z in 0..=4u8 {
            for y in 0..(1u32 << z) {
                for x in 0..(1u32 << z) {
                    assert!(seen.insert(tile_id(z, x, y).unwrap()));
                }
            }
        }
    }

    #[test]
    fn test_tile_id_rejects_excessive_zoom() {
        assert!(matches!(
            tile_id(32, 0, 0),
            Err(Error::TileOutOfRange { .. })
        ));
    }

    #[test]
    fn test_tile_id_rejects_overflow() {
        assert!(matches!(
            tile_id(31, u32::MAX, u32::MAX),
            Err(Error::TileOutOfRange { .. })
        ));
    }

    // ========== pyramid basics ==========

    #[test]
    fn test_empty_input_yields_empty_pyramid() {
        let mut tiler = Tiler::new(Vec::new(), Options::default()).unwrap();
        assert_eq!(tiler.total(), 0);
        let tile = tiler.get_tile(0, 0, 0).unwrap();
        assert!(tile.is_empty());
    }

    #[test]
    fn test_root_tile_exists_for_any_feature() {
        let mut tiler = Tiler::new(
            vec![input(point!(x: 12.5, y: 42.1))],
            Options::default(),
        )
        .unwrap();
        let tile = tiler.get_tile(0, 0, 0).unwrap();
        assert_eq!(tile.num_features, 1);
        assert!(tile.transformed);
    }

    #[test]
    fn test_index_respects_max_points_threshold() {
        // a single small feature stops indexing right at the root
        let tiler = Tiler::new(
            vec![input(point!(x: 0.0, y: 0.0))],
            Options::default(),
        )
        .unwrap();
        assert_eq!(tiler.total(), 1);
    }

    #[test]
    fn test_index_subdivides_busy_tiles() {
        // force subdivision by allowing no points per indexed tile
        let line: geo::LineString<f64> = (0..200)
            .map(|i| {
                let t = f64::from(i) / 199.0;
                (t * 300.0 - 150.0, (t * 40.0).sin() * 60.0)
            })
            .collect::<Vec<_>>()
            .into();
        let options = Options::default()
            .with_index_max_zoom(2)
            .with_index_max_points(1);
        let tiler = Tiler::new(vec![input(line)], options).unwrap();

        assert!(tiler.total() > 1);
        assert!(tiler.stats_by_zoom().contains_key(&2));
    }

    #[test]
    fn test_get_tile_validates_coordinates() {
        let mut tiler = Tiler::new(
            vec![input(point!(x: 0.0, y: 0.0))],
            Options::default(),
        )
        .unwrap();
        assert!(matches!(
            tiler.get_tile(32, 0, 0),
            Err(Error::TileOutOfRange { .. })
        ));
        assert!(matches!(
            tiler.get_tile(2, 0, 4),
            Err(Error::TileOutOfRange { .. })
        ));
    }

    #[test]
    fn test_get_tile_beyond_max_zoom_is_empty() {
        let options = Options::default().with_max_zoom(4).with_index_max_zoom(2);
        let mut tiler = Tiler::new(vec![input(point!(x: 0.0, y: 0.0))], options).unwrap();
        let tile = tiler.get_tile(5, 16, 16).unwrap();
        assert!(tile.is_empty());
    }

    #[test]
    fn test_drill_down_creates_missing_tiles() {
        let mut tiler = Tiler::new(
            vec![input(point!(x: 0.1, y: 0.1))],
            Options::default(),
        )
        .unwrap();
        let before = tiler.total();

        // (0.1, 0.1) sits a hair into the north-east quadrant
        let tile = tiler.get_tile(3, 4, 3).unwrap();
        assert_eq!(tile.features.len(), 1);
        assert!(tiler.total() > before, "drill-down should grow the index");
    }

    #[test]
    fn test_missing_region_returns_empty_tile() {
        let mut tiler = Tiler::new(
            vec![input(point!(x: 0.0, y: 0.0))],
            Options::default(),
        )
        .unwrap();
        // far corner of the world, nowhere near the feature
        let tile = tiler.get_tile(6, 0, 0).unwrap();
        assert!(tile.is_empty());
    }

    #[test]
    fn test_antimeridian_x_wraps() {
        let mut tiler = Tiler::new(
            vec![input(point!(x: 45.0, y: 45.0))],
            Options::default(),
        )
        .unwrap();
        let a = tiler.get_tile(2, 2, 1).unwrap().features.len();
        let b = tiler.get_tile(2, 6, 1).unwrap().features.len();
        assert_eq!(a, b);
        assert_eq!(a, 1);
    }

    #[test]
    fn test_source_cleared_on_subdivision() {
        let line: geo::LineString<f64> = (0..100)
            .map(|i| (f64::from(i) * 3.0 - 150.0, f64::from(i % 7) * 8.0))
            .collect::<Vec<_>>()
            .into();
        let options = Options::default()
            .with_index_max_zoom(3)
            .with_index_max_points(1);
        let tiler = Tiler::new(vec![input(line)], options).unwrap();

        for (id, tile) in tiler.tiles() {
            let z = (id & 31) as u8;
            if z < 3 && !tile.source.is_empty() {
                // a frontier leaf below index_max_zoom is only legal when
                // subdivision stopped early (clipped square or too simple)
                assert!(
                    tile.num_points <= 1
                        || tile.is_clipped_square(
                            tiler.options().extent,
                            tiler.options().buffer
                        ),
                    "tile z{z} kept its source but was not a frontier leaf"
                );
            }
        }
    }

    #[test]
    fn test_polygon_pyramid_within_bounds() {
        let mut tiler = Tiler::new(
            vec![input(polygon![
                (x: -20.0, y: -20.0),
                (x: 20.0, y: -20.0),
                (x: 20.0, y: 20.0),
                (x: -20.0, y: 20.0),
                (x: -20.0, y: -20.0),
            ])],
            Options::default(),
        )
        .unwrap();

        let options = tiler.options().clone();
        let lo = -i32::from(options.buffer);
        let hi = i32::from(options.extent) + i32::from(options.buffer);

        for (z, x, y) in [(0u8, 0u32, 0u32), (1, 0, 0), (2, 1, 1), (3, 3, 3)] {
            let tile = tiler.get_tile(z, x, y).unwrap();
            for feature in &tile.features {
                match &feature.tile_geometry {
                    crate::tile::TileGeometry::Points(points) => {
                        for p in points {
                            assert!(i32::from(p.x) >= lo && i32::from(p.x) <= hi);
                            assert!(i32::from(p.y) >= lo && i32::from(p.y) <= hi);
                        }
                    }
                    crate::tile::TileGeometry::Rings(rings) => {
                        for ring in rings {
                            for p in ring {
                                assert!(i32::from(p.x) >= lo && i32::from(p.x) <= hi);
                                assert!(i32::from(p.y) >= lo && i32::from(p.y) <= hi);
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_line_string_survives_subdivision() {
        let mut tiler = Tiler::new(
            vec![input(line_string![
                (x: -60.0, y: 10.0),
                (x: 0.0, y: 15.0),
                (x: 60.0, y: 10.0),
            ])],
            Options::default(),
        )
        .unwrap();
        // the line crosses the whole northern mid-latitudes; both z1 north
        // tiles should carry a slice
        assert!(!tiler.get_tile(1, 0, 0).unwrap().is_empty());
        assert!(!tiler.get_tile(1, 1, 0).unwrap().is_empty());
    }
}
