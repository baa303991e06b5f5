//! Tiles: per-tile feature construction and the lazy integer transform.
//!
//! A [`Tile`] owns the simplified projected geometry for one (z, x, y)
//! address, plus the tile-local integer geometry once [`Tile::transform`]
//! has run. Tiles also keep their parent feature set in `source` while they
//! sit on the build frontier, so a later drill-down can resume subdivision
//! from them.

use serde::Serialize;

use crate::feature::{
    Bounds, FeatureKind, ProjectedFeature, ProjectedGeometry, ProjectedPoint, ProjectedRing,
    Properties,
};

/// Tile coordinates: x, y, and zoom level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }
}

/// A point in tile-local integer coordinates, in
/// [-buffer, extent + buffer] on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TilePoint {
    pub x: i16,
    pub y: i16,
}

/// Tile-local geometry of one feature; empty until the owning tile has been
/// transformed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TileGeometry {
    Points(Vec<TilePoint>),
    Rings(Vec<Vec<TilePoint>>),
}

/// A feature belonging to one tile: the simplified projected geometry it
/// was built from, and its tile-local integer geometry after transform.
#[derive(Debug, Clone)]
pub struct TileFeature {
    pub geometry: ProjectedGeometry,
    pub tile_geometry: TileGeometry,
    pub kind: FeatureKind,
    pub properties: Properties,
}

/// One tile of the pyramid
#[derive(Debug, Clone)]
pub struct Tile {
    pub features: Vec<TileFeature>,
    pub x: u32,
    pub y: u32,
    /// 2^z for the tile's zoom level.
    pub z2: u32,
    /// Points walked while building the tile, culled rings included.
    pub num_points: usize,
    /// Points retained after tolerance thinning.
    pub num_simplified: usize,
    /// Input features walked, including ones simplified away.
    pub num_features: usize,
    /// Projected bounding box over the source feature set.
    pub bounds: Bounds,
    /// Parent feature set retained for later drill-down; cleared once the
    /// tile is subdivided.
    pub source: Vec<ProjectedFeature>,
    pub transformed: bool,
}

impl Tile {
    /// The shared sentinel returned for addresses with no geometry.
    pub(crate) fn empty() -> Self {
        Self {
            features: Vec::new(),
            x: 0,
            y: 0,
            z2: 1,
            num_points: 0,
            num_simplified: 0,
            num_features: 0,
            bounds: Bounds::empty(),
            source: Vec::new(),
            transformed: true,
        }
    }

    /// True for the empty-tile sentinel and for tiles whose geometry was
    /// entirely simplified away.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Build the tile at (z2, x, y) from a clipped feature set.
    ///
    /// `tolerance` is the simplification tolerance for this zoom in
    /// projected units; `no_simplify` disables all thinning and culling at
    /// the pyramid's deepest zoom.
    pub fn build(
        features: &[ProjectedFeature],
        z2: u32,
        x: u32,
        y: u32,
        tolerance: f64,
        no_simplify: bool,
    ) -> Self {
        let mut tile = Self {
            features: Vec::new(),
            x,
            y,
            z2,
            num_points: 0,
            num_simplified: 0,
            num_features: 0,
            bounds: Bounds::empty(),
            source: Vec::new(),
            transformed: false,
        };
        for feature in features {
            tile.num_features += 1;
            tile.add_feature(feature, tolerance, no_simplify);
            tile.bounds.expand(&feature.bounds);
        }
        tile
    }

    fn add_feature(&mut self, feature: &ProjectedFeature, tolerance: f64, no_simplify: bool) {
        let sq_tolerance = tolerance * tolerance;
        let geometry = match &feature.geometry {
            ProjectedGeometry::Points(points) => {
                self.num_points += points.len();
                self.num_simplified += points.len();
                ProjectedGeometry::Points(points.clone())
            }
            ProjectedGeometry::Rings(rings) => {
                let closed = feature.kind == FeatureKind::Polygon;
                let mut kept = Vec::new();

                for ring in rings {
                    self.num_points += ring.points.len();

                    // cull runs too small to show up at this tolerance
                    let too_small = !no_simplify
                        && if closed {
                            ring.area < sq_tolerance
                        } else {
                            ring.dist < tolerance
                        };
                    if too_small {
                        continue;
                    }

                    let last = ring.points.len().saturating_sub(1);
                    let mut slim = Vec::with_capacity(ring.points.len());
                    for (i, point) in ring.points.iter().enumerate() {
                        if no_simplify || i == 0 || i == last || point.keep >= sq_tolerance {
                            slim.push(*point);
                        }
                    }

                    // thinning can leave nothing renderable behind
                    let min_len = if closed { 4 } else { 2 };
                    if slim.len() < min_len {
                        continue;
                    }

                    self.num_simplified += slim.len();
                    kept.push(if closed {
                        ProjectedRing {
                            points: slim,
                            area: ring.area,
                            dist: 0.0,
                        }
                    } else {
                        ProjectedRing {
                            points: slim,
                            area: 0.0,
                            dist: ring.dist,
                        }
                    });
                }

                ProjectedGeometry::Rings(kept)
            }
        };

        if !geometry.is_empty() {
            self.features.push(TileFeature {
                tile_geometry: match feature.kind {
                    FeatureKind::Point => TileGeometry::Points(Vec::new()),
                    _ => TileGeometry::Rings(Vec::new()),
                },
                geometry,
                kind: feature.kind,
                properties: feature.properties.clone(),
            });
        }
    }

    /// Lazily fill the tile-local integer geometry of every feature.
    /// Idempotent: runs exactly once per tile.
    pub fn transform(&mut self, extent: u16) {
        if self.transformed {
            return;
        }
        let (z2, tx, ty) = (self.z2, self.x, self.y);
        for feature in &mut self.features {
            feature.tile_geometry = match &feature.geometry {
                ProjectedGeometry::Points(points) => TileGeometry::Points(
                    points
                        .iter()
                        .map(|p| transform_point(p, extent, z2, tx, ty))
                        .collect(),
                ),
                ProjectedGeometry::Rings(rings) => TileGeometry::Rings(
                    rings
                        .iter()
                        .map(|ring| {
                            ring.points
                                .iter()
                                .map(|p| transform_point(p, extent, z2, tx, ty))
                                .collect()
                        })
                        .collect(),
                ),
            };
        }
        self.transformed = true;
    }

    /// Whether the tile's source is a single rectangle covering the whole
    /// tile plus its buffer. Subdividing such a tile would only hand an
    /// identical fill to every descendant.
    pub fn is_clipped_square(&self, extent: u16, buffer: u16) -> bool {
        clipped_square(&self.source, self.z2, self.x, self.y, extent, buffer)
    }
}

/// Project a point from the unit square into tile-local integer
/// coordinates.
pub fn transform_point(p: &ProjectedPoint, extent: u16, z2: u32, tx: u32, ty: u32) -> TilePoint {
    let x = (f64::from(extent) * (p.x * f64::from(z2) - f64::from(tx))).round() as i16;
    let y = (f64::from(extent) * (p.y * f64::from(z2) - f64::from(ty))).round() as i16;
    TilePoint { x, y }
}

/// Clipped-square check over an explicit feature set; see
/// [`Tile::is_clipped_square`].
pub(crate) fn clipped_square(
    features: &[ProjectedFeature],
    z2: u32,
    tx: u32,
    ty: u32,
    extent: u16,
    buffer: u16,
) -> bool {
    if features.len() != 1 {
        return false;
    }
    let feature = &features[0];
    if feature.kind != FeatureKind::Polygon {
        return false;
    }
    let rings = match &feature.geometry {
        ProjectedGeometry::Rings(rings) => rings,
        ProjectedGeometry::Points(_) => return false,
    };
    if rings.len() != 1 {
        return false;
    }
    let ring = &rings[0];
    if ring.points.len() != 5 {
        return false;
    }

    let lo = -i32::from(buffer);
    let hi = i32::from(extent) + i32::from(buffer);
    for point in &ring.points {
        let p = transform_point(point, extent, z2, tx, ty);
        if (i32::from(p.x) != lo && i32::from(p.x) != hi)
            || (i32::from(p.y) != lo && i32::from(p.y) != hi)
        {
            return false;
        }
    }
    true
}
