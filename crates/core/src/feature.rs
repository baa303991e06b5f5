//! Projected feature model shared across the tiling pipeline.
//!
//! Past the conversion boundary all geometry lives in a normalized
//! web-mercator unit square: x and y in [0, 1], with x extending into a
//! horizontal buffer zone after antimeridian wrapping. Line strings and
//! polygon rings share one representation ([`ProjectedRing`]); the feature
//! kind decides whether a run is treated as open or closed.

use serde::Serialize;
use serde_json::{Map, Value};

/// Opaque feature properties, carried through to every tile untouched.
pub type Properties = Map<String, Value>;

/// Geometry kind of a projected or tiled feature.
///
/// Multi* input variants collapse onto their base kind; the multiplicity
/// lives in the geometry itself (number of points or rings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FeatureKind {
    Point,
    LineString,
    Polygon,
}

/// A point in the projected unit square.
///
/// `keep` is the simplification retention value: 1.0 for run endpoints and
/// synthetic clip vertices, the squared perpendicular distance for interior
/// vertices marked by the simplifier, and 0.0 for unmarked vertices. A
/// vertex survives per-tile thinning when `keep` is at least the tile's
/// squared tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
    pub keep: f64,
}

impl ProjectedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, keep: 0.0 }
    }

    pub fn with_keep(x: f64, y: f64, keep: f64) -> Self {
        Self { x, y, keep }
    }
}

/// An ordered run of projected points: a line string when open, a linear
/// ring (first point equal to last) when the owning feature is a polygon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectedRing {
    pub points: Vec<ProjectedPoint>,
    /// |signed shoelace area| / 2; meaningful for polygon rings only.
    pub area: f64,
    /// Manhattan length of the run; meaningful for line strings only.
    pub dist: f64,
}

impl ProjectedRing {
    /// An open run; computes the Manhattan length over consecutive points.
    pub fn from_line(points: Vec<ProjectedPoint>) -> Self {
        let dist = points
            .windows(2)
            .map(|pair| (pair[1].x - pair[0].x).abs() + (pair[1].y - pair[0].y).abs())
            .sum();
        Self {
            points,
            area: 0.0,
            dist,
        }
    }

    /// A closed run; computes |signed shoelace area| / 2.
    pub fn from_ring(points: Vec<ProjectedPoint>) -> Self {
        let doubled: f64 = points
            .windows(2)
            .map(|pair| pair[0].x * pair[1].y - pair[1].x * pair[0].y)
            .sum();
        Self {
            points,
            area: (doubled / 2.0).abs(),
            dist: 0.0,
        }
    }
}

/// Projected geometry of one feature.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectedGeometry {
    /// A single point or multi-point.
    Points(Vec<ProjectedPoint>),
    /// Line strings (open) or polygon rings (closed); multi-polygons
    /// flatten into one run list.
    Rings(Vec<ProjectedRing>),
}

impl ProjectedGeometry {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Points(points) => points.is_empty(),
            Self::Rings(rings) => rings.is_empty(),
        }
    }
}

/// Axis-aligned bounding box in projected coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Create an empty/invalid bounding box.
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// Check if this is a valid bounding box.
    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    /// Expand this bounding box to include another.
    pub fn expand(&mut self, other: &Self) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// Expand this bounding box to include a point.
    pub fn expand_point(&mut self, point: &ProjectedPoint) {
        self.min_x = self.min_x.min(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_x = self.max_x.max(point.x);
        self.max_y = self.max_y.max(point.y);
    }
}

/// A feature in projected space: geometry, kind, properties, and the cached
/// bounding box the clipper uses for trivial accept/reject.
#[derive(Debug, Clone)]
pub struct ProjectedFeature {
    pub geometry: ProjectedGeometry,
    pub kind: FeatureKind,
    pub properties: Properties,
    pub bounds: Bounds,
}

impl ProjectedFeature {
    /// Create a feature, computing its bounding box from the geometry.
    pub fn new(geometry: ProjectedGeometry, kind: FeatureKind, properties: Properties) -> Self {
        let mut bounds = Bounds::empty();
        match &geometry {
            ProjectedGeometry::Points(points) => {
                for point in points {
                    bounds.expand_point(point);
                }
            }
            ProjectedGeometry::Rings(rings) => {
                for ring in rings {
                    for point in &ring.points {
                        bounds.expand_point(point);
                    }
                }
            }
        }
        Self {
            geometry,
            kind,
            properties,
            bounds,
        }
    }

    /// Shift the feature horizontally by a whole-world offset, bounds
    /// included. Used when duplicating features across the antimeridian.
    pub fn shift_x(&mut self, offset: f64) {
        match &mut self.geometry {
            ProjectedGeometry::Points(points) => {
                for point in points {
                    point.x += offset;
                }
            }
            ProjectedGeometry::Rings(rings) => {
                for ring in rings {
                    for point in &mut ring.points {
                        point.x += offset;
                    }
                }
            }
        }
        self.bounds.min_x += offset;
        self.bounds.max_x += offset;
    }
}

/// An input feature: parsed geometry plus its opaque property map.
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: geo::Geometry<f64>,
    pub properties: Properties,
}

impl Feature {
    pub fn new(geometry: geo::Geometry<f64>, properties: Properties) -> Self {
        Self {
            geometry,
            properties,
        }
    }

    /// A feature with an empty property map.
    pub fn from_geometry(geometry: geo::Geometry<f64>) -> Self {
        Self::new(geometry, Properties::new())
    }
}
