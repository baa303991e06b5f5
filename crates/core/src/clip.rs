//! Axis-aligned strip clipping in projected space.
//!
//! The tiler splits a feature set along one axis at a time, so the clipper
//! only ever cuts against a strip `[k1, k2]` perpendicular to the x or y
//! axis. Lines are walked segment by segment, splitting into multiple
//! output slices when a line leaves and re-enters the strip; polygon rings
//! are walked closed and re-sealed against the strip edges. New vertices
//! emitted at strip boundaries interpolate the other axis and are marked as
//! retained at every simplification tolerance.

use crate::feature::{
    Bounds, FeatureKind, ProjectedFeature, ProjectedGeometry, ProjectedPoint, ProjectedRing,
};

/// Clip axis: which coordinate the strip bounds apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// The clipped coordinate of a point.
    #[inline]
    pub fn coord(self, point: &ProjectedPoint) -> f64 {
        match self {
            Axis::X => point.x,
            Axis::Y => point.y,
        }
    }

    /// The (min, max) span of a bounding box along this axis.
    #[inline]
    pub fn span(self, bounds: &Bounds) -> (f64, f64) {
        match self {
            Axis::X => (bounds.min_x, bounds.max_x),
            Axis::Y => (bounds.min_y, bounds.max_y),
        }
    }

    /// Intersection of segment `ab` with the line `axis = k`. The vertex is
    /// synthetic, so it carries the maximum retention mark.
    #[inline]
    pub fn intersect(self, a: &ProjectedPoint, b: &ProjectedPoint, k: f64) -> ProjectedPoint {
        match self {
            Axis::X => {
                let y = (k - a.x) * (b.y - a.y) / (b.x - a.x) + a.y;
                ProjectedPoint::with_keep(k, y, 1.0)
            }
            Axis::Y => {
                let x = (k - a.y) * (b.x - a.x) / (b.y - a.y) + a.x;
                ProjectedPoint::with_keep(x, k, 1.0)
            }
        }
    }
}

/// Clip a feature set to the strip `[k1, k2]` along the given axis.
///
/// `k1` and `k2` are expressed in tile coordinates at the zoom level being
/// split and are divided by `scale` (2^z) to reach projected units; the
/// wrapper passes a scale of 1 to clip directly in projected units.
/// `min_all`/`max_all` are the whole-set bounds along the axis, allowing a
/// trivial accept or reject without touching individual features.
pub fn clip(
    features: &[ProjectedFeature],
    scale: f64,
    k1: f64,
    k2: f64,
    axis: Axis,
    min_all: f64,
    max_all: f64,
) -> Vec<ProjectedFeature> {
    let k1 = k1 / scale;
    let k2 = k2 / scale;

    if min_all >= k1 && max_all <= k2 {
        return features.to_vec();
    }
    if min_all > k2 || max_all < k1 {
        return Vec::new();
    }

    let mut clipped = Vec::new();
    for feature in features {
        let (min, max) = axis.span(&feature.bounds);

        if min >= k1 && max <= k2 {
            clipped.push(feature.clone());
            continue;
        }
        if min > k2 || max < k1 {
            continue;
        }

        let geometry = match &feature.geometry {
            ProjectedGeometry::Points(points) => {
                ProjectedGeometry::Points(clip_points(points, k1, k2, axis))
            }
            ProjectedGeometry::Rings(rings) => ProjectedGeometry::Rings(clip_runs(
                rings,
                k1,
                k2,
                axis,
                feature.kind == FeatureKind::Polygon,
            )),
        };

        if geometry.is_empty() {
            log::trace!("feature clipped away entirely on {axis:?} [{k1}, {k2}]");
            continue;
        }
        clipped.push(ProjectedFeature::new(
            geometry,
            feature.kind,
            feature.properties.clone(),
        ));
    }
    clipped
}

/// Retain the points whose axis coordinate falls inside the strip.
fn clip_points(
    points: &[ProjectedPoint],
    k1: f64,
    k2: f64,
    axis: Axis,
) -> Vec<ProjectedPoint> {
    points
        .iter()
        .filter(|point| {
            let v = axis.coord(point);
            v >= k1 && v <= k2
        })
        .copied()
        .collect()
}

/// Clip open runs (lines) or closed runs (rings) to the strip.
///
/// Open runs flush a slice whenever the line exits the strip and start a
/// fresh one on re-entry. Closed runs accumulate a single slice per input
/// ring and re-close it against the clip edges at the end.
fn clip_runs(
    runs: &[ProjectedRing],
    k1: f64,
    k2: f64,
    axis: Axis,
    closed: bool,
) -> Vec<ProjectedRing> {
    let mut slices = Vec::new();

    for run in runs {
        let points = &run.points;
        if points.len() < 2 {
            continue;
        }

        let mut slice: Vec<ProjectedPoint> = Vec::new();
        for pair in points.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let ak = axis.coord(a);
            let bk = axis.coord(b);

            if ak < k1 {
                if bk > k2 {
                    // ---|-----|-->
                    slice.push(axis.intersect(a, b, k1));
                    slice.push(axis.intersect(a, b, k2));
                    if !closed {
                        flush_slice(&mut slices, &mut slice, closed);
                    }
                } else if bk >= k1 {
                    // ---|-->  |
                    slice.push(axis.intersect(a, b, k1));
                }
            } else if ak > k2 {
                if bk < k1 {
                    // <--|-----|---
                    slice.push(axis.intersect(a, b, k2));
                    slice.push(axis.intersect(a, b, k1));
                    if !closed {
                        flush_slice(&mut slices, &mut slice, closed);
                    }
                } else if bk <= k2 {
                    // |  <--|---
                    slice.push(axis.intersect(a, b, k2));
                }
            } else {
                slice.push(*a);
                if bk < k1 {
                    // <--|---  |
                    slice.push(axis.intersect(a, b, k1));
                    if !closed {
                        flush_slice(&mut slices, &mut slice, closed);
                    }
                } else if bk > k2 {
                    // |  ---|-->
                    slice.push(axis.intersect(a, b, k2));
                    if !closed {
                        flush_slice(&mut slices, &mut slice, closed);
                    }
                }
                // | --> | : both endpoints inside, nothing to emit yet
            }
        }

        // the walk above only ever pushes segment starts; close out the run
        if let Some(last) = points.last() {
            let lk = axis.coord(last);
            if lk >= k1 && lk <= k2 {
                slice.push(*last);
            }
        }

        // re-seal rings whose endpoints were cut apart
        if closed {
            if let (Some(&first), Some(last)) = (slice.first(), slice.last()) {
                if first.x != last.x || first.y != last.y {
                    slice.push(first);
                }
            }
        }

        flush_slice(&mut slices, &mut slice, closed);
    }

    slices
}

/// Move a finished slice into the output, recomputing its length or area.
/// Degenerate slices are dropped: zero-length lines (a single distinct
/// vertex) and rings without three distinct corners (zero area).
fn flush_slice(slices: &mut Vec<ProjectedRing>, slice: &mut Vec<ProjectedPoint>, closed: bool) {
    if closed {
        if slice.len() >= 4 {
            let ring = ProjectedRing::from_ring(std::mem::take(slice));
            if ring.area > 0.0 {
                slices.push(ring);
                return;
            }
        }
    } else if slice.len() >= 2 {
        let line = ProjectedRing::from_line(std::mem::take(slice));
        if line.dist > 0.0 {
            slices.push(line);
            return;
        }
    }
    slice.clear();
}
