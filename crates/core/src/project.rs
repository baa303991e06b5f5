//! Projection of geographic coordinates into the normalized unit square.
//!
//! Longitude/latitude pairs map onto [0, 1] x [0, 1] via spherical Mercator,
//! with latitude clamped so the poles collapse to y = 0 and y = 1. Projection
//! also computes the per-run metadata the rest of the pipeline relies on:
//! Manhattan length for line strings, shoelace area for polygon rings, and
//! the simplification marks written by [`crate::simplify`].

use std::f64::consts::PI;

use geo::{Geometry, LineString, Polygon};

use crate::feature::{
    Feature, FeatureKind, ProjectedFeature, ProjectedGeometry, ProjectedPoint, ProjectedRing,
};
use crate::simplify::simplify;
use crate::{Error, Result};

/// Project a longitude/latitude pair into the unit square.
///
/// Longitudes outside [-180, 180] land outside [0, 1] on the x axis; the
/// antimeridian wrapper folds them back into the world afterwards.
pub fn project_point(lng: f64, lat: f64) -> ProjectedPoint {
    let sine = (lat * PI / 180.0).sin();
    let x = lng / 360.0 + 0.5;
    let y = (0.5 - 0.25 * ((1.0 + sine) / (1.0 - sine)).ln() / PI).clamp(0.0, 1.0);
    ProjectedPoint::new(x, y)
}

/// Project an open run, computing its Manhattan length and marking it for
/// simplification at the given tolerance.
fn project_line(line: &LineString<f64>, tolerance: f64) -> ProjectedRing {
    let points = line
        .coords()
        .map(|c| project_point(c.x, c.y))
        .collect::<Vec<_>>();
    let mut run = ProjectedRing::from_line(points);
    simplify(&mut run.points, tolerance);
    run
}

/// Project a closed ring, computing its area and marking it for
/// simplification at the given tolerance.
fn project_ring(ring: &LineString<f64>, tolerance: f64) -> ProjectedRing {
    let points = ring
        .coords()
        .map(|c| project_point(c.x, c.y))
        .collect::<Vec<_>>();
    let mut run = ProjectedRing::from_ring(points);
    simplify(&mut run.points, tolerance);
    run
}

fn project_polygon(polygon: &Polygon<f64>, tolerance: f64) -> Vec<ProjectedRing> {
    let mut rings = Vec::with_capacity(1 + polygon.interiors().len());
    rings.push(project_ring(polygon.exterior(), tolerance));
    for interior in polygon.interiors() {
        rings.push(project_ring(interior, tolerance));
    }
    rings
}

/// Convert a set of input features into projected features.
///
/// The tolerance is the simplification tolerance in projected units at the
/// pyramid's deepest zoom: `options.tolerance / (2^max_zoom * extent)`. One
/// marking pass at that tolerance supports thinning at every shallower zoom.
pub fn convert(features: &[Feature], tolerance: f64) -> Result<Vec<ProjectedFeature>> {
    features
        .iter()
        .map(|feature| project_feature(feature, tolerance))
        .collect()
}

fn project_feature(feature: &Feature, tolerance: f64) -> Result<ProjectedFeature> {
    let (kind, geometry) = match &feature.geometry {
        Geometry::Point(point) => (
            FeatureKind::Point,
            ProjectedGeometry::Points(vec![project_point(point.x(), point.y())]),
        ),
        Geometry::MultiPoint(points) => (
            FeatureKind::Point,
            ProjectedGeometry::Points(
                points.iter().map(|p| project_point(p.x(), p.y())).collect(),
            ),
        ),
        Geometry::LineString(line) => (
            FeatureKind::LineString,
            ProjectedGeometry::Rings(vec![project_line(line, tolerance)]),
        ),
        Geometry::MultiLineString(lines) => (
            FeatureKind::LineString,
            ProjectedGeometry::Rings(lines.iter().map(|l| project_line(l, tolerance)).collect()),
        ),
        Geometry::Polygon(polygon) => (
            FeatureKind::Polygon,
            ProjectedGeometry::Rings(project_polygon(polygon, tolerance)),
        ),
        Geometry::MultiPolygon(polygons) => (
            FeatureKind::Polygon,
            ProjectedGeometry::Rings(
                polygons
                    .iter()
                    .flat_map(|p| project_polygon(p, tolerance))
                    .collect(),
            ),
        ),
        other => return Err(Error::UnsupportedGeometry(geometry_name(other))),
    };

    Ok(ProjectedFeature::new(
        geometry,
        kind,
        feature.properties.clone(),
    ))
}

fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
