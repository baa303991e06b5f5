//! Boundary between parsed GeoJSON documents and the tiler's input model.
//!
//! GeoJSON *text* parsing stays outside the core: callers parse with the
//! `geojson` crate (or produce `geo` geometry some other way) and hand the
//! result over here.

use geojson::GeoJson;

use crate::feature::{Feature, Properties};
use crate::{Error, Result};

/// Convert a parsed GeoJSON document into input features.
///
/// Accepts feature collections, single features, and bare geometry objects.
/// Property maps are carried through untouched; features without geometry
/// and geometry that does not convert cleanly are fatal, matching the
/// all-or-nothing error model of the pipeline.
pub fn features_from_geojson(geojson: &GeoJson) -> Result<Vec<Feature>> {
    match geojson {
        GeoJson::FeatureCollection(collection) => collection
            .features
            .iter()
            .map(feature_from_geojson)
            .collect(),
        GeoJson::Feature(feature) => Ok(vec![feature_from_geojson(feature)?]),
        GeoJson::Geometry(geometry) => Ok(vec![Feature::from_geometry(geo_geometry(geometry)?)]),
    }
}

fn feature_from_geojson(feature: &geojson::Feature) -> Result<Feature> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| Error::InvalidGeoJson("feature has no geometry".to_string()))?;
    let properties: Properties = feature.properties.clone().unwrap_or_default();
    Ok(Feature::new(geo_geometry(geometry)?, properties))
}

fn geo_geometry(geometry: &geojson::Geometry) -> Result<geo::Geometry<f64>> {
    geo::Geometry::try_from(geometry.clone()).map_err(|e| Error::InvalidGeoJson(e.to_string()))
}
