//! Antimeridian wrapping.
//!
//! Features near the +/-180 degree seam are duplicated into the buffer zone
//! on the opposite side of the world so tiles along the seam see both
//! copies. Wrapping runs once, after projection and before tiling.

use crate::clip::{clip, Axis};
use crate::feature::ProjectedFeature;

/// Fold a projected feature set into the buffered world `[-buf, 1 + buf]`.
///
/// `buffer` is a fraction of the world width, normally
/// `options.buffer / options.extent`. Three x-axis clips produce a left
/// world copy, the center world, and a right world copy; the side copies
/// are shifted by a whole world and merged with the center. When nothing
/// reaches across the seam the input is returned untouched.
pub fn wrap(features: Vec<ProjectedFeature>, buffer: f64) -> Vec<ProjectedFeature> {
    let left = clip(
        &features,
        1.0,
        -1.0 - buffer,
        buffer,
        Axis::X,
        -1.0,
        2.0,
    );
    let right = clip(
        &features,
        1.0,
        1.0 - buffer,
        2.0 + buffer,
        Axis::X,
        -1.0,
        2.0,
    );

    if left.is_empty() && right.is_empty() {
        return features;
    }

    let mut merged = clip(
        &features,
        1.0,
        -buffer,
        1.0 + buffer,
        Axis::X,
        -1.0,
        2.0,
    );

    let mut wrapped = shift_features(left, 1.0);
    wrapped.append(&mut merged);
    wrapped.extend(shift_features(right, -1.0));
    wrapped
}

fn shift_features(mut features: Vec<ProjectedFeature>, offset: f64) -> Vec<ProjectedFeature> {
    for feature in &mut features {
        feature.shift_x(offset);
    }
    features
}
