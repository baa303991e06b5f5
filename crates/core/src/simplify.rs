//! Tolerance marking for Douglas-Peucker simplification.
//!
//! Instead of producing a thinned copy, the marker annotates each vertex
//! with the largest squared perpendicular distance at which it would still
//! be retained. Downstream consumers keep any vertex whose mark is at least
//! the squared tolerance in effect, so a single marking pass at the finest
//! tolerance serves every zoom level of the pyramid.

use crate::feature::ProjectedPoint;

/// Mark a run of points for simplification at the given tolerance.
///
/// Endpoints always receive the maximum mark of 1.0. Interior vertices are
/// visited with an explicit work stack of (first, last) index pairs so deep
/// runs cannot exhaust the call stack.
pub fn simplify(points: &mut [ProjectedPoint], tolerance: f64) {
    let len = points.len();
    if len == 0 {
        return;
    }

    let sq_tolerance = tolerance * tolerance;
    points[0].keep = 1.0;
    points[len - 1].keep = 1.0;
    if len < 3 {
        return;
    }

    let mut stack = vec![(0usize, len - 1)];
    while let Some((first, last)) = stack.pop() {
        let mut max_sq_dist = sq_tolerance;
        let mut split = None;

        for i in first + 1..last {
            let sq_dist = sq_segment_dist(&points[i], &points[first], &points[last]);
            if sq_dist > max_sq_dist {
                split = Some(i);
                max_sq_dist = sq_dist;
            }
        }

        if let Some(index) = split {
            points[index].keep = max_sq_dist;
            if index - first > 1 {
                stack.push((first, index));
            }
            if last - index > 1 {
                stack.push((index, last));
            }
        }
    }
}

/// Squared distance from `p` to the segment `ab`, with the projection
/// parameter clamped to the segment.
fn sq_segment_dist(p: &ProjectedPoint, a: &ProjectedPoint, b: &ProjectedPoint) -> f64 {
    let mut x = a.x;
    let mut y = a.y;
    let mut dx = b.x - x;
    let mut dy = b.y - y;

    if dx != 0.0 || dy != 0.0 {
        let t = ((p.x - x) * dx + (p.y - y) * dy) / (dx * dx + dy * dy);
        if t > 1.0 {
            x = b.x;
            y = b.y;
        } else if t > 0.0 {
            x += dx * t;
            y += dy * t;
        }
    }

    dx = p.x - x;
    dy = p.y - y;
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(coords: &[(f64, f64)]) -> Vec<ProjectedPoint> {
        coords
            .iter()
            .map(|&(x, y)| ProjectedPoint::new(x, y))
            .collect()
    }

    #[test]
    fn test_endpoints_always_marked() {
        let mut points = run(&[(0.0, 0.0), (0.5, 0.0), (1.0, 0.0)]);
        simplify(&mut points, 0.01);
        assert_eq!(points[0].keep, 1.0);
        assert_eq!(points[2].keep, 1.0);
    }

    #[test]
    fn test_collinear_interior_left_unmarked() {
        let mut points = run(&[(0.0, 0.0), (0.25, 0.0), (0.5, 0.0), (0.75, 0.0), (1.0, 0.0)]);
        simplify(&mut points, 1e-6);
        for point in &points[1..4] {
            assert_eq!(point.keep, 0.0, "collinear vertex should stay unmarked");
        }
    }

    #[test]
    fn test_spike_marked_with_its_distance() {
        let mut points = run(&[(0.0, 0.0), (0.5, 0.2), (1.0, 0.0)]);
        simplify(&mut points, 0.01);
        // perpendicular distance of the spike is 0.2, squared 0.04
        assert!((points[1].keep - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_small_deviation_below_tolerance_unmarked() {
        let mut points = run(&[(0.0, 0.0), (0.5, 0.001), (1.0, 0.0)]);
        simplify(&mut points, 0.01);
        assert_eq!(points[1].keep, 0.0);
    }

    #[test]
    fn test_marks_are_monotonic_in_tolerance() {
        // a vertex marked at some tolerance keeps its mark value regardless
        // of the tolerance used, so lowering the query tolerance only ever
        // adds vertices
        let coords: Vec<(f64, f64)> = (0..50)
            .map(|i| {
                let x = f64::from(i) / 49.0;
                (x, (x * 12.0).sin() * 0.05)
            })
            .collect();

        let mut marked = run(&coords);
        simplify(&mut marked, 1e-6);

        let kept_at = |sq: f64| -> Vec<usize> {
            marked
                .iter()
                .enumerate()
                .filter(|(_, p)| p.keep >= sq)
                .map(|(i, _)| i)
                .collect()
        };

        let coarse = kept_at(0.01 * 0.01);
        let fine = kept_at(0.001 * 0.001);
        for index in &coarse {
            assert!(fine.contains(index), "vertex {index} lost at finer tolerance");
        }
        assert!(fine.len() >= coarse.len());
    }

    #[test]
    fn test_degenerate_segment_distance() {
        // zero-length segment: distance degenerates to point distance
        let a = ProjectedPoint::new(0.5, 0.5);
        let d = sq_segment_dist(&ProjectedPoint::new(0.5, 0.7), &a, &a);
        assert!((d - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_two_point_run() {
        let mut points = run(&[(0.0, 0.0), (1.0, 1.0)]);
        simplify(&mut points, 0.5);
        assert_eq!(points[0].keep, 1.0);
        assert_eq!(points[1].keep, 1.0);
    }
}
