//! Planar triangle helpers for barycentric interpolation.
//!
//! Points are `glam::DVec2` in whatever frame the caller's spatial index uses.
//! Barycentric weights are affine-invariant, so the frame does not change the result.

use glam::{DMat3, DVec2, DVec3};

/// Tolerance on the sine of the angle between two triangle edges.
/// Anything flatter than this is treated as collinear.
pub const COLLINEARITY_EPSILON: f64 = 1e-9;

/// Three vertices in counter-clockwise or clockwise order; order does not matter.
pub type Triangle = [DVec2; 3];

/// Errors raised by triangle-based interpolation.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// The triangle's vertices are collinear or coincident.
    DegenerateGeometry,
    /// No non-degenerate triangle can be formed from the available stations.
    InsufficientGeometry { available: usize },
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::DegenerateGeometry => {
                write!(f, "Triangle vertices are not linearly independent")
            }
            GeometryError::InsufficientGeometry { available } => write!(
                f,
                "Cannot form a non-degenerate triangle from {} station(s)",
                available
            ),
        }
    }
}

impl std::error::Error for GeometryError {}

/// Whether the three vertices span a triangle with non-zero area.
///
/// Uses the determinant of the two edge vectors leaving the first vertex,
/// scaled by the edge lengths so the test does not depend on the coordinate
/// magnitude (lat/lon degrees and 100-cell grids behave the same).
/// Never fails; degeneracy is reported as `false`.
pub fn linearly_independent(triangle: &Triangle) -> bool {
    let v1 = triangle[1] - triangle[0];
    let v2 = triangle[2] - triangle[0];
    let determinant = v1.perp_dot(v2);
    let scale = v1.length() * v2.length();

    if !determinant.is_finite() || scale == 0.0 {
        return false;
    }
    determinant.abs() > COLLINEARITY_EPSILON * scale
}

/// Solve `[[x1,x2,x3],[y1,y2,y3],[1,1,1]] · w = [px,py,1]` for the weights `w`.
///
/// The weights sum to 1, equal 1 at the matching vertex and 0 along the
/// opposite edge. They are not clamped: points outside the triangle get
/// negative weights.
pub fn barycentric_coordinates(triangle: &Triangle, point: DVec2) -> Result<DVec3, GeometryError> {
    if !linearly_independent(triangle) {
        return Err(GeometryError::DegenerateGeometry);
    }

    let system = DMat3::from_cols(
        triangle[0].extend(1.0),
        triangle[1].extend(1.0),
        triangle[2].extend(1.0),
    );
    let determinant = system.determinant();
    if determinant == 0.0 || !determinant.is_finite() {
        return Err(GeometryError::DegenerateGeometry);
    }

    let weights = system.inverse() * point.extend(1.0);
    if !weights.is_finite() {
        return Err(GeometryError::DegenerateGeometry);
    }
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    fn tri(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Triangle {
        [DVec2::new(a.0, a.1), DVec2::new(b.0, b.1), DVec2::new(c.0, c.1)]
    }

    #[test]
    fn proper_triangle_is_independent() {
        assert!(linearly_independent(&tri((2.0, 3.0), (2.0, 0.0), (1.0, 2.0))));
    }

    #[test]
    fn collinear_points_are_dependent() {
        assert!(!linearly_independent(&tri((0.0, 0.0), (1.0, 1.0), (5.0, 5.0))));
        assert!(!linearly_independent(&tri((3.0, 0.0), (3.0, 7.0), (3.0, 2.0))));
    }

    #[test]
    fn coincident_points_are_dependent() {
        assert!(!linearly_independent(&tri((1.0, 1.0), (1.0, 1.0), (4.0, 2.0))));
        assert!(!linearly_independent(&tri((1.0, 1.0), (1.0, 1.0), (1.0, 1.0))));
    }

    #[test]
    fn nearly_collinear_rounding_noise_is_dependent() {
        let t = tri((0.0, 0.0), (1.0, 1.0), (2.0, 2.0 + 1e-13));
        assert!(!linearly_independent(&t));
    }

    #[test]
    fn tiny_but_proper_triangle_is_independent() {
        // Geo coordinates: a few thousandths of a degree apart
        let t = tri((7.440, 46.950), (7.441, 46.950), (7.440, 46.951));
        assert!(linearly_independent(&t));
    }

    #[test]
    fn weights_sum_to_one() {
        let t = tri((2.0, 3.0), (2.0, 0.0), (1.0, 2.0));
        for p in [(1.0, 1.0), (2.0, 2.0), (10.0, -4.0), (1.5, 1.5)] {
            let w = barycentric_coordinates(&t, DVec2::new(p.0, p.1)).unwrap();
            assert!((w.x + w.y + w.z - 1.0).abs() < TOL, "weights {:?} at {:?}", w, p);
        }
    }

    #[test]
    fn weight_is_one_at_each_vertex() {
        let t = tri((0.0, 0.0), (4.0, 0.0), (1.0, 3.0));
        for (i, vertex) in t.iter().enumerate() {
            let w = barycentric_coordinates(&t, *vertex).unwrap();
            let w = w.to_array();
            for (j, value) in w.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((value - expected).abs() < TOL, "vertex {} weight {} = {}", i, j, value);
            }
        }
    }

    #[test]
    fn weight_is_zero_on_opposite_edge() {
        let t = tri((0.0, 0.0), (4.0, 0.0), (0.0, 4.0));
        // Midpoint of edge between vertex 1 and vertex 2
        let w = barycentric_coordinates(&t, DVec2::new(2.0, 2.0)).unwrap();
        assert!(w.x.abs() < TOL);
        assert!((w.y - 0.5).abs() < TOL);
        assert!((w.z - 0.5).abs() < TOL);
    }

    #[test]
    fn outside_point_gets_negative_weight() {
        let t = tri((0.0, 0.0), (1.0, 0.0), (0.0, 1.0));
        let w = barycentric_coordinates(&t, DVec2::new(2.0, 2.0)).unwrap();
        assert!(w.x < 0.0);
        assert!((w.x + w.y + w.z - 1.0).abs() < TOL);
    }

    #[test]
    fn degenerate_triangle_is_rejected() {
        let t = tri((0.0, 0.0), (1.0, 1.0), (2.0, 2.0));
        let err = barycentric_coordinates(&t, DVec2::new(0.5, 0.0)).unwrap_err();
        assert_eq!(err, GeometryError::DegenerateGeometry);
    }
}
