//! 2D line helpers used by the control law.

use sutra_core::WorldPoint;

/// Signed distance of `c` from the infinite line through `a` and `b`.
/// Positive to the left of a->b.
#[inline]
pub fn line_distance(a: WorldPoint, b: WorldPoint, c: WorldPoint) -> f32 {
    (b - a).cross(c - a) / (b - a).norm()
}

/// Distance of `c` from the segment a->b.
///
/// Before `a` the point distance to `a` is returned; past `b` the point
/// distance to `b` is returned negated, marking that the query passed the
/// segment. A degenerate segment measures the plain point distance.
#[inline]
pub fn line_strip_distance(a: WorldPoint, b: WorldPoint, c: WorldPoint) -> f32 {
    if a == b {
        return c.distance(a);
    }
    if (b - a).dot(c - a) <= 0.0 {
        return c.distance(a);
    }
    if (a - b).dot(c - b) <= 0.0 {
        return -c.distance(b);
    }
    line_distance(a, b, c)
}

/// Orthogonal projection of `c` onto the line through `a` and `b`.
/// A degenerate line projects everything onto `a`.
#[inline]
pub fn projection(a: WorldPoint, b: WorldPoint, c: WorldPoint) -> WorldPoint {
    let ab = b - a;
    let len2 = ab.squared_norm();
    if len2 == 0.0 {
        return a;
    }
    a + ab * ((c - a).dot(ab) / len2)
}

/// Signed curvature of the circle through three points.
///
/// Positive for a CCW turn; non-finite when the points are (nearly)
/// coincident.
#[inline]
pub fn curvature_3p(a: WorldPoint, b: WorldPoint, c: WorldPoint) -> f32 {
    let num = 2.0 * (b - a).cross(c - a);
    let den =
        ((b - a).squared_norm() * (c - b).squared_norm() * (c - a).squared_norm()).sqrt();
    num / den
}

/// Clamp to a symmetric range.
#[inline]
pub fn clip(v: f32, limit: f32) -> f32 {
    v.clamp(-limit, limit)
}
