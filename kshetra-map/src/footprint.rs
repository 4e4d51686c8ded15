//! Robot footprint polygon.

use sutra_core::WorldPoint;

/// Closed 2D polygon in the robot body frame.
///
/// Vertices are stored as an open ring; the closing edge from the last
/// vertex back to the first is implicit.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    vertices: Vec<WorldPoint>,
}

impl Polygon {
    pub fn new(vertices: Vec<WorldPoint>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[WorldPoint] {
        &self.vertices
    }

    /// Iterator over the closed edge list.
    fn edges(&self) -> impl Iterator<Item = (WorldPoint, WorldPoint)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Point containment by crossing number.
    pub fn contains(&self, p: WorldPoint) -> bool {
        let mut crossings = 0;
        for (a, b) in self.edges() {
            if (a.y <= p.y && p.y < b.y) || (b.y <= p.y && p.y < a.y) {
                let lx = a.x + (b.x - a.x) * (p.y - a.y) / (b.y - a.y);
                if p.x < lx {
                    crossings += 1;
                }
            }
        }
        crossings % 2 == 1
    }

    /// Minimum distance from `p` to the polygon perimeter.
    pub fn distance(&self, p: WorldPoint) -> f32 {
        let mut min = f32::MAX;
        for (a, b) in self.edges() {
            let ab = b - a;
            let len2 = ab.squared_norm();
            let d = if len2 == 0.0 {
                p.distance(a)
            } else {
                let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
                p.distance(a + ab * t)
            };
            if d < min {
                min = d;
            }
        }
        min
    }

    /// Radius of the smallest origin-centered circle containing the polygon.
    pub fn circumradius(&self) -> f32 {
        self.vertices
            .iter()
            .map(|v| v.norm())
            .fold(0.0f32, f32::max)
    }

    /// The polygon rotated around the body origin.
    pub fn rotated(&self, angle: f32) -> Polygon {
        Polygon::new(self.vertices.iter().map(|v| v.rotated(angle)).collect())
    }
}
