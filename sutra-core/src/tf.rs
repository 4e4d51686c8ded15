//! Stamped 2D rigid-transform buffer.
//!
//! A very small stand-in for a full frame-lookup service: the buffer keeps
//! the latest transform per (parent, child) pair and resolves lookups that
//! are the identity, a stored edge, the inverse of a stored edge, or a
//! chain of two such edges. That covers everything this stack needs
//! (robot <- odom <- path).

use crate::pose::Pose2D;
use std::collections::HashMap;
use thiserror::Error;

/// Transform lookup failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TfError {
    #[error("no transform from \"{source_frame}\" to \"{target}\"")]
    NotFound { target: String, source_frame: String },
}

/// Transform mapping points in `child` into `parent`, with the time it
/// was observed.
#[derive(Clone, Debug, PartialEq)]
pub struct StampedTransform2D {
    pub stamp: f64,
    pub parent: String,
    pub child: String,
    pub transform: Pose2D,
}

impl StampedTransform2D {
    pub fn new(
        stamp: f64,
        parent: impl Into<String>,
        child: impl Into<String>,
        transform: Pose2D,
    ) -> Self {
        Self {
            stamp,
            parent: parent.into(),
            child: child.into(),
            transform,
        }
    }

    /// The same edge read in the opposite direction.
    fn inverted(&self) -> StampedTransform2D {
        StampedTransform2D {
            stamp: self.stamp,
            parent: self.child.clone(),
            child: self.parent.clone(),
            transform: self.transform.inverse(),
        }
    }

    /// Compose with a transform whose parent is this child.
    fn chained(&self, next: &StampedTransform2D) -> StampedTransform2D {
        StampedTransform2D {
            stamp: self.stamp.min(next.stamp),
            parent: self.parent.clone(),
            child: next.child.clone(),
            transform: self.transform.compose(&next.transform),
        }
    }
}

/// Latest-value transform buffer.
#[derive(Default)]
pub struct TfBuffer {
    edges: HashMap<(String, String), StampedTransform2D>,
}

impl TfBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the parent <- child edge.
    pub fn set(&mut self, tf: StampedTransform2D) {
        self.edges
            .insert((tf.parent.clone(), tf.child.clone()), tf);
    }

    fn edge(&self, parent: &str, child: &str) -> Option<StampedTransform2D> {
        if let Some(tf) = self.edges.get(&(parent.to_string(), child.to_string())) {
            return Some(tf.clone());
        }
        self.edges
            .get(&(child.to_string(), parent.to_string()))
            .map(|tf| tf.inverted())
    }

    /// Resolve the transform mapping points in `source` into `target`.
    pub fn lookup(&self, target: &str, source: &str) -> Result<StampedTransform2D, TfError> {
        if target == source {
            return Ok(StampedTransform2D::new(
                f64::INFINITY,
                target,
                source,
                Pose2D::default(),
            ));
        }
        if let Some(tf) = self.edge(target, source) {
            return Ok(tf);
        }
        // One intermediate frame.
        for (parent, child) in self.edges.keys() {
            for mid in [parent.as_str(), child.as_str()] {
                if mid == target || mid == source {
                    continue;
                }
                if let (Some(a), Some(b)) = (self.edge(target, mid), self.edge(mid, source)) {
                    return Ok(a.chained(&b));
                }
            }
        }
        Err(TfError::NotFound {
            target: target.to_string(),
            source_frame: source.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::WorldPoint;

    #[test]
    fn test_identity() {
        let buf = TfBuffer::new();
        let tf = buf.lookup("odom", "odom").unwrap();
        assert_eq!(tf.transform, Pose2D::default());
    }

    #[test]
    fn test_direct_and_inverse() {
        let mut buf = TfBuffer::new();
        buf.set(StampedTransform2D::new(
            1.0,
            "odom",
            "base_link",
            Pose2D::new(1.0, 2.0, 0.5),
        ));
        let fwd = buf.lookup("odom", "base_link").unwrap();
        assert_eq!(fwd.transform, Pose2D::new(1.0, 2.0, 0.5));

        let inv = buf.lookup("base_link", "odom").unwrap();
        let ident = fwd.transform.compose(&inv.transform);
        assert!(ident.x.abs() < 1e-5);
        assert!(ident.y.abs() < 1e-5);
        assert!(ident.yaw.abs() < 1e-5);
    }

    #[test]
    fn test_two_hop_chain() {
        let mut buf = TfBuffer::new();
        buf.set(StampedTransform2D::new(
            2.0,
            "odom",
            "base_link",
            Pose2D::new(1.0, 0.0, 0.0),
        ));
        buf.set(StampedTransform2D::new(
            3.0,
            "map",
            "odom",
            Pose2D::new(0.0, 1.0, 0.0),
        ));
        let tf = buf.lookup("map", "base_link").unwrap();
        let p = tf.transform.transform_point(WorldPoint::ZERO);
        assert!((p.x - 1.0).abs() < 1e-5);
        assert!((p.y - 1.0).abs() < 1e-5);
        assert!((tf.stamp - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_edge() {
        let buf = TfBuffer::new();
        assert!(buf.lookup("map", "base_link").is_err());
    }
}
