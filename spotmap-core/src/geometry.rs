//! Rays, planes and axis-aligned boxes.

use glam::{Mat4, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Half-line `origin + t * direction`, `t >= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ray {
    pub origin: Vec3,
    /// Need not be normalized; distances are always measured in space units.
    pub direction: Vec3,
}

impl Ray {
    /// Creates a ray.
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Expresses a world-space ray in the local space of an object placed by `world`.
    ///
    /// Only singular or non-finite matrices are rejected; small scales such
    /// as millimetre meshes shown in metres are fine.
    pub fn to_local(&self, world: &Mat4) -> Result<Self> {
        let determinant = world.determinant();
        let inverse = world.inverse();
        if determinant == 0.0 || !determinant.is_finite() || !inverse.is_finite() {
            return Err(Error::InvalidGeometry(
                "world matrix is not invertible".to_string(),
            ));
        }
        Ok(Self {
            origin: inverse.transform_point3(self.origin),
            direction: inverse.transform_vector3(self.direction),
        })
    }
}

/// Plane `normal · p + constant = 0` with a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Plane {
    normal: Vec3,
    constant: f32,
}

impl Plane {
    /// Plane through `point` facing `normal`. The normal is normalized here.
    pub fn from_normal_and_point(normal: Vec3, point: Vec3) -> Result<Self> {
        let normal = normal.try_normalize().ok_or_else(|| {
            Error::InvalidGeometry(format!("plane normal {normal} has no direction"))
        })?;
        Ok(Self {
            normal,
            constant: -normal.dot(point),
        })
    }

    /// Unit normal.
    #[must_use]
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Signed distance from `point` to the plane, positive on the normal side.
    #[must_use]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.constant
    }

    /// Intersection of segment `start..=end` with the plane.
    ///
    /// A segment lying in the plane reports its start point.
    #[must_use]
    pub fn intersect_segment(&self, start: Vec3, end: Vec3) -> Option<Vec3> {
        let direction = end - start;
        let denominator = self.normal.dot(direction);
        if denominator.abs() <= f32::EPSILON {
            return (self.signed_distance(start).abs() <= f32::EPSILON).then_some(start);
        }
        let t = -self.signed_distance(start) / denominator;
        (0.0..=1.0).contains(&t).then(|| start + direction * t)
    }
}

/// Axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

/// Corner pairs of the 12 box edges, as offsets in the unit cube.
const UNIT_CUBE_EDGES: [([f32; 3], [f32; 3]); 12] = [
    ([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
    ([1.0, 0.0, 0.0], [1.0, 1.0, 0.0]),
    ([1.0, 1.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [0.0, 0.0, 0.0]),
    ([0.0, 0.0, 1.0], [1.0, 0.0, 1.0]),
    ([1.0, 0.0, 1.0], [1.0, 1.0, 1.0]),
    ([1.0, 1.0, 1.0], [0.0, 1.0, 1.0]),
    ([0.0, 1.0, 1.0], [0.0, 0.0, 1.0]),
    ([0.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([1.0, 0.0, 0.0], [1.0, 0.0, 1.0]),
    ([1.0, 1.0, 0.0], [1.0, 1.0, 1.0]),
    ([0.0, 1.0, 0.0], [0.0, 1.0, 1.0]),
];

impl Aabb {
    /// Creates a box from two opposite corners in any order.
    #[must_use]
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Edge lengths.
    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Centre point.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns true if `point` lies inside or on the box.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// The 12 edges as `(start, end)` segments.
    #[must_use]
    pub fn edges(&self) -> [(Vec3, Vec3); 12] {
        let size = self.size();
        UNIT_CUBE_EDGES.map(|(a, b)| {
            (
                self.min + Vec3::from_array(a) * size,
                self.min + Vec3::from_array(b) * size,
            )
        })
    }
}
