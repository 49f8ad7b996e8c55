//! Ray / triangle-soup intersection for picking.
//!
//! Triangles come as a flat, non-indexed position buffer: triangle `t` owns
//! vertices `3t`, `3t + 1` and `3t + 2`, i.e. floats `9t..9t + 9`.
//! Both windings are accepted.

use glam::Vec3;
use spotmap_core::error::{Error, Result};
use spotmap_core::geometry::Ray;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::mapping::SpotMapping;

const EPSILON: f32 = 1e-8;

/// Nearest intersection of a ray with a triangle list.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RayHit {
    /// Index of the triangle in the position buffer.
    pub triangle_index: usize,
    /// Distance from the ray origin to the hit point, in the ray's space.
    pub distance: f32,
}

impl RayHit {
    /// Vertex indices of the hit triangle.
    #[must_use]
    pub fn vertex_indices(&self) -> [usize; 3] {
        let first = self.triangle_index * 3;
        [first, first + 1, first + 2]
    }
}

/// Möller–Trumbore intersection without back-face culling.
///
/// Returns the ray parameter `t > 0` of the hit.
#[must_use]
pub fn intersect_triangle(ray: &Ray, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let edge1 = b - a;
    let edge2 = c - a;
    let h = ray.direction.cross(edge2);
    let det = edge1.dot(h);
    if det.abs() < EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = ray.origin - a;
    let u = inv_det * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = inv_det * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = inv_det * edge2.dot(q);
    (t > EPSILON).then_some(t)
}

/// Finds the triangle nearest to the ray origin.
///
/// `ray` must already be expressed in the local space of `positions`
/// (see [`Ray::to_local`]). A miss is `Ok(None)`; equal distances keep the
/// lower triangle index.
pub fn raycast(ray: &Ray, positions: &[f32]) -> Result<Option<RayHit>> {
    if positions.len() % 9 != 0 {
        return Err(Error::InvalidGeometry(format!(
            "triangle buffer length {} is not a multiple of 9",
            positions.len()
        )));
    }
    let direction_length = ray.direction.length();
    if !(direction_length > 0.0 && direction_length.is_finite()) {
        return Err(Error::InvalidGeometry(format!(
            "ray direction {} has no length",
            ray.direction
        )));
    }

    let mut nearest: Option<RayHit> = None;
    for (triangle_index, tri) in positions.chunks_exact(9).enumerate() {
        let a = Vec3::from_slice(&tri[0..3]);
        let b = Vec3::from_slice(&tri[3..6]);
        let c = Vec3::from_slice(&tri[6..9]);

        let Some(t) = intersect_triangle(ray, a, b, c) else {
            continue;
        };
        let distance = t * direction_length;
        if nearest.is_none_or(|hit| distance < hit.distance) {
            nearest = Some(RayHit {
                triangle_index,
                distance,
            });
        }
    }
    Ok(nearest)
}

/// Resolves a hit to a spot: the first vertex of the hit triangle that is
/// mapped to a spot decides.
#[must_use]
pub fn pick_spot(hit: &RayHit, mapping: &SpotMapping) -> Option<usize> {
    hit.vertex_indices()
        .iter()
        .filter_map(|&vertex| mapping.closest_spot_indices.get(vertex))
        .find_map(|&spot| usize::try_from(spot).ok())
}
