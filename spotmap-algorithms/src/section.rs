//! Planar cross-section of a box.
//!
//! The section is computed from the 12 box edges: every edge crossing the
//! plane contributes one point, giving a convex polygon of 3 to 6 vertices
//! (or nothing). The polygon is ordered by angle around its centroid and
//! triangulated as a fan, which is valid because it is convex.

use glam::Vec3;
use spotmap_core::error::Result;
use spotmap_core::geometry::{Aabb, Plane};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Points closer than this are treated as the same polygon vertex.
const MERGE_DISTANCE: f32 = 1e-5;

/// Cross-section polygon with its triangulation and outline.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SectionPolygon {
    /// Polygon vertices in angular order.
    pub vertices: Vec<Vec3>,
    /// Fan triangles, three vertex indices each.
    pub indices: Vec<u32>,
    /// Boundary edges, closing back to vertex 0.
    pub edges: Vec<[u32; 2]>,
}

impl SectionPolygon {
    /// True if the plane misses the box.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Number of fan triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertices as a flat `[x, y, z, ...]` buffer.
    #[must_use]
    pub fn positions(&self) -> Vec<f32> {
        self.vertices.iter().flat_map(|v| v.to_array()).collect()
    }
}

/// Intersects `aabb` with `plane`.
#[must_use]
pub fn extract_section(aabb: &Aabb, plane: &Plane) -> SectionPolygon {
    let mut points: Vec<Vec3> = Vec::with_capacity(6);
    for (start, end) in aabb.edges() {
        let Some(point) = plane.intersect_segment(start, end) else {
            continue;
        };
        if points.iter().all(|p| p.distance(point) > MERGE_DISTANCE) {
            points.push(point);
        }
    }
    if points.len() < 3 {
        return SectionPolygon::default();
    }

    sort_by_angle(&mut points, plane.normal());
    let count = u32::try_from(points.len()).unwrap_or(u32::MAX);
    let indices = (1..count - 1).flat_map(|i| [0, i, i + 1]).collect();
    let edges = (0..count).map(|i| [i, (i + 1) % count]).collect();
    SectionPolygon {
        vertices: points,
        indices,
        edges,
    }
}

/// Orders coplanar points counter-clockwise around their centroid, seen
/// from the side `normal` points to.
fn sort_by_angle(points: &mut [Vec3], normal: Vec3) {
    #[allow(clippy::cast_precision_loss)]
    let centroid = points.iter().copied().sum::<Vec3>() / points.len() as f32;
    let u = normal.any_orthonormal_vector();
    let v = normal.cross(u);
    points.sort_by(|a, b| {
        let angle = |p: &Vec3| {
            let d = *p - centroid;
            d.dot(v).atan2(d.dot(u))
        };
        angle(a).total_cmp(&angle(b))
    });
}

/// Keeps the last section and recomputes it only when its inputs change.
#[derive(Debug, Default)]
pub struct SectionCache {
    key: Option<(Vec3, Vec3, Vec3, Vec3)>,
    polygon: SectionPolygon,
}

impl SectionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the section of the box `[min, max]` by the plane through
    /// `origin` with normal `normal`, recomputing it if needed.
    pub fn update(&mut self, min: Vec3, max: Vec3, origin: Vec3, normal: Vec3) -> Result<&SectionPolygon> {
        let key = (min, max, origin, normal);
        if self.key != Some(key) {
            let plane = Plane::from_normal_and_point(normal, origin)?;
            self.polygon = extract_section(&Aabb::new(min, max), &plane);
            self.key = Some(key);
            log::trace!("section recomputed: {} vertices", self.polygon.vertices.len());
        }
        Ok(&self.polygon)
    }

    /// Last computed section.
    #[must_use]
    pub fn polygon(&self) -> &SectionPolygon {
        &self.polygon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn test_axis_aligned_cut() {
        let plane = Plane::from_normal_and_point(Vec3::Z, Vec3::new(0.0, 0.0, 0.5)).unwrap();
        let section = extract_section(&unit_box(), &plane);
        assert_eq!(section.vertices.len(), 4);
        assert_eq!(section.triangle_count(), 2);
        assert_eq!(section.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(section.edges, vec![[0, 1], [1, 2], [2, 3], [3, 0]]);
        for v in &section.vertices {
            assert_relative_eq!(v.z, 0.5);
        }
    }

    #[test]
    fn test_plane_misses_box() {
        let plane = Plane::from_normal_and_point(Vec3::Z, Vec3::new(0.0, 0.0, 2.0)).unwrap();
        let section = extract_section(&unit_box(), &plane);
        assert!(section.is_empty());
        assert!(section.indices.is_empty());
        assert!(section.edges.is_empty());
    }

    #[test]
    fn test_cut_through_face_is_deduplicated() {
        let plane = Plane::from_normal_and_point(Vec3::Z, Vec3::ZERO).unwrap();
        let section = extract_section(&unit_box(), &plane);
        assert_eq!(section.vertices.len(), 4);
    }

    #[test]
    fn test_diagonal_cut_is_hexagon() {
        let plane = Plane::from_normal_and_point(Vec3::ONE, Vec3::splat(0.5)).unwrap();
        let section = extract_section(&unit_box(), &plane);
        assert_eq!(section.vertices.len(), 6);
        assert_eq!(section.triangle_count(), 4);

        // Consecutive vertices are adjacent hexagon corners.
        let side = (0.5_f32 * 0.5 * 2.0).sqrt();
        for [a, b] in &section.edges {
            let d = section.vertices[*a as usize].distance(section.vertices[*b as usize]);
            assert_relative_eq!(d, side, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_fan_triangles_face_the_normal() {
        let normal = Vec3::new(0.2, 1.0, 0.3);
        let plane = Plane::from_normal_and_point(normal, Vec3::splat(0.5)).unwrap();
        let section = extract_section(&unit_box(), &plane);
        for tri in section.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| section.vertices[i as usize]);
            assert!((b - a).cross(c - a).dot(normal) > 0.0);
        }
    }

    #[test]
    fn test_cache_recomputes_on_change() {
        let mut cache = SectionCache::new();
        let first = cache
            .update(Vec3::ZERO, Vec3::ONE, Vec3::splat(0.5), Vec3::Z)
            .unwrap()
            .clone();
        assert_eq!(first.vertices.len(), 4);

        let same = cache
            .update(Vec3::ZERO, Vec3::ONE, Vec3::splat(0.5), Vec3::Z)
            .unwrap();
        assert_eq!(*same, first);

        let moved = cache
            .update(Vec3::ZERO, Vec3::ONE, Vec3::splat(3.0), Vec3::Z)
            .unwrap();
        assert!(moved.is_empty());
        assert!(cache
            .update(Vec3::ZERO, Vec3::ONE, Vec3::ZERO, Vec3::ZERO)
            .is_err());
    }
}
