//! Vertex → spot association for surface meshes.
//!
//! Every mesh vertex is assigned the nearest spot whose sphere encloses it,
//! together with its distance normalised by that spot's radius. With the
//! association prebuilt, recolouring the mesh for another measure of the
//! same spots is a single linear pass ([`recolor`]).
//!
//! The search is brute force, O(vertices × spots).
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use glam::Vec3;
use spotmap_core::error::{Error, Result};
use spotmap_core::progress::Progress;
use spotmap_core::spot::Spot;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-vertex nearest enclosing spot.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpotMapping {
    /// Spot index per vertex, `-1` when no spot encloses the vertex.
    pub closest_spot_indices: Vec<i32>,
    /// `distance / radius` of the chosen spot, `1.0` for unmapped vertices.
    pub closest_spot_distances: Vec<f32>,
}

impl SpotMapping {
    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.closest_spot_indices.len()
    }

    /// True if the mapping covers no vertex.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.closest_spot_indices.is_empty()
    }

    /// Number of vertices mapped to some spot.
    #[must_use]
    pub fn mapped_count(&self) -> usize {
        self.closest_spot_indices.iter().filter(|&&i| i >= 0).count()
    }

    /// Spot of vertex `vertex`, if any.
    #[must_use]
    pub fn spot_of(&self, vertex: usize) -> Option<usize> {
        self.closest_spot_indices
            .get(vertex)
            .and_then(|&i| usize::try_from(i).ok())
    }
}

/// Finds the nearest enclosing spot of a single point.
///
/// A spot encloses `point` if the squared distance to its centre is at most
/// `radius²`. On equal distances the earlier spot is kept.
#[must_use]
pub fn nearest_enclosing_spot(point: Vec3, spots: &[Spot]) -> Option<(usize, f32)> {
    let mut closest: Option<(usize, f32)> = None;
    for (index, spot) in spots.iter().enumerate() {
        let distance_sq = point.distance_squared(spot.position());
        if distance_sq > spot.radius() * spot.radius() {
            continue;
        }
        if closest.is_none_or(|(_, best)| distance_sq < best) {
            closest = Some((index, distance_sq));
        }
    }
    closest.map(|(index, distance_sq)| (index, distance_sq.sqrt() / spots[index].radius()))
}

/// Maps every vertex of a flat `[x, y, z, ...]` position buffer to its
/// nearest enclosing spot.
///
/// Progress is reported each time another percent of the vertices has
/// been processed, and cancellation is polled at the same points.
pub fn map_vertices<P>(positions: &[f32], spots: &[Spot], progress: &P) -> Result<SpotMapping>
where
    P: Progress + ?Sized,
{
    if positions.len() % 3 != 0 {
        return Err(Error::InvalidGeometry(format!(
            "position buffer length {} is not a multiple of 3",
            positions.len()
        )));
    }
    if i32::try_from(spots.len()).is_err() {
        return Err(Error::ConfigError(format!(
            "{} spots exceed the index range of the mapping",
            spots.len()
        )));
    }

    let vertex_count = positions.len() / 3;
    let mut mapping = SpotMapping {
        closest_spot_indices: Vec::with_capacity(vertex_count),
        closest_spot_distances: Vec::with_capacity(vertex_count),
    };

    let mut percent: usize = 0;
    let mut next_chunk = 0usize;
    for (vertex, xyz) in positions.chunks_exact(3).enumerate() {
        if vertex >= next_chunk {
            progress.checkpoint()?;
            while vertex >= next_chunk {
                next_chunk = ((percent + 1) * vertex_count).div_ceil(100);
                progress.report(format!("Mapping: {percent}%"));
                percent += 1;
            }
        }

        match nearest_enclosing_spot(Vec3::from_slice(xyz), spots) {
            Some((index, distance)) => {
                mapping.closest_spot_indices.push(index as i32);
                mapping.closest_spot_distances.push(distance);
            }
            None => {
                mapping.closest_spot_indices.push(-1);
                mapping.closest_spot_distances.push(1.0);
            }
        }
    }

    log::debug!(
        "mapped {} of {} vertices to {} spots",
        mapping.mapped_count(),
        vertex_count,
        spots.len()
    );
    Ok(mapping)
}

/// Colour and opacity of one spot when painted onto a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpotStyle {
    /// Linear RGB.
    pub color: [f32; 3],
    /// Per-spot opacity, e.g. lowered for deselected spots.
    pub opacity: f32,
}

/// Settings for [`recolor`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecolorConfig {
    /// Colour of vertices outside every spot.
    pub base_color: [f32; 3],
    /// Opacity left at a spot's rim: 0 fades to the base colour, 1 keeps a hard edge.
    pub spot_border: f32,
    /// Opacity applied to every spot.
    pub global_opacity: f32,
}

impl Default for RecolorConfig {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0],
            spot_border: 0.05,
            global_opacity: 1.0,
        }
    }
}

impl RecolorConfig {
    /// Sets the base colour.
    #[must_use]
    pub fn with_base_color(mut self, color: [f32; 3]) -> Self {
        self.base_color = color;
        self
    }

    /// Sets the rim opacity.
    #[must_use]
    pub fn with_spot_border(mut self, border: f32) -> Self {
        self.spot_border = border;
        self
    }

    /// Sets the global spot opacity.
    #[must_use]
    pub fn with_global_opacity(mut self, opacity: f32) -> Self {
        self.global_opacity = opacity;
        self
    }
}

/// Produces per-vertex RGB colours from a prebuilt mapping.
///
/// `styles[i]` is `None` for spots without a value for the current measure;
/// their vertices keep the base colour.
#[must_use]
pub fn recolor(mapping: &SpotMapping, styles: &[Option<SpotStyle>], config: &RecolorConfig) -> Vec<f32> {
    let falloff = 1.0 - config.spot_border;
    let mut colors = Vec::with_capacity(mapping.len() * 3);
    for (vertex, &distance) in mapping.closest_spot_distances.iter().enumerate() {
        let mut rgb = config.base_color;
        if let Some(style) = mapping.spot_of(vertex).and_then(|spot| styles.get(spot).copied().flatten()) {
            let alpha = (1.0 - falloff * distance) * style.opacity * config.global_opacity;
            for (channel, target) in rgb.iter_mut().zip(style.color) {
                *channel += (target - *channel) * alpha;
            }
        }
        colors.extend_from_slice(&rgb);
    }
    colors
}
