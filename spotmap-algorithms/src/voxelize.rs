//! Rasterisation of spots into intensity and opacity volumes.
//!
//! Every spot is a sphere of radius `radius * size_scale`. Voxels whose
//! centre lies inside the sphere receive a contribution with the spot's
//! normalised intensity and an opacity that fades from 1 at the centre to
//! `border_opacity` at the rim. Overlapping contributions keep the highest
//! intensity; equal intensities keep the highest opacity, so the result does
//! not depend on spot order.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use std::time::{Duration, Instant};

use glam::Vec3;
use spotmap_core::bounds::Bounds;
use spotmap_core::error::{Error, Result};
use spotmap_core::grid::GridIndex;
use spotmap_core::progress::Progress;
use spotmap_core::spot::Spot;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Voxelizer settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VoxelizeConfig {
    /// Multiplier applied to every spot radius.
    pub size_scale: f32,
    /// Opacity at the rim of a spot, in `[0, 1]`.
    pub border_opacity: f32,
    /// Minimum time between two progress reports.
    pub progress_interval: Duration,
}

impl Default for VoxelizeConfig {
    fn default() -> Self {
        Self {
            size_scale: 1.0,
            border_opacity: 0.0,
            progress_interval: Duration::from_millis(100),
        }
    }
}

impl VoxelizeConfig {
    /// Sets the radius multiplier.
    #[must_use]
    pub fn with_size_scale(mut self, scale: f32) -> Self {
        self.size_scale = scale;
        self
    }

    /// Sets the rim opacity.
    #[must_use]
    pub fn with_border_opacity(mut self, opacity: f32) -> Self {
        self.border_opacity = opacity;
        self
    }

    /// Sets the minimum time between progress reports.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.size_scale > 0.0 && self.size_scale.is_finite()) {
            return Err(Error::ConfigError(format!(
                "size_scale must be positive, got {}",
                self.size_scale
            )));
        }
        if !(0.0..=1.0).contains(&self.border_opacity) {
            return Err(Error::ConfigError(format!(
                "border_opacity must be within [0, 1], got {}",
                self.border_opacity
            )));
        }
        Ok(())
    }
}

/// Output of [`voxelize`]: two buffers of `x * y * z` values each.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VoxelBuffers {
    /// Voxel counts `[x, y, z]`.
    pub lengths: [usize; 3],
    /// Normalised intensity per voxel, in `[0, 1]`.
    pub intensity: Vec<f32>,
    /// Opacity per voxel, 0 where no spot reaches.
    pub opacity: Vec<f32>,
    /// Intensity range of the contributing spots, before normalisation.
    pub bounds: Option<Bounds>,
}

impl VoxelBuffers {
    fn zeroed(index: &GridIndex, bounds: Option<Bounds>) -> Self {
        let count = index.len();
        Self {
            lengths: index.lengths(),
            intensity: vec![0.0; count],
            opacity: vec![0.0; count],
            bounds,
        }
    }

    /// Number of voxels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.intensity.len()
    }

    /// True if the volume holds no voxel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intensity.is_empty()
    }
}

/// Voxelizes `spots` into a grid of `lengths` voxels spanning `[0, size]`.
pub fn voxelize<P>(
    lengths: [usize; 3],
    size: Vec3,
    spots: &[Spot],
    config: &VoxelizeConfig,
    progress: &P,
) -> Result<VoxelBuffers>
where
    P: Progress + ?Sized,
{
    config.validate()?;
    let index = GridIndex::try_new(lengths)?;
    if !size.is_finite() || size.min_element() <= 0.0 {
        return Err(Error::InvalidGrid(format!(
            "world size must be positive and finite, got {size}"
        )));
    }

    let bounds = Bounds::from_values(spots.iter().map(Spot::intensity));
    let mut out = VoxelBuffers::zeroed(&index, bounds);
    let Some(bounds) = bounds else {
        return Ok(out);
    };

    let step = size / Vec3::new(lengths[0] as f32, lengths[1] as f32, lengths[2] as f32);
    let max_voxel = Vec3::new(
        (lengths[0] - 1) as f32,
        (lengths[1] - 1) as f32,
        (lengths[2] - 1) as f32,
    );

    let mut last_update = Instant::now();
    let total = spots.len();
    for (done, spot) in spots.iter().enumerate() {
        progress.checkpoint()?;
        if last_update.elapsed() >= config.progress_interval {
            progress.report(format!("Voxelizing: {}%", done * 100 / total));
            last_update = Instant::now();
        }
        if !spot.has_intensity() {
            continue;
        }

        let intensity = if bounds.is_degenerate() {
            1.0
        } else {
            bounds.normalize(spot.intensity())
        };
        let radius = spot.radius() * config.size_scale;

        // Voxel-space box around the sphere; voxel i covers [i, i + 1) * step.
        let lo = ((spot.position() - radius) / step).floor().max(Vec3::ZERO);
        let hi = ((spot.position() + radius) / step).floor().min(max_voxel);
        if lo.cmpgt(hi).any() {
            continue;
        }
        let (x0, y0, z0) = (lo.x as usize, lo.y as usize, lo.z as usize);
        let (x1, y1, z1) = (hi.x as usize, hi.y as usize, hi.z as usize);

        for z in z0..=z1 {
            for y in y0..=y1 {
                for x in x0..=x1 {
                    let center = (Vec3::new(x as f32, y as f32, z as f32) + 0.5) * step;
                    let distance = center.distance(spot.position());
                    if distance > radius {
                        continue;
                    }
                    let t = distance / radius;
                    let opacity = (1.0 - (1.0 - config.border_opacity) * t).clamp(0.0, 1.0);
                    let offset = index.index(x, y, z);
                    blend(
                        &mut out.intensity[offset],
                        &mut out.opacity[offset],
                        intensity,
                        opacity,
                    );
                }
            }
        }
    }

    log::debug!("voxelized {} spots into {:?} voxels", total, lengths);
    Ok(out)
}

/// Lexicographic maximum over `(intensity, opacity)`; empty voxels are `(0, 0)`.
#[inline]
fn blend(intensity: &mut f32, opacity: &mut f32, new_intensity: f32, new_opacity: f32) {
    if new_intensity > *intensity || (new_intensity >= *intensity && new_opacity > *opacity) {
        *intensity = new_intensity;
        *opacity = new_opacity;
    }
}
