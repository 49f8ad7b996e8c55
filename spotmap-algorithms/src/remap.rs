//! Remapping of axis-aligned cuboids onto a volume.
//!
//! Each cuboid paints every voxel whose cell it overlaps with its
//! intensity; later cuboids overwrite earlier ones. Voxels no cuboid
//! touches stay NaN, meaning "not coloured".
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use glam::Vec3;
use spotmap_core::bounds::Bounds;
use spotmap_core::error::{Error, Result};
use spotmap_core::grid::VolumeGrid;
use spotmap_core::progress::Progress;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis-aligned box carrying one measured value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cuboid {
    /// Centre in volume space.
    pub center: Vec3,
    /// Edge lengths, non-negative.
    pub size: Vec3,
    /// Value painted into the covered voxels.
    pub intensity: f32,
}

impl Cuboid {
    /// Creates a cuboid.
    #[must_use]
    pub fn new(center: Vec3, size: Vec3, intensity: f32) -> Self {
        Self {
            center,
            size,
            intensity,
        }
    }

    fn validate(&self, position: usize) -> Result<()> {
        if !self.center.is_finite() || !self.size.is_finite() || self.size.min_element() < 0.0 {
            return Err(Error::InvalidGeometry(format!(
                "cuboid {position} has centre {} and size {}",
                self.center, self.size
            )));
        }
        Ok(())
    }
}

/// Paints `cuboids` into a NaN-filled grid of `lengths` voxels spanning `[0, size]`.
///
/// The returned grid's bounds are the range of the cuboid intensities.
/// Cuboids reaching past the volume are clipped to it; cuboids entirely
/// outside leave no trace. Progress is reported and cancellation polled
/// once per cuboid.
pub fn remap_cuboids<P>(
    lengths: [usize; 3],
    size: Vec3,
    cuboids: &[Cuboid],
    progress: &P,
) -> Result<VolumeGrid>
where
    P: Progress + ?Sized,
{
    let mut grid = VolumeGrid::new(lengths, size)?;
    grid.fill(f32::NAN);
    grid.bounds = Bounds::from_values(cuboids.iter().map(|c| c.intensity));

    let index = grid.grid_index();
    let step = grid.step();
    let max_voxel = Vec3::new(
        (lengths[0] - 1) as f32,
        (lengths[1] - 1) as f32,
        (lengths[2] - 1) as f32,
    );

    let total = cuboids.len();
    progress.report(format!("Remapping {total} cuboids"));
    for (position, cuboid) in cuboids.iter().enumerate() {
        progress.checkpoint()?;
        cuboid.validate(position)?;

        let start = cuboid.center - cuboid.size * 0.5;
        let end = start + cuboid.size;
        if end.cmpgt(size).any() {
            log::warn!("cuboid {position} ends at {end}, beyond the volume {size}");
        }
        if end.cmplt(Vec3::ZERO).any() || start.cmpge(size).any() {
            log::debug!("cuboid {position} lies outside the volume");
            progress.report(format!("Remapping cuboids: {} of {total}", position + 1));
            continue;
        }

        // Voxel i covers [i, i + 1) * step. A flat cuboid still paints one layer.
        let lo = (start / step).floor().max(Vec3::ZERO).min(max_voxel);
        let hi = ((end / step).ceil() - 1.0).max(lo).min(max_voxel);
        let (x0, y0, z0) = (lo.x as usize, lo.y as usize, lo.z as usize);
        let (x1, y1, z1) = (hi.x as usize, hi.y as usize, hi.z as usize);

        let data = grid.data_mut();
        for z in z0..=z1 {
            for y in y0..=y1 {
                let row = index.index(x0, y, z);
                data[row..=row + (x1 - x0)].fill(cuboid.intensity);
            }
        }
        progress.report(format!("Remapping cuboids: {} of {total}", position + 1));
    }

    log::debug!("remapped {total} cuboids into {lengths:?} voxels");
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotmap_core::progress::{CancelToken, NoProgress};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<String>>);

    impl Progress for Recorder {
        fn report(&self, message: String) {
            self.0.borrow_mut().push(message);
        }

        fn is_cancelled(&self) -> bool {
            false
        }
    }

    fn painted(grid: &VolumeGrid) -> usize {
        grid.data().iter().filter(|v| !v.is_nan()).count()
    }

    #[test]
    fn test_untouched_voxels_stay_nan() {
        let grid = remap_cuboids([4, 4, 4], Vec3::splat(4.0), &[], &NoProgress).unwrap();
        assert_eq!(grid.data().len(), 64);
        assert_eq!(painted(&grid), 0);
        assert!(grid.bounds.is_none());
    }

    #[test]
    fn test_cuboid_fills_covered_cells() {
        // Covers [1, 3) x [0, 1) x [2, 4).
        let cuboids = [Cuboid::new(Vec3::new(2.0, 0.5, 3.0), Vec3::new(2.0, 1.0, 2.0), 5.0)];
        let grid = remap_cuboids([4, 4, 4], Vec3::splat(4.0), &cuboids, &NoProgress).unwrap();
        assert_eq!(painted(&grid), 4);
        assert_eq!(grid.get(1, 0, 2), 5.0);
        assert_eq!(grid.get(2, 0, 3), 5.0);
        assert!(grid.get(0, 0, 2).is_nan());
        assert!(grid.get(3, 0, 2).is_nan());
        assert!(grid.get(1, 1, 2).is_nan());
    }

    #[test]
    fn test_cuboid_is_clipped_to_volume() {
        let cuboids = [
            Cuboid::new(Vec3::new(3.5, 0.5, 0.5), Vec3::new(3.0, 0.5, 0.5), 1.0),
            Cuboid::new(Vec3::splat(-5.0), Vec3::ONE, 9.0),
            Cuboid::new(Vec3::splat(50.0), Vec3::ONE, 9.0),
        ];
        let grid = remap_cuboids([4, 4, 4], Vec3::splat(4.0), &cuboids, &NoProgress).unwrap();
        assert_eq!(painted(&grid), 2);
        assert_eq!(grid.get(2, 0, 0), 1.0);
        assert_eq!(grid.get(3, 0, 0), 1.0);
        // Bounds cover every cuboid, painted or not.
        let bounds = grid.bounds.unwrap();
        assert_eq!((bounds.min, bounds.max), (1.0, 9.0));
    }

    #[test]
    fn test_flat_cuboid_paints_one_layer() {
        let cuboids = [Cuboid::new(Vec3::new(1.5, 1.5, 2.0), Vec3::new(1.0, 1.0, 0.0), 3.0)];
        let grid = remap_cuboids([3, 3, 3], Vec3::splat(3.0), &cuboids, &NoProgress).unwrap();
        assert_eq!(painted(&grid), 1);
        assert_eq!(grid.get(1, 1, 2), 3.0);
    }

    #[test]
    fn test_later_cuboids_overwrite() {
        let cuboids = [
            Cuboid::new(Vec3::splat(1.0), Vec3::splat(2.0), 1.0),
            Cuboid::new(Vec3::splat(1.5), Vec3::ONE, 2.0),
        ];
        let grid = remap_cuboids([2, 2, 2], Vec3::splat(2.0), &cuboids, &NoProgress).unwrap();
        assert_eq!(grid.get(0, 0, 0), 1.0);
        assert_eq!(grid.get(1, 1, 1), 2.0);
    }

    #[test]
    fn test_progress_per_cuboid() {
        let cuboids = [
            Cuboid::new(Vec3::splat(0.5), Vec3::ONE, 1.0),
            Cuboid::new(Vec3::splat(1.5), Vec3::ONE, 2.0),
        ];
        let recorder = Recorder::default();
        remap_cuboids([2, 2, 2], Vec3::splat(2.0), &cuboids, &recorder).unwrap();
        assert_eq!(
            recorder.0.into_inner(),
            vec![
                "Remapping 2 cuboids".to_string(),
                "Remapping cuboids: 1 of 2".to_string(),
                "Remapping cuboids: 2 of 2".to_string(),
            ]
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        let negative = [Cuboid::new(Vec3::ONE, Vec3::new(1.0, -1.0, 1.0), 1.0)];
        let err = remap_cuboids([2, 2, 2], Vec3::splat(2.0), &negative, &NoProgress).unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry(_)));
        assert!(remap_cuboids([0, 2, 2], Vec3::splat(2.0), &[], &NoProgress).is_err());

        let token = CancelToken::new();
        token.cancel();
        let cuboids = [Cuboid::new(Vec3::ONE, Vec3::ONE, 1.0)];
        let err = remap_cuboids([2, 2, 2], Vec3::splat(2.0), &cuboids, &token).unwrap_err();
        assert!(err.is_cancelled());
    }
}
