//! Gradient normals of a scalar volume, packed for texture upload.
//!
//! Each voxel gets the central-difference gradient of its neighbours, with
//! samples past the border clamped onto the border voxel. The normalised
//! gradient is mapped from `[-1, 1]` to `[0, 255]` per component.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

use glam::Vec3;
use rayon::prelude::*;
use spotmap_core::error::{Error, Result};
use spotmap_core::grid::{Axis, VolumeGrid};
use spotmap_core::progress::Progress;

/// Packs one unit-vector component into a byte.
#[inline]
fn pack(component: f32) -> u8 {
    ((component.clamp(-1.0, 1.0) + 1.0) * 0.5 * 255.0).round() as u8
}

/// Computes packed RGB normals, three bytes per voxel in grid order.
///
/// Z slices are processed in parallel; cancellation is polled once per
/// slice. Flat regions (zero gradient) pack to `(128, 128, 128)`.
pub fn compute_normals<P>(grid: &VolumeGrid, progress: &P) -> Result<Vec<u8>>
where
    P: Progress + Sync + ?Sized,
{
    let index = grid.grid_index();
    let data = grid.data();
    let [x_length, y_length, _] = index.lengths();
    let mut out = vec![0u8; index.len() * 3];

    progress.report("Computing normals".to_string());
    out.par_chunks_mut(index.pitch() * 3)
        .enumerate()
        .try_for_each(|(z, slice)| -> Result<()> {
            if progress.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let z = z as i64;
            for y in 0..y_length as i64 {
                for x in 0..x_length as i64 {
                    let sample = |dx: i64, dy: i64, dz: i64, axis: Axis| {
                        data[index.index_clipped(x + dx, y + dy, z + dz, axis)]
                    };
                    let gradient = Vec3::new(
                        sample(1, 0, 0, Axis::X) - sample(-1, 0, 0, Axis::X),
                        sample(0, 1, 0, Axis::Y) - sample(0, -1, 0, Axis::Y),
                        sample(0, 0, 1, Axis::Z) - sample(0, 0, -1, Axis::Z),
                    );
                    let normal = gradient.normalize_or_zero();
                    let offset = (y as usize * x_length + x as usize) * 3;
                    slice[offset] = pack(normal.x);
                    slice[offset + 1] = pack(normal.y);
                    slice[offset + 2] = pack(normal.z);
                }
            }
            Ok(())
        })?;

    log::debug!("computed normals for {:?} voxels", index.lengths());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotmap_core::progress::{CancelToken, NoProgress};

    #[test]
    fn test_flat_volume_packs_to_mid_grey() {
        let grid = VolumeGrid::new([3, 2, 2], Vec3::ONE).unwrap();
        let normals = compute_normals(&grid, &NoProgress).unwrap();
        assert_eq!(normals.len(), 3 * 12);
        assert!(normals.iter().all(|&b| b == 128));
    }

    #[test]
    fn test_ramp_along_x() {
        let mut grid = VolumeGrid::new([4, 3, 3], Vec3::ONE).unwrap();
        for z in 0..3 {
            for y in 0..3 {
                for x in 0..4 {
                    grid.set(x, y, z, x as f32);
                }
            }
        }
        let normals = compute_normals(&grid, &NoProgress).unwrap();
        let offset = grid.grid_index().index(1, 1, 1) * 3;
        assert_eq!(&normals[offset..offset + 3], &[255, 128, 128]);
        // Clamped border samples still see the ramp.
        let border = grid.grid_index().index(0, 2, 2) * 3;
        assert_eq!(&normals[border..border + 3], &[255, 128, 128]);
    }

    #[test]
    fn test_descending_z() {
        let mut grid = VolumeGrid::new([2, 2, 3], Vec3::ONE).unwrap();
        for z in 0..3 {
            for y in 0..2 {
                for x in 0..2 {
                    grid.set(x, y, z, 10.0 - z as f32);
                }
            }
        }
        let normals = compute_normals(&grid, &NoProgress).unwrap();
        let offset = grid.grid_index().index(1, 0, 1) * 3;
        assert_eq!(&normals[offset..offset + 3], &[128, 128, 0]);
    }

    #[test]
    fn test_cancelled() {
        let grid = VolumeGrid::new([2, 2, 2], Vec3::ONE).unwrap();
        let token = CancelToken::new();
        token.cancel();
        assert!(compute_normals(&grid, &token).unwrap_err().is_cancelled());
    }
}
