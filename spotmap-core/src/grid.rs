//! Regular 3D grid addressing and dense volume storage.
//!
//! Voxels are stored x-fastest, then y, then z:
//! `index = z * pitch + y * stride + x` with `stride = x_length` and
//! `pitch = stride * y_length`.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use glam::Vec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::error::{Error, Result};

/// Grid axis selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Linear addressing of a `x_length * y_length * z_length` voxel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridIndex {
    x_length: usize,
    y_length: usize,
    z_length: usize,
    stride: usize,
    pitch: usize,
}

impl GridIndex {
    /// Creates the addressing for a grid with the given voxel counts.
    #[must_use]
    pub fn new(x_length: usize, y_length: usize, z_length: usize) -> Self {
        let stride = x_length;
        let pitch = stride * y_length;
        Self {
            x_length,
            y_length,
            z_length,
            stride,
            pitch,
        }
    }

    /// Like [`GridIndex::new`], but rejects empty axes and voxel counts
    /// that do not fit in `usize`.
    pub fn try_new(lengths: [usize; 3]) -> Result<Self> {
        if lengths.contains(&0) {
            return Err(Error::InvalidGrid(format!(
                "every axis needs at least one voxel, got {lengths:?}"
            )));
        }
        let [x_length, y_length, z_length] = lengths;
        x_length
            .checked_mul(y_length)
            .and_then(|pitch| pitch.checked_mul(z_length))
            .ok_or_else(|| Error::InvalidGrid(format!("grid {lengths:?} has too many voxels")))?;
        Ok(Self::new(x_length, y_length, z_length))
    }

    /// Voxel counts `[x, y, z]`.
    #[must_use]
    pub fn lengths(&self) -> [usize; 3] {
        [self.x_length, self.y_length, self.z_length]
    }

    /// Voxel count along one axis.
    #[must_use]
    pub fn length(&self, axis: Axis) -> usize {
        match axis {
            Axis::X => self.x_length,
            Axis::Y => self.y_length,
            Axis::Z => self.z_length,
        }
    }

    /// Distance between consecutive rows.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Distance between consecutive z slices.
    #[must_use]
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Total number of voxels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pitch * self.z_length
    }

    /// True if any axis has zero length.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `(x, y, z)` addresses a voxel of the grid.
    #[must_use]
    pub fn contains(&self, x: usize, y: usize, z: usize) -> bool {
        x < self.x_length && y < self.y_length && z < self.z_length
    }

    /// Linear offset of voxel `(x, y, z)`.
    #[inline]
    #[must_use]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(self.contains(x, y, z), "voxel ({x}, {y}, {z}) out of grid");
        z * self.pitch + y * self.stride + x
    }

    /// Linear offset with the coordinate of `axis` clamped into `[0, length - 1]`.
    ///
    /// Used when sampling neighbours at the border of the grid: `x - 1` at
    /// `x == 0` reads the border voxel instead of wrapping into the
    /// previous row. The other two coordinates must be in range.
    #[inline]
    #[must_use]
    pub fn index_clipped(&self, x: i64, y: i64, z: i64, axis: Axis) -> usize {
        let (x, y, z) = match axis {
            Axis::X => (clamp_to_length(x, self.x_length), y as usize, z as usize),
            Axis::Y => (x as usize, clamp_to_length(y, self.y_length), z as usize),
            Axis::Z => (x as usize, y as usize, clamp_to_length(z, self.z_length)),
        };
        self.index(x, y, z)
    }

    /// Inverse of [`GridIndex::index`].
    #[must_use]
    pub fn coords(&self, offset: usize) -> (usize, usize, usize) {
        debug_assert!(offset < self.len(), "offset {offset} out of grid");
        let z = offset / self.pitch;
        let rest = offset % self.pitch;
        (rest % self.stride, rest / self.stride, z)
    }
}

#[inline]
fn clamp_to_length(value: i64, length: usize) -> usize {
    value.clamp(0, length.saturating_sub(1) as i64) as usize
}

/// Dense scalar volume with its world-space extent.
///
/// `data.len()` always equals the voxel count of `index`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolumeGrid {
    data: Vec<f32>,
    index: GridIndex,
    /// World-space size of the whole grid.
    size: Vec3,
    /// Value range of `data`, when known.
    pub bounds: Option<Bounds>,
}

impl VolumeGrid {
    /// Creates a zero-filled grid.
    pub fn new(lengths: [usize; 3], size: Vec3) -> Result<Self> {
        let index = GridIndex::try_new(lengths)?;
        check_size(size)?;
        Ok(Self {
            data: vec![0.0; index.len()],
            index,
            size,
            bounds: None,
        })
    }

    /// Wraps existing voxel data.
    pub fn from_data(lengths: [usize; 3], size: Vec3, data: Vec<f32>) -> Result<Self> {
        let index = GridIndex::try_new(lengths)?;
        check_size(size)?;
        if data.len() != index.len() {
            return Err(Error::InvalidGrid(format!(
                "data length mismatch: lengths {lengths:?} need {} voxels, got {}",
                index.len(),
                data.len()
            )));
        }
        Ok(Self {
            data,
            index,
            size,
            bounds: None,
        })
    }

    /// Resizes the grid.
    ///
    /// Reallocates (zero-filled) only if the voxel count changes; otherwise
    /// the data is kept and only the lengths and world size are updated.
    /// A missing `size` defaults to the voxel counts. Returns true if the
    /// buffer was reallocated.
    pub fn try_resize(&mut self, lengths: [usize; 3], size: Option<Vec3>) -> Result<bool> {
        let index = GridIndex::try_new(lengths)?;
        let size = size.unwrap_or_else(|| lengths_as_size(lengths));
        check_size(size)?;

        let reallocated = index.len() != self.data.len();
        if reallocated {
            self.data = vec![0.0; index.len()];
            self.bounds = None;
        }
        self.index = index;
        self.size = size;
        Ok(reallocated)
    }

    /// Grid addressing.
    #[must_use]
    pub fn grid_index(&self) -> GridIndex {
        self.index
    }

    /// Voxel counts `[x, y, z]`.
    #[must_use]
    pub fn lengths(&self) -> [usize; 3] {
        self.index.lengths()
    }

    /// World-space size of the whole grid.
    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.size
    }

    /// World-space size of a single voxel.
    #[must_use]
    pub fn step(&self) -> Vec3 {
        self.size / lengths_as_size(self.lengths())
    }

    /// World-space centre of voxel `(x, y, z)`; the grid starts at the origin.
    #[must_use]
    pub fn voxel_center(&self, x: usize, y: usize, z: usize) -> Vec3 {
        (Vec3::new(x as f32, y as f32, z as f32) + 0.5) * self.step()
    }

    /// Voxel values.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable voxel values.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Value of voxel `(x, y, z)`.
    #[must_use]
    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.data[self.index.index(x, y, z)]
    }

    /// Sets voxel `(x, y, z)`.
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: f32) {
        let offset = self.index.index(x, y, z);
        self.data[offset] = value;
    }

    /// Fills every voxel with `value`.
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Recomputes [`VolumeGrid::bounds`] from the data.
    pub fn update_bounds(&mut self) -> Option<Bounds> {
        self.bounds = Bounds::from_values(self.data.iter().copied());
        self.bounds
    }
}

fn check_size(size: Vec3) -> Result<()> {
    if !size.is_finite() || size.min_element() <= 0.0 {
        return Err(Error::InvalidGrid(format!(
            "world size must be positive and finite, got {size}"
        )));
    }
    Ok(())
}

fn lengths_as_size(lengths: [usize; 3]) -> Vec3 {
    Vec3::new(lengths[0] as f32, lengths[1] as f32, lengths[2] as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_index_is_bijection() {
        for &(nx, ny, nz) in &[(1, 1, 1), (3, 4, 5), (7, 1, 2), (2, 9, 3)] {
            let grid = GridIndex::new(nx, ny, nz);
            let mut seen = HashSet::new();
            for z in 0..nz {
                for y in 0..ny {
                    for x in 0..nx {
                        let offset = grid.index(x, y, z);
                        assert!(offset < grid.len());
                        assert!(seen.insert(offset), "duplicate offset {offset}");
                        assert_eq!(grid.coords(offset), (x, y, z));
                    }
                }
            }
            assert_eq!(seen.len(), nx * ny * nz);
        }
    }

    #[test]
    fn test_index_corners() {
        let grid = GridIndex::new(4, 5, 6);
        assert_eq!(grid.index(0, 0, 0), 0);
        assert_eq!(grid.index(3, 4, 5), 4 * 5 * 6 - 1);
        assert_eq!(grid.stride(), 4);
        assert_eq!(grid.pitch(), 20);
    }

    #[test]
    fn test_index_clipped_per_axis() {
        let grid = GridIndex::new(4, 5, 6);
        assert_eq!(grid.index_clipped(-1, 2, 3, Axis::X), grid.index(0, 2, 3));
        assert_eq!(grid.index_clipped(4, 2, 3, Axis::X), grid.index(3, 2, 3));
        assert_eq!(grid.index_clipped(1, -3, 3, Axis::Y), grid.index(1, 0, 3));
        assert_eq!(grid.index_clipped(1, 5, 3, Axis::Y), grid.index(1, 4, 3));
        assert_eq!(grid.index_clipped(1, 2, -1, Axis::Z), grid.index(1, 2, 0));
        assert_eq!(grid.index_clipped(1, 2, 60, Axis::Z), grid.index(1, 2, 5));
        assert_eq!(grid.index_clipped(1, 2, 3, Axis::Z), grid.index(1, 2, 3));
    }

    #[test]
    fn test_volume_resize_keeps_buffer_when_count_matches() {
        let mut volume = VolumeGrid::new([2, 3, 4], Vec3::new(2.0, 3.0, 4.0)).unwrap();
        volume.fill(7.0);

        // Same voxel count, different shape: no reallocation.
        let reallocated = volume
            .try_resize([4, 3, 2], Some(Vec3::new(8.0, 6.0, 4.0)))
            .unwrap();
        assert!(!reallocated);
        assert_eq!(volume.lengths(), [4, 3, 2]);
        assert_eq!(volume.size(), Vec3::new(8.0, 6.0, 4.0));
        assert!(volume.data().iter().all(|&v| (v - 7.0).abs() < f32::EPSILON));

        let reallocated = volume.try_resize([5, 5, 5], None).unwrap();
        assert!(reallocated);
        assert_eq!(volume.data().len(), 125);
        assert_eq!(volume.size(), Vec3::splat(5.0));
        assert!(volume.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_volume_rejects_bad_input() {
        assert!(VolumeGrid::new([0, 1, 1], Vec3::ONE).is_err());
        assert!(VolumeGrid::new([1, 1, 1], Vec3::new(1.0, 0.0, 1.0)).is_err());
        assert!(VolumeGrid::from_data([2, 2, 2], Vec3::ONE, vec![0.0; 7]).is_err());
    }

    #[test]
    fn test_grid_rejects_overflowing_lengths() {
        assert!(GridIndex::try_new([usize::MAX, 2, 1]).is_err());
        assert!(GridIndex::try_new([1 << 32, 1 << 32, 1 << 32]).is_err());
        assert!(GridIndex::try_new([3, 0, 2]).is_err());
        assert_eq!(GridIndex::try_new([3, 4, 5]).unwrap().len(), 60);
        assert!(VolumeGrid::new([usize::MAX, usize::MAX, 1], Vec3::ONE).is_err());
    }

    #[test]
    fn test_update_bounds_skips_nan() {
        let data = vec![f32::NAN, 2.0, -1.0, f32::NAN, 5.0, 0.0, f32::NAN, 3.0];
        let mut volume = VolumeGrid::from_data([2, 2, 2], Vec3::ONE, data).unwrap();
        assert!(volume.bounds.is_none());
        let bounds = volume.update_bounds().unwrap();
        assert_eq!((bounds.min, bounds.max), (-1.0, 5.0));
        assert_eq!(volume.bounds, Some(bounds));

        volume.fill(f32::NAN);
        assert!(volume.update_bounds().is_none());
        assert!(volume.bounds.is_none());
    }

    #[test]
    fn test_voxel_center() {
        let volume = VolumeGrid::new([4, 2, 1], Vec3::new(2.0, 2.0, 1.0)).unwrap();
        assert_eq!(volume.step(), Vec3::new(0.5, 1.0, 1.0));
        assert_eq!(volume.voxel_center(0, 0, 0), Vec3::new(0.25, 0.5, 0.5));
        assert_eq!(volume.voxel_center(3, 1, 0), Vec3::new(1.75, 1.5, 0.5));
    }
}
