//! spotmap-core: Core types for mapping scattered measurements onto geometry.
//!
//! This crate provides the data model shared by the algorithms and the task
//! layer: measurement spots, value bounds, regular grid addressing, dense
//! volumes, basic geometry and the progress/cancellation hooks used by long
//! computations.
//!

pub mod bounds;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod progress;
pub mod spot;

pub use bounds::Bounds;
pub use error::{Error, Result};
pub use geometry::{Aabb, Plane, Ray};
pub use grid::{Axis, GridIndex, VolumeGrid};
pub use progress::{CancelToken, NoProgress, Progress};
pub use spot::{Spot, SpotDataset, SpotRecord};

pub use glam;
