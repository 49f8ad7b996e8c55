//! spotmap-algorithms: Spatial kernels for mapping spots onto geometry.
//!
//! This crate provides the compute-heavy operations run by the task layer:
//! - **Mapping** - nearest enclosing spot per mesh vertex, plus recolouring
//! - **Raycast** - nearest ray / triangle hit for picking
//! - **Voxelize** - spots rasterised into intensity and opacity volumes
//! - **Normals** - packed gradient normals of a volume (parallel)
//! - **Remap** - axis-aligned cuboids painted into a volume
//! - **Section** - planar cross-section of a box (synchronous)
//!
#![warn(missing_docs)]

mod mapping;
mod normals;
mod raycast;
mod remap;
mod section;
mod voxelize;

pub use mapping::{
    map_vertices, nearest_enclosing_spot, recolor, RecolorConfig, SpotMapping, SpotStyle,
};
pub use normals::compute_normals;
pub use raycast::{intersect_triangle, pick_spot, raycast, RayHit};
pub use remap::{remap_cuboids, Cuboid};
pub use section::{extract_section, SectionCache, SectionPolygon};
pub use voxelize::{voxelize, VoxelBuffers, VoxelizeConfig};

// Re-export the core types every entry point takes
pub use spotmap_core::{Aabb, CancelToken, NoProgress, Plane, Progress, Ray, Spot, VolumeGrid};
