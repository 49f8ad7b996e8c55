//! Built-in task types.
//!
//! | key        | args             | payload           | cancellation |
//! |------------|------------------|-------------------|--------------|
//! | `mapping`  | [`MappingArgs`]  | [`SpotMapping`]   | cooperative  |
//! | `voxelize` | [`VoxelizeArgs`] | [`VoxelBuffers`]  | cooperative  |
//! | `normals`  | [`NormalsArgs`]  | [`NormalsPayload`]| cooperative  |
//! | `cuboids`  | [`CuboidArgs`]   | [`VolumeGrid`]    | cooperative  |
//! | `raycast`  | [`RaycastArgs`]  | [`RaycastPayload`]| abandoned    |

use glam::Vec3;
use serde::{Deserialize, Serialize};
use spotmap_algorithms::{
    compute_normals, map_vertices, raycast, remap_cuboids, voxelize, Cuboid, RayHit,
    SpotMapping, VoxelBuffers, VoxelizeConfig,
};
use spotmap_core::{Ray, Spot, VolumeGrid};

use crate::orchestrator::TaskType;
use crate::protocol::{Worker, WorkerPort};

pub const MAPPING_KEY: &str = "mapping";
pub const VOXELIZE_KEY: &str = "voxelize";
pub const NORMALS_KEY: &str = "normals";
pub const RAYCAST_KEY: &str = "raycast";
pub const CUBOIDS_KEY: &str = "cuboids";

/// Mesh positions and the spots to map them to.
#[derive(Debug, Clone)]
pub struct MappingArgs {
    /// Flat `[x, y, z, ...]` vertex positions.
    pub positions: Vec<f32>,
    pub spots: Vec<Spot>,
}

/// Assigns every mesh vertex its nearest enclosing spot.
#[derive(Debug, Default)]
pub struct MappingWorker;

impl Worker for MappingWorker {
    type Args = MappingArgs;
    type Payload = SpotMapping;

    fn run(self, port: WorkerPort<MappingArgs, SpotMapping>) {
        port.serve(|args, progress| map_vertices(&args.positions, &args.spots, progress));
    }
}

/// Grid description and spots for the voxelizer.
#[derive(Debug, Clone)]
pub struct VoxelizeArgs {
    /// Voxel counts `[x, y, z]`.
    pub lengths: [usize; 3],
    /// World-space size of the grid.
    pub size: Vec3,
    pub spots: Vec<Spot>,
    pub config: VoxelizeConfig,
}

/// Rasterises spots into intensity and opacity volumes.
#[derive(Debug, Default)]
pub struct VoxelizeWorker;

impl Worker for VoxelizeWorker {
    type Args = VoxelizeArgs;
    type Payload = VoxelBuffers;

    fn run(self, port: WorkerPort<VoxelizeArgs, VoxelBuffers>) {
        port.serve(|args, progress| {
            voxelize(args.lengths, args.size, &args.spots, &args.config, progress)
        });
    }
}

/// Volume to compute normals for.
#[derive(Debug, Clone)]
pub struct NormalsArgs {
    pub grid: VolumeGrid,
}

/// Packed RGB normals, three bytes per voxel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalsPayload {
    pub lengths: [usize; 3],
    pub normals: Vec<u8>,
}

/// Computes packed gradient normals of a volume.
#[derive(Debug, Default)]
pub struct NormalsWorker;

impl Worker for NormalsWorker {
    type Args = NormalsArgs;
    type Payload = NormalsPayload;

    fn run(self, port: WorkerPort<NormalsArgs, NormalsPayload>) {
        port.serve(|args, progress| {
            let normals = compute_normals(&args.grid, progress)?;
            Ok(NormalsPayload {
                lengths: args.grid.lengths(),
                normals,
            })
        });
    }
}

/// Grid description and the cuboids to paint into it.
#[derive(Debug, Clone)]
pub struct CuboidArgs {
    /// Voxel counts `[x, y, z]`.
    pub lengths: [usize; 3],
    /// World-space size of the grid.
    pub size: Vec3,
    pub cuboids: Vec<Cuboid>,
}

/// Paints cuboids into a volume; unpainted voxels are NaN.
#[derive(Debug, Default)]
pub struct CuboidWorker;

impl Worker for CuboidWorker {
    type Args = CuboidArgs;
    type Payload = VolumeGrid;

    fn run(self, port: WorkerPort<CuboidArgs, VolumeGrid>) {
        port.serve(|args, progress| {
            remap_cuboids(args.lengths, args.size, &args.cuboids, progress)
        });
    }
}

/// Ray in mesh-local space and the mesh's triangle positions.
#[derive(Debug, Clone)]
pub struct RaycastArgs {
    pub ray: Ray,
    /// Flat, non-indexed triangle positions.
    pub positions: Vec<f32>,
}

/// Nearest hit, `None` on a miss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaycastPayload {
    pub hit: Option<RayHit>,
}

/// Finds the triangle under a ray. Does not poll for cancellation; a
/// cancelled raycast is abandoned and its result dropped.
#[derive(Debug, Default)]
pub struct RaycastWorker;

impl Worker for RaycastWorker {
    type Args = RaycastArgs;
    type Payload = RaycastPayload;

    fn run(self, port: WorkerPort<RaycastArgs, RaycastPayload>) {
        port.serve(|args, _| {
            raycast(&args.ray, &args.positions).map(|hit| RaycastPayload { hit })
        });
    }
}

/// `mapping` task type.
#[must_use]
pub fn mapping_task() -> TaskType<MappingWorker> {
    TaskType::new(MAPPING_KEY, || Ok(MappingWorker))
}

/// `voxelize` task type.
#[must_use]
pub fn voxelize_task() -> TaskType<VoxelizeWorker> {
    TaskType::new(VOXELIZE_KEY, || Ok(VoxelizeWorker))
}

/// `normals` task type.
#[must_use]
pub fn normals_task() -> TaskType<NormalsWorker> {
    TaskType::new(NORMALS_KEY, || Ok(NormalsWorker))
}

/// `raycast` task type.
#[must_use]
pub fn raycast_task() -> TaskType<RaycastWorker> {
    TaskType::new(RAYCAST_KEY, || Ok(RaycastWorker))
}

/// `cuboids` task type.
#[must_use]
pub fn cuboids_task() -> TaskType<CuboidWorker> {
    TaskType::new(CUBOIDS_KEY, || Ok(CuboidWorker))
}
