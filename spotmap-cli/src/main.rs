//! spotmap CLI
//!
//! Runs the spot mapping pipeline on JSON inputs: mesh mapping, volume
//! voxelization, cuboid remapping, box sections and ray picking.
#![allow(
    clippy::uninlined_format_args,
    clippy::needless_pass_by_value,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

mod io;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use spotmap_algorithms::{extract_section, pick_spot, Cuboid, RayHit, VoxelizeConfig};
use spotmap_core::glam::{Mat4, Vec3};
use spotmap_core::{Aabb, Bounds, Plane, Ray, Spot, SpotDataset};
use spotmap_tasks::{
    cuboids_task, mapping_task, raycast_task, voxelize_task, CuboidArgs, LogStatus, MappingArgs,
    RaycastArgs, TaskError, TaskOrchestrator, VoxelizeArgs,
};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] spotmap_core::Error),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Maps measurement spots onto meshes and volumes.
#[derive(Parser)]
#[command(name = "spotmap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign every mesh vertex its nearest enclosing spot
    Map {
        /// Spot dataset (JSON array of {name, x, y, z, r, measures})
        #[arg(short, long)]
        spots: PathBuf,

        /// Mesh positions (JSON array of x, y, z triples)
        #[arg(short, long)]
        mesh: PathBuf,

        /// Measure used for spot intensities
        #[arg(long, default_value = "0")]
        measure: usize,

        /// Output JSON file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rasterise spots into intensity and opacity volumes
    Voxelize {
        /// Spot dataset
        #[arg(short, long)]
        spots: PathBuf,

        /// Voxel counts x,y,z
        #[arg(long, value_delimiter = ',', num_args = 3, required = true)]
        lengths: Vec<usize>,

        /// World size x,y,z (defaults to the voxel counts)
        #[arg(long, value_delimiter = ',', num_args = 3)]
        size: Option<Vec<f32>>,

        /// Measure used for spot intensities
        #[arg(long, default_value = "0")]
        measure: usize,

        /// Radius multiplier
        #[arg(long, default_value = "1.0")]
        size_scale: f32,

        /// Opacity at the rim of a spot
        #[arg(long, default_value = "0.0")]
        border_opacity: f32,

        /// Raw output: intensity then opacity, little-endian f32
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Paint axis-aligned cuboids into a volume
    Remap {
        /// Cuboids (JSON array of {center, size, intensity})
        #[arg(short, long)]
        cuboids: PathBuf,

        /// Voxel counts x,y,z
        #[arg(long, value_delimiter = ',', num_args = 3, required = true)]
        lengths: Vec<usize>,

        /// World size x,y,z (defaults to the voxel counts)
        #[arg(long, value_delimiter = ',', num_args = 3)]
        size: Option<Vec<f32>>,

        /// Raw output: little-endian f32, NaN where no cuboid reaches
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Cut an axis-aligned box with a plane
    Section {
        /// Box minimum x,y,z
        #[arg(long, value_delimiter = ',', num_args = 3, allow_hyphen_values = true, required = true)]
        min: Vec<f32>,

        /// Box maximum x,y,z
        #[arg(long, value_delimiter = ',', num_args = 3, allow_hyphen_values = true, required = true)]
        max: Vec<f32>,

        /// Point on the plane x,y,z
        #[arg(long, value_delimiter = ',', num_args = 3, allow_hyphen_values = true, required = true)]
        origin: Vec<f32>,

        /// Plane normal x,y,z
        #[arg(long, value_delimiter = ',', num_args = 3, allow_hyphen_values = true, required = true)]
        normal: Vec<f32>,

        /// Output JSON file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Find the mesh triangle (and spot) under a ray
    Pick {
        /// Mesh triangle positions (JSON array, 9 floats per triangle)
        #[arg(short, long)]
        mesh: PathBuf,

        /// Ray origin x,y,z in world space
        #[arg(long, value_delimiter = ',', num_args = 3, allow_hyphen_values = true, required = true)]
        origin: Vec<f32>,

        /// Ray direction x,y,z in world space
        #[arg(long, value_delimiter = ',', num_args = 3, allow_hyphen_values = true, required = true)]
        direction: Vec<f32>,

        /// Column-major 4x4 mesh world matrix (identity if omitted)
        #[arg(long, value_delimiter = ',', num_args = 16, allow_hyphen_values = true)]
        world: Option<Vec<f32>>,

        /// Spot dataset used to label the hit
        #[arg(short, long)]
        spots: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct VoxelReport {
    lengths: [usize; 3],
    voxels: usize,
    bounds: Option<Bounds>,
    bytes: usize,
    output: PathBuf,
}

#[derive(Serialize)]
struct PickReport {
    hit: Option<RayHit>,
    spot: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(err) = run(cli.command) {
        log::error!("{err}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    let orchestrator = TaskOrchestrator::new(Arc::new(LogStatus));

    match command {
        Commands::Map {
            spots,
            mesh,
            measure,
            output,
        } => {
            let spots = load_spots(&spots, measure)?;
            let positions: Vec<f32> = io::read_json(&mesh)?;
            log::debug!(
                "mapping {} vertices onto {} spots",
                positions.len() / 3,
                spots.len()
            );
            let mapping = orchestrator
                .run(&mapping_task(), MappingArgs { positions, spots })
                .wait()?;
            log::info!(
                "{} of {} vertices lie inside a spot",
                mapping.mapped_count(),
                mapping.len()
            );
            io::write_json(output.as_deref(), &mapping)
        }

        Commands::Voxelize {
            spots,
            lengths,
            size,
            measure,
            size_scale,
            border_opacity,
            output,
        } => {
            let lengths = to_lengths(&lengths)?;
            let size = grid_size(lengths, size.as_deref())?;
            let config = VoxelizeConfig::default()
                .with_size_scale(size_scale)
                .with_border_opacity(border_opacity);
            let spots = load_spots(&spots, measure)?;

            let buffers = orchestrator
                .run(
                    &voxelize_task(),
                    VoxelizeArgs {
                        lengths,
                        size,
                        spots,
                        config,
                    },
                )
                .wait()?;
            let bytes = io::write_f32_le(&output, &[&buffers.intensity, &buffers.opacity])?;
            io::write_json(
                None,
                &VoxelReport {
                    lengths,
                    voxels: buffers.len(),
                    bounds: buffers.bounds,
                    bytes,
                    output,
                },
            )
        }

        Commands::Remap {
            cuboids,
            lengths,
            size,
            output,
        } => {
            let lengths = to_lengths(&lengths)?;
            let size = grid_size(lengths, size.as_deref())?;
            let cuboids: Vec<Cuboid> = io::read_json(&cuboids)?;
            log::debug!("remapping {} cuboids into {lengths:?} voxels", cuboids.len());

            let grid = orchestrator
                .run(
                    &cuboids_task(),
                    CuboidArgs {
                        lengths,
                        size,
                        cuboids,
                    },
                )
                .wait()?;
            let bytes = io::write_f32_le(&output, &[grid.data()])?;
            io::write_json(
                None,
                &VoxelReport {
                    lengths,
                    voxels: grid.data().len(),
                    bounds: grid.bounds,
                    bytes,
                    output,
                },
            )
        }

        Commands::Section {
            min,
            max,
            origin,
            normal,
            output,
        } => {
            let aabb = Aabb::new(to_vec3("min", &min)?, to_vec3("max", &max)?);
            let plane =
                Plane::from_normal_and_point(to_vec3("normal", &normal)?, to_vec3("origin", &origin)?)?;
            let section = extract_section(&aabb, &plane);
            if section.is_empty() {
                log::info!("plane does not cut the box");
            }
            io::write_json(output.as_deref(), &section)
        }

        Commands::Pick {
            mesh,
            origin,
            direction,
            world,
            spots,
        } => {
            let positions: Vec<f32> = io::read_json(&mesh)?;
            let world = match world {
                Some(values) if values.len() == 16 => Mat4::from_cols_slice(&values),
                Some(values) => {
                    return Err(CliError::InvalidArgument(format!(
                        "world matrix needs 16 components, got {}",
                        values.len()
                    )))
                }
                None => Mat4::IDENTITY,
            };
            let ray = Ray::new(to_vec3("origin", &origin)?, to_vec3("direction", &direction)?)
                .to_local(&world)?;

            // Label lookup needs the vertex mapping; compute it alongside the raycast.
            let labels = match spots {
                Some(path) => {
                    let spots = load_spots(&path, 0)?;
                    let handle = orchestrator.run(
                        &mapping_task(),
                        MappingArgs {
                            positions: positions.clone(),
                            spots: spots.clone(),
                        },
                    );
                    Some((handle, spots))
                }
                None => None,
            };
            let hit = orchestrator
                .run(&raycast_task(), RaycastArgs { ray, positions })
                .wait()?
                .hit;

            let spot = match (labels, hit) {
                (Some((handle, spots)), Some(hit)) => {
                    let mapping = handle.wait()?;
                    pick_spot(&hit, &mapping).map(|index| spots[index].name().to_string())
                }
                _ => None,
            };
            io::write_json(None, &PickReport { hit, spot })
        }
    }
}

fn load_spots(path: &Path, measure: usize) -> Result<Vec<Spot>> {
    let dataset: SpotDataset = io::read_json(path)?;
    if dataset.is_empty() {
        log::warn!("{} contains no spots", path.display());
    } else if measure >= dataset.measure_count() {
        log::warn!(
            "measure {measure} not present in {} ({} measures), spots carry no intensity",
            path.display(),
            dataset.measure_count()
        );
    }
    Ok(dataset.spots(measure)?)
}

fn to_vec3(name: &str, values: &[f32]) -> Result<Vec3> {
    match values {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(CliError::InvalidArgument(format!(
            "{name} needs 3 components, got {}",
            values.len()
        ))),
    }
}

/// World size of a grid; defaults to one unit per voxel.
fn grid_size(lengths: [usize; 3], size: Option<&[f32]>) -> Result<Vec3> {
    match size {
        Some(size) => to_vec3("size", size),
        None => Ok(Vec3::new(
            lengths[0] as f32,
            lengths[1] as f32,
            lengths[2] as f32,
        )),
    }
}

fn to_lengths(values: &[usize]) -> Result<[usize; 3]> {
    <[usize; 3]>::try_from(values).map_err(|_| {
        CliError::InvalidArgument(format!("lengths need 3 components, got {}", values.len()))
    })
}
