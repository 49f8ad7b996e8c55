//! spotmap-tasks: Off-thread execution of spotmap computations.
//!
//! Long computations run on worker threads that follow a small message
//! protocol (`ready` → setup → `working`* → `completed` | `failed`). The
//! [`TaskOrchestrator`] keeps at most one task per key, relays progress to a
//! [`StatusSink`] and hands results back through a [`TaskHandle`].
//!

mod error;
mod orchestrator;
pub mod protocol;
mod status;
pub mod workers;

pub use error::{Result, TaskError};
pub use orchestrator::{OrchestratorConfig, TaskHandle, TaskOrchestrator, TaskType};
pub use protocol::{
    Command, LifecycleMonitor, LifecycleState, PortProgress, TaskMessage, Worker, WorkerPort,
};
pub use status::{ChannelStatus, LogStatus, StatusEvent, StatusSink};
pub use workers::{
    cuboids_task, mapping_task, normals_task, raycast_task, voxelize_task, CuboidArgs,
    MappingArgs, NormalsArgs, NormalsPayload, RaycastArgs, RaycastPayload, VoxelizeArgs,
};
