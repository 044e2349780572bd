pub mod actor;
pub mod clamper;
pub mod data;
pub mod fitter;
pub mod isector;
pub mod policy;
pub mod probe;
pub mod rapier_world;
pub mod runtime;
pub mod settings;
pub mod types;

pub use actor::{ActorId, BasicActor, ClampEntity, ClampTargets, ClampableActor};
pub use clamper::{ClampBatchEntry, ClampOutcome, ClampRequest, GroundClamper};
pub use data::{ClampType, GroundClampingData};
pub use isector::{SegmentBatch, SegmentHandle, SpatialQuery, SurfaceFnIsector, flat_surface};
pub use policy::{ClampPolicy, DefaultClampPolicy, VelocityLodPolicy};
pub use probe::SurfaceProbeResult;
pub use rapier_world::{RapierIsector, TerrainDef, TerrainError, TerrainQueryWorld, TerrainShapeDef};
pub use runtime::{RuntimeData, get_or_create_runtime_data};
pub use settings::{ClamperSettings, SettingsError};
pub use types::{BoundingBox, Hit, Rot, Transform, Vec3};
