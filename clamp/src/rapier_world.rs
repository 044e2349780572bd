//! Rapier-based terrain query world and its [`SpatialQuery`] backend.
//!
//! This module builds an in-memory Rapier collider set from a list of static
//! terrain definitions and answers vertical probe segments against it.
//!
//! Design goals
//! - Deterministic: given the same inputs (sorted by `id`), build identical in-memory sets.
//! - Query-focused: no rigid bodies, no stepping. Terrain is immutable after construction.
//! - Every crossing: a probe reports one hit per convex collider it enters and one hit per
//!   triangle layer of a mesh, so stacked geometry (bridges over ground, overhangs, cave
//!   roofs inside one heightmap mesh) is visible to the closest-hit selection.

use std::sync::Arc;

// Re-export Rapier so downstream crates can build terrain from Rapier types
// without needing to depend on `rapier3d` directly.
pub use rapier3d;

use rapier3d::na::{Point3, Vector3};
use rapier3d::parry::bounding_volume::Aabb;
use rapier3d::parry::query::{Ray, RayCast};
use rapier3d::prelude::{
    Collider, ColliderBuilder, ColliderHandle, ColliderSet, HalfSpace, SharedShape, UnitVector,
};

use crate::{
    isector::{SegmentBatch, SegmentHandle, SpatialQuery},
    settings::{DEFAULT_BATCH_CAPACITY, DIST_EPS, LAYER_SKIP_DIST},
    types::{Hit, Rot, Vec3, is_finite},
};

/// Canonical definition of an immutable piece of terrain.
///
/// Conventions
/// - Units are meters, Z-up.
/// - For planes the normal is derived from the pose: `normal = rotation * +Z`, and the
///   plane passes through `translation + normal * offset_along_normal`.
#[derive(Clone, Debug)]
pub struct TerrainDef {
    /// Stable unique identifier used to ensure deterministic insertion order.
    pub id: u32,
    /// World-space translation.
    pub translation: Vec3,
    /// World-space rotation.
    pub rotation: Rot,
    /// Collider shape parameters.
    pub shape: TerrainShapeDef,
}

/// Supported terrain shapes.
#[derive(Clone, Debug)]
pub enum TerrainShapeDef {
    /// Infinite plane (half-space). Everything below the plane is solid.
    Plane {
        /// Offset along the plane normal (meters).
        offset_along_normal: f32,
    },

    /// Oriented cuboid with given half-extents (meters). Decks, ramps, platforms.
    Cuboid { half_extents: Vec3 },

    /// Sphere/ball (meters). Boulders and mounds.
    Ball { radius: f32 },

    /// Triangle mesh in the definition's local frame.
    Trimesh {
        vertices: Vec<Vec3>,
        indices: Vec<[u32; 3]>,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TerrainError {
    #[error("terrain {id} has a non-finite pose")]
    NonFinitePose { id: u32 },
    #[error("terrain {id} has an invalid shape: {reason}")]
    InvalidShape { id: u32, reason: String },
}

/// Static Rapier colliders plus their world-space bounds for segment pruning.
/// Planes are unbounded and carry no bounds.
pub struct TerrainQueryWorld {
    colliders: ColliderSet,
    entries: Vec<TerrainEntry>,
}

struct TerrainEntry {
    handle: ColliderHandle,
    aabb: Option<Aabb>,
    /// Meshes can be crossed more than once by a single segment.
    layered: bool,
}

impl TerrainQueryWorld {
    /// Build a query world from terrain definitions.
    ///
    /// Determinism
    /// - The input is sorted by `id` before insertion.
    /// - Definitions with NaN poses or unusable shapes are rejected, not skipped.
    pub fn build(mut defs: Vec<TerrainDef>) -> Result<Self, TerrainError> {
        defs.sort_by_key(|d| d.id);

        let mut colliders = ColliderSet::new();
        let mut entries = Vec::with_capacity(defs.len());

        for def in &defs {
            let collider = collider_from_def(def)?;
            let aabb = match def.shape {
                TerrainShapeDef::Plane { .. } => None,
                _ => Some(collider.compute_aabb()),
            };
            let layered = matches!(def.shape, TerrainShapeDef::Trimesh { .. });
            let handle = colliders.insert(collider);
            entries.push(TerrainEntry {
                handle,
                aabb,
                layered,
            });
        }

        log::debug!("Built terrain query world with {} colliders.", entries.len());

        Ok(Self { colliders, entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Push every crossing of the segment `start -> end`.
    ///
    /// Convex colliders report their entry point. Meshes are re-cast past each
    /// crossing until the segment runs out, so every layer is reported.
    pub fn intersect_segment(&self, start: Vec3, end: Vec3, out: &mut Vec<Hit>) {
        let delta = end - start;
        let length = delta.norm();
        if !length.is_finite() || length <= DIST_EPS {
            return;
        }

        let dir = delta / length;
        let ray = Ray::new(
            Point3::new(start.x, start.y, start.z),
            Vector3::new(dir.x, dir.y, dir.z),
        );
        let segment = segment_aabb(start, end);

        for entry in &self.entries {
            if entry
                .aabb
                .as_ref()
                .is_some_and(|aabb| !aabb_intersects(aabb, &segment))
            {
                continue;
            }
            let Some(collider) = self.colliders.get(entry.handle) else {
                continue;
            };

            let mut travelled = 0.0;
            while travelled < length {
                let cast = Ray::new(ray.point_at(travelled), ray.dir);
                let Some(hit) = collider.shape().cast_ray_and_get_normal(
                    collider.position(),
                    &cast,
                    length - travelled,
                    false,
                ) else {
                    break;
                };

                let p = cast.point_at(hit.time_of_impact);
                out.push(Hit::new(
                    Vec3::new(p.x, p.y, p.z),
                    Vec3::new(hit.normal.x, hit.normal.y, hit.normal.z),
                ));

                if !entry.layered {
                    break;
                }
                travelled += hit.time_of_impact + LAYER_SKIP_DIST;
            }
        }
    }
}

/// Build a Rapier collider from a `TerrainDef`.
fn collider_from_def(def: &TerrainDef) -> Result<Collider, TerrainError> {
    let scaled_axis = def.rotation.scaled_axis();
    if !is_finite(&def.translation) || !is_finite(&scaled_axis) {
        return Err(TerrainError::NonFinitePose { id: def.id });
    }

    let translation = Vector3::new(def.translation.x, def.translation.y, def.translation.z);
    let rotation = Vector3::new(scaled_axis.x, scaled_axis.y, scaled_axis.z);
    let invalid = |reason: &str| TerrainError::InvalidShape {
        id: def.id,
        reason: reason.to_string(),
    };

    let collider = match &def.shape {
        TerrainShapeDef::Plane {
            offset_along_normal,
        } => {
            // Normal from pose rotation: n = R * +Z. Place the half-space on the plane.
            let n = def.rotation * Vec3::z();
            let origin = def.translation + n * *offset_along_normal;
            let unit_n = UnitVector::new_normalize(Vector3::new(n.x, n.y, n.z));

            ColliderBuilder::new(SharedShape::new(HalfSpace::new(unit_n)))
                .translation(Vector3::new(origin.x, origin.y, origin.z))
                .build()
        }

        TerrainShapeDef::Cuboid { half_extents } => {
            if half_extents.iter().any(|h| !h.is_finite() || *h <= 0.0) {
                return Err(invalid("cuboid half extents must be positive"));
            }
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
                .translation(translation)
                .rotation(rotation)
                .build()
        }

        TerrainShapeDef::Ball { radius } => {
            if !radius.is_finite() || *radius <= 0.0 {
                return Err(invalid("ball radius must be positive"));
            }
            ColliderBuilder::ball(*radius)
                .translation(translation)
                .build()
        }

        TerrainShapeDef::Trimesh { vertices, indices } => {
            if indices.is_empty() {
                return Err(invalid("trimesh has no triangles"));
            }
            if indices
                .iter()
                .flatten()
                .any(|&i| i as usize >= vertices.len())
            {
                return Err(invalid("trimesh index out of range"));
            }
            let points = vertices.iter().map(|v| Point3::new(v.x, v.y, v.z)).collect();

            ColliderBuilder::trimesh(points, indices.clone())
                .map_err(|err| TerrainError::InvalidShape {
                    id: def.id,
                    reason: format!("{err:?}"),
                })?
                .translation(translation)
                .rotation(rotation)
                .build()
        }
    };

    Ok(collider)
}

/// Bounds of a segment.
fn segment_aabb(start: Vec3, end: Vec3) -> Aabb {
    let mins = start.inf(&end);
    let maxs = start.sup(&end);
    Aabb::new(
        Point3::new(mins.x, mins.y, mins.z),
        Point3::new(maxs.x, maxs.y, maxs.z),
    )
}

/// Test two AABBs for intersection.
fn aabb_intersects(a: &Aabb, b: &Aabb) -> bool {
    !(a.maxs.x < b.mins.x
        || a.mins.x > b.maxs.x
        || a.maxs.y < b.mins.y
        || a.mins.y > b.maxs.y
        || a.maxs.z < b.mins.z
        || a.mins.z > b.maxs.z)
}

/// [`SpatialQuery`] over a shared [`TerrainQueryWorld`].
///
/// The world is shared (`Arc`) so a clamper's batch and triple-probe backends can
/// query the same terrain, while each backend owns its own segment storage.
#[derive(Clone)]
pub struct RapierIsector {
    world: Arc<TerrainQueryWorld>,
    batch: SegmentBatch,
}

impl RapierIsector {
    pub fn new(world: Arc<TerrainQueryWorld>) -> Self {
        Self {
            world,
            batch: SegmentBatch::with_capacity(DEFAULT_BATCH_CAPACITY),
        }
    }

    pub fn world(&self) -> &TerrainQueryWorld {
        &self.world
    }
}

impl SpatialQuery for RapierIsector {
    fn add_segment(&mut self, start: Vec3, end: Vec3) -> SegmentHandle {
        self.batch.push(start, end)
    }

    fn query(&mut self) -> bool {
        if self.batch.is_empty() || self.world.is_empty() {
            return false;
        }
        let world = &self.world;
        self.batch
            .run(|start, end, hits| world.intersect_segment(start, end, hits))
    }

    fn hit_list(&self, handle: SegmentHandle) -> &[Hit] {
        self.batch.hits(handle)
    }

    fn reset(&mut self) {
        self.batch.clear();
    }

    fn has_surface(&self) -> bool {
        !self.world.is_empty()
    }

    fn segment_count(&self) -> usize {
        self.batch.len()
    }
}
