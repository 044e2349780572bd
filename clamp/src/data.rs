//! Per-actor clamping configuration.
//!
//! `GroundClampingData` is owned by the simulation layer (one per actor) and
//! persists across ticks. The clamper reads its configuration and lazily
//! attaches a [`RuntimeData`](crate::runtime::RuntimeData) to its runtime slot.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::types::Vec3;

/// Requested clamping algorithm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClampType {
    /// Never clamp; the transform is written back as given.
    None,
    /// Batched single-point probe under the actor origin.
    #[default]
    KeepAboveTerrain,
    /// Single-point probe that reuses the last offset between real queries.
    IntermittentSaveOffset,
    /// Water/swim variant. Needs a policy that knows how to resolve it;
    /// otherwise treated as `KeepAboveTerrain`.
    RangedSwim,
    /// Height and orientation from three footprint probes.
    ThreePoint,
}

impl ClampType {
    /// Whether the built-in fitter can resolve this type without a policy.
    #[inline]
    pub fn is_builtin(self) -> bool {
        !matches!(self, ClampType::RangedSwim)
    }
}

/// Clamping configuration attached to one actor.
pub struct GroundClampingData {
    /// Requested algorithm.
    pub clamp_type: ClampType,
    /// Distance kept between the surface and the actor origin (meters).
    pub height_above_terrain: f32,
    /// How far above the actor a probe starts. `0.0` uses the clamper's probe half-length.
    pub step_up_distance: f32,
    /// Tilt single-point clamps to the surface normal.
    pub adjust_rotation_to_ground: bool,
    /// Model-space offset applied to every probe origin.
    pub adjustment: Vec3,
    model_dimensions: Option<Vec3>,
    runtime: Option<Box<dyn Any + Send>>,
}

impl Default for GroundClampingData {
    fn default() -> Self {
        Self::new(ClampType::default())
    }
}

impl std::fmt::Debug for GroundClampingData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroundClampingData")
            .field("clamp_type", &self.clamp_type)
            .field("height_above_terrain", &self.height_above_terrain)
            .field("step_up_distance", &self.step_up_distance)
            .field("adjust_rotation_to_ground", &self.adjust_rotation_to_ground)
            .field("adjustment", &self.adjustment)
            .field("model_dimensions", &self.model_dimensions)
            .field("has_runtime", &self.runtime.is_some())
            .finish()
    }
}

impl GroundClampingData {
    pub fn new(clamp_type: ClampType) -> Self {
        Self {
            clamp_type,
            height_above_terrain: 0.0,
            step_up_distance: 0.0,
            adjust_rotation_to_ground: false,
            adjustment: Vec3::zeros(),
            model_dimensions: None,
            runtime: None,
        }
    }

    pub fn with_height_above_terrain(mut self, height: f32) -> Self {
        self.height_above_terrain = height;
        self
    }

    /// Cached model-space footprint dimensions, if already known.
    #[inline]
    pub fn model_dimensions(&self) -> Option<Vec3> {
        self.model_dimensions
    }

    #[inline]
    pub fn set_model_dimensions(&mut self, dimensions: Vec3) {
        self.model_dimensions = Some(dimensions);
    }

    /// Forget the cached dimensions so they are recomputed on the next three-point clamp.
    /// Call when the actor's model or collision geometry changes.
    #[inline]
    pub fn invalidate_model_dimensions(&mut self) {
        self.model_dimensions = None;
    }

    /// Whatever currently occupies the runtime slot.
    #[inline]
    pub fn runtime_slot(&self) -> Option<&(dyn Any + Send)> {
        self.runtime.as_deref()
    }

    /// Replace the runtime slot's content. Used by alternate clampers that keep
    /// their own per-actor state.
    #[inline]
    pub fn set_runtime_slot(&mut self, value: Option<Box<dyn Any + Send>>) {
        self.runtime = value;
    }

    #[inline]
    pub(crate) fn runtime_slot_mut(&mut self) -> &mut Option<Box<dyn Any + Send>> {
        &mut self.runtime
    }
}
