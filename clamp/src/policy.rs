//! Pluggable clamping policy.
//!
//! The clamper asks its policy at a handful of decision points. Every method
//! has a default matching the stock clamper, so a policy only overrides what it
//! changes (e.g. water/swim variants, soft ground, speed-based LOD).

use crate::{
    actor::ClampableActor,
    data::{ClampType, GroundClampingData},
    probe,
    types::{Hit, Vec3},
};

pub trait ClampPolicy {
    /// Algorithm to use for this request. Lets a policy downgrade expensive
    /// types for fast-moving or unimportant actors.
    fn best_clamp_type(
        &self,
        suggested: ClampType,
        _actor: &dyn ClampableActor,
        _data: &GroundClampingData,
        _transform_changed: bool,
        _velocity: Vec3,
    ) -> ClampType {
        suggested
    }

    /// Map types the built-in fitter has no algorithm for onto one it has.
    fn resolve_extended_type(
        &self,
        clamp_type: ClampType,
        _actor: &dyn ClampableActor,
        _data: &GroundClampingData,
    ) -> ClampType {
        if clamp_type.is_builtin() {
            clamp_type
        } else {
            ClampType::KeepAboveTerrain
        }
    }

    /// Model-space dimensions used for the three-point footprint.
    /// Collision bounds when the actor has them, visual bounds otherwise.
    fn calculate_model_dimensions(
        &self,
        actor: &dyn ClampableActor,
        _data: &GroundClampingData,
    ) -> Vec3 {
        actor
            .collision_bounds()
            .unwrap_or_else(|| actor.bounding_box())
            .dimensions()
    }

    /// Last chance to adjust the three surface points before fitting
    /// (mud, sand, shallow water).
    fn finalize_surface_points(
        &self,
        _actor: &dyn ClampableActor,
        _data: &GroundClampingData,
        _points: &mut [Vec3; 3],
    ) {
    }

    /// Fallback surface for a probe that found nothing. `None` leaves the actor
    /// where it is.
    fn missing_hit(
        &self,
        _actor: &dyn ClampableActor,
        data: &GroundClampingData,
        target_z: f32,
        probe_point: Vec3,
    ) -> Option<Hit> {
        Some(probe::default_missing_hit(data, target_z, probe_point))
    }
}

/// Stock behavior.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultClampPolicy;

impl ClampPolicy for DefaultClampPolicy {}

/// Downgrades three-point clamping to a single batched probe for actors moving
/// faster than `max_three_point_speed` (m/s). Fast actors show little of the
/// tilt while paying the full three-probe cost.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VelocityLodPolicy {
    pub max_three_point_speed: f32,
}

impl VelocityLodPolicy {
    pub fn new(max_three_point_speed: f32) -> Self {
        Self {
            max_three_point_speed,
        }
    }
}

impl ClampPolicy for VelocityLodPolicy {
    fn best_clamp_type(
        &self,
        suggested: ClampType,
        actor: &dyn ClampableActor,
        _data: &GroundClampingData,
        _transform_changed: bool,
        velocity: Vec3,
    ) -> ClampType {
        if suggested == ClampType::ThreePoint
            && velocity.norm_squared() > self.max_three_point_speed * self.max_three_point_speed
        {
            log::debug!(
                "Actor \"{}\" moving at {:.2} m/s, using single-point clamping.",
                actor.name(),
                velocity.norm()
            );
            return ClampType::KeepAboveTerrain;
        }
        suggested
    }
}
