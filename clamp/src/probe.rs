//! Surface point probe.
//!
//! Turns an actor's footprint into vertical probe segments, runs them against a
//! [`SpatialQuery`] and normalizes the results: the closest crossing per
//! segment, or a policy-synthesized fallback when a segment found nothing.

use crate::{
    actor::ClampableActor,
    data::GroundClampingData,
    isector::SpatialQuery,
    policy::ClampPolicy,
    types::{Hit, Vec3, is_finite, up},
};

/// Probed surface under the three footprint points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceProbeResult {
    /// World-space surface points (or the untouched probe point when nothing was found).
    pub points: [Vec3; 3],
    pub normals: [Vec3; 3],
    /// Whether each point came from a real intersection rather than a fallback.
    pub found: [bool; 3],
}

impl SurfaceProbeResult {
    pub fn found_count(&self) -> usize {
        self.found.iter().filter(|f| **f).count()
    }
}

/// Model-space footprint triangle for a model of the given dimensions.
///
/// One point at the front center, two at the rear corners, all on the model's
/// base plane and shifted by `adjustment`.
pub fn actor_detection_points(dimensions: Vec3, adjustment: Vec3) -> [Vec3; 3] {
    let half_w = dimensions.x * 0.5;
    let half_h = dimensions.y * 0.5;
    [
        Vec3::new(0.0, half_h, 0.0) + adjustment,
        Vec3::new(half_w, -half_h, 0.0) + adjustment,
        Vec3::new(-half_w, -half_h, 0.0) + adjustment,
    ]
}

/// Cached model dimensions, computed through the policy on first use.
pub fn calculate_and_set_bounding_box(
    policy: &dyn ClampPolicy,
    actor: &dyn ClampableActor,
    data: &mut GroundClampingData,
) -> Vec3 {
    if let Some(dimensions) = data.model_dimensions() {
        return dimensions;
    }

    let dimensions = policy.calculate_model_dimensions(actor, data);
    log::debug!(
        "Actor \"{}\" dimensions [{}, {}, {}].",
        actor.name(),
        dimensions.x,
        dimensions.y,
        dimensions.z
    );
    data.set_model_dimensions(dimensions);
    dimensions
}

/// The crossing whose height is closest to `target_z`. First one wins ties;
/// non-finite crossings are ignored.
pub fn closest_hit(hits: &[Hit], target_z: f32) -> Option<Hit> {
    let mut best: Option<(f32, Hit)> = None;
    for hit in hits {
        if !is_finite(&hit.point) {
            continue;
        }
        let diff = (hit.point.z - target_z).abs();
        if best.as_ref().map_or(true, |(d, _)| diff < *d) {
            best = Some((diff, *hit));
        }
    }
    best.map(|(_, hit)| hit)
}

/// Flat pseudo-surface `height_above_terrain` below `target_z`, under the probe column.
///
/// Clamping onto it leaves the actor at `target_z`, so actors over holes in the
/// terrain hold their height instead of falling through.
pub fn default_missing_hit(data: &GroundClampingData, target_z: f32, probe_point: Vec3) -> Hit {
    Hit::new(
        Vec3::new(
            probe_point.x,
            probe_point.y,
            target_z - data.height_above_terrain,
        ),
        up(),
    )
}

/// Vertical probe segment through `origin`.
///
/// Starts `step_up_distance` above the origin (the full half-length when no step
/// up is configured) and ends `probe_half_length` below it.
pub fn probe_segment(
    origin: Vec3,
    data: &GroundClampingData,
    probe_half_length: f32,
) -> (Vec3, Vec3) {
    let rise = if data.step_up_distance > 0.0 {
        data.step_up_distance
    } else {
        probe_half_length
    };
    (
        Vec3::new(origin.x, origin.y, origin.z + rise),
        Vec3::new(origin.x, origin.y, origin.z - probe_half_length),
    )
}

/// Probe the surface under three world-space points in one query.
///
/// Returns `None` without touching the query service when any point is NaN.
pub fn surface_points<Q: SpatialQuery + ?Sized>(
    isector: &mut Q,
    policy: &dyn ClampPolicy,
    actor: &dyn ClampableActor,
    data: &GroundClampingData,
    points: [Vec3; 3],
    probe_half_length: f32,
) -> Option<SurfaceProbeResult> {
    if points.iter().any(|p| p.iter().any(|c| c.is_nan())) {
        log::info!(
            "Detection point has NaN parts, not clamping actor \"{}\".",
            actor.name()
        );
        return None;
    }

    isector.reset();
    let handles = points.map(|p| {
        let (start, end) = probe_segment(p, data, probe_half_length);
        isector.add_segment(start, end)
    });

    let mut result = SurfaceProbeResult {
        points,
        normals: [up(); 3],
        found: [false; 3],
    };

    if !isector.query() {
        log::debug!(
            "Found no hits for actor \"{}\" on points {:?}.",
            actor.name(),
            points
        );
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let target_z = points[i].z;
        if let Some(hit) = closest_hit(isector.hit_list(handle), target_z) {
            result.points[i] = hit.point;
            result.normals[i] = hit.normal;
            result.found[i] = true;
        } else if let Some(hit) = policy.missing_hit(actor, data, target_z, points[i]) {
            log::debug!("Found no hit on line segment [{i}], using a synthesized point.");
            result.points[i] = hit.point;
            result.normals[i] = hit.normal;
        }
    }

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        actor::BasicActor,
        data::ClampType,
        isector::{SurfaceFnIsector, flat_surface},
        policy::DefaultClampPolicy,
        types::{BoundingBox, Transform},
    };

    fn hit_at(z: f32) -> Hit {
        Hit::new(Vec3::new(0.0, 0.0, z), up())
    }

    fn crate_actor(dimensions: Vec3) -> BasicActor {
        BasicActor::new(
            1,
            "crate",
            Transform::default(),
            BoundingBox::from_dimensions(dimensions),
        )
    }

    #[test]
    fn closest_hit_picks_crossing_nearest_current_height() {
        let hits = [hit_at(5.0), hit_at(40.0), hit_at(-3.0)];
        let hit = closest_hit(&hits, 4.0).expect("three crossings");
        assert_eq!(hit.point.z, 5.0);
    }

    #[test]
    fn closest_hit_skips_non_finite_crossings() {
        let hits = [Hit::new(Vec3::new(0.0, 0.0, f32::NAN), up()), hit_at(12.0)];
        assert_eq!(closest_hit(&hits, 0.0).map(|h| h.point.z), Some(12.0));
    }

    #[test]
    fn missing_hit_synthesizes_flat_surface_below_actor() {
        assert!(closest_hit(&[], 7.0).is_none());

        let data =
            GroundClampingData::new(ClampType::KeepAboveTerrain).with_height_above_terrain(1.5);
        let actor = crate_actor(Vec3::new(1.0, 1.0, 1.0));
        let hit = DefaultClampPolicy
            .missing_hit(&actor, &data, 7.0, Vec3::new(2.0, 3.0, 7.0))
            .expect("default policy always synthesizes");

        assert_eq!(hit.point, Vec3::new(2.0, 3.0, 5.5));
        assert_eq!(hit.normal, Vec3::z());
    }

    #[test]
    fn detection_points_form_footprint_triangle() {
        let points = actor_detection_points(Vec3::new(2.0, 4.0, 1.0), Vec3::new(0.0, 0.0, 0.5));
        assert_eq!(points[0], Vec3::new(0.0, 2.0, 0.5));
        assert_eq!(points[1], Vec3::new(1.0, -2.0, 0.5));
        assert_eq!(points[2], Vec3::new(-1.0, -2.0, 0.5));
    }

    #[test]
    fn model_dimensions_prefer_collision_bounds_and_are_cached() {
        let mut actor = crate_actor(Vec3::new(4.0, 4.0, 4.0));
        actor.collision = Some(BoundingBox::from_dimensions(Vec3::new(2.0, 3.0, 1.0)));
        let mut data = GroundClampingData::new(ClampType::ThreePoint);

        let dims = calculate_and_set_bounding_box(&DefaultClampPolicy, &actor, &mut data);
        assert_eq!(dims, Vec3::new(2.0, 3.0, 1.0));

        actor.collision = None;
        let cached = calculate_and_set_bounding_box(&DefaultClampPolicy, &actor, &mut data);
        assert_eq!(cached, dims);

        data.invalidate_model_dimensions();
        let visual = calculate_and_set_bounding_box(&DefaultClampPolicy, &actor, &mut data);
        assert_eq!(visual, Vec3::new(4.0, 4.0, 4.0));
    }

    #[test]
    fn step_up_distance_limits_probe_start() {
        let mut data = GroundClampingData::default();
        let origin = Vec3::new(1.0, 2.0, 10.0);
        assert_eq!(
            probe_segment(origin, &data, 100.0),
            (Vec3::new(1.0, 2.0, 110.0), Vec3::new(1.0, 2.0, -90.0))
        );

        data.step_up_distance = 0.5;
        assert_eq!(
            probe_segment(origin, &data, 100.0).0,
            Vec3::new(1.0, 2.0, 10.5)
        );
    }

    #[test]
    fn surface_points_mixes_hits_and_fallbacks() {
        // Ground only exists for x >= 0.
        let mut isector = SurfaceFnIsector::new(|x: f32, y: f32, hits: &mut Vec<Hit>| {
            if x >= 0.0 {
                hits.push(Hit::new(Vec3::new(x, y, 2.0), up()));
            }
        });
        let actor = crate_actor(Vec3::new(2.0, 2.0, 2.0));
        let data = GroundClampingData::default().with_height_above_terrain(1.0);
        let points = [
            Vec3::new(0.0, 1.0, 10.0),
            Vec3::new(1.0, -1.0, 10.0),
            Vec3::new(-1.0, -1.0, 10.0),
        ];

        let policy = DefaultClampPolicy;
        let result = surface_points(&mut isector, &policy, &actor, &data, points, 100.0)
            .expect("finite points");

        assert_eq!(result.found, [true, true, false]);
        assert_eq!(result.found_count(), 2);
        assert_eq!(result.points[0].z, 2.0);
        assert_eq!(result.points[1].z, 2.0);
        assert_eq!(result.points[2], Vec3::new(-1.0, -1.0, 9.0));
    }

    #[test]
    fn surface_points_rejects_nan_without_querying() {
        let mut isector = flat_surface(0.0);
        let actor = crate_actor(Vec3::new(2.0, 2.0, 2.0));
        let data = GroundClampingData::default();
        let points = [Vec3::new(f32::NAN, 0.0, 0.0), Vec3::zeros(), Vec3::zeros()];

        let policy = DefaultClampPolicy;
        let result = surface_points(&mut isector, &policy, &actor, &data, points, 100.0);
        assert!(result.is_none());
        assert_eq!(isector.segment_count(), 0);
    }
}
