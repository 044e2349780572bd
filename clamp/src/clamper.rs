/*!
Ground clamper: per-tick request entry point and batch coordinator.

Flow per actor and tick:
1) `clamp_to_ground` picks the algorithm (policy, extended types, eye-point range).
2) Three-point requests are probed and written immediately. Single-point and
   intermittent requests that need a real query are queued.
3) `finish_up` runs every queued segment in one bulk query, in request order,
   and writes each queued actor's transform exactly once.

The clamper owns two query services: one for the batch and one for the
three-point probes. Both are reset before every use and never reallocated.
Queued requests hold actor ids only; `finish_up` resolves them through the
caller's [`ClampTargets`] registry.
*/

use crate::{
    actor::{ActorId, ClampTargets, ClampableActor},
    data::{ClampType, GroundClampingData},
    fitter,
    isector::{SegmentHandle, SpatialQuery},
    policy::{ClampPolicy, DefaultClampPolicy},
    probe,
    runtime::get_or_create_runtime_data,
    settings::{ClamperSettings, DIST_EPS},
    types::{Hit, Transform, Vec3},
};

/// One clamp request, as issued by the simulation once per actor per tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClampRequest {
    pub clamp_type: ClampType,
    /// Simulation time in seconds.
    pub current_time: f64,
    /// Raw (unclamped) transform for this tick.
    pub transform: Transform,
    /// Whether the actor meaningfully moved since the last request.
    pub transform_changed: bool,
    pub velocity: Vec3,
}

impl ClampRequest {
    pub fn new(clamp_type: ClampType, current_time: f64, transform: Transform) -> Self {
        Self {
            clamp_type,
            current_time,
            transform,
            transform_changed: true,
            velocity: Vec3::zeros(),
        }
    }

    pub fn with_transform_changed(mut self, changed: bool) -> Self {
        self.transform_changed = changed;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }
}

/// How a request was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClampOutcome {
    /// No clamping: written back as given (no surface, `ClampType::None`, NaN probe).
    Skipped,
    /// Probed and written immediately.
    Direct,
    /// Written immediately from the last clamp offset, no query.
    Reused,
    /// Deferred until `finish_up`.
    Queued,
}

/// A deferred single-point request. Lives until the next `finish_up`.
#[derive(Clone, Debug)]
pub struct ClampBatchEntry {
    pub actor_id: ActorId,
    /// Raw transform snapshot taken at request time.
    pub transform: Transform,
    pub requested_at: f64,
    /// World-space probe origin (actor origin plus adjustment).
    pub probe_origin: Vec3,
    segment: (Vec3, Vec3),
    handle: Option<SegmentHandle>,
}

pub struct GroundClamper<Q> {
    settings: ClamperSettings,
    policy: Box<dyn ClampPolicy>,
    isector: Q,
    triple_isector: Q,
    batch: Vec<ClampBatchEntry>,
    eye_point: Option<Vec3>,
}

impl<Q: SpatialQuery + Clone> GroundClamper<Q> {
    /// Clamper whose batch and three-point probes use copies of the same backend.
    pub fn new(settings: ClamperSettings, isector: Q) -> Self {
        let triple_isector = isector.clone();
        Self::with_isectors(settings, isector, triple_isector)
    }
}

impl<Q: SpatialQuery> GroundClamper<Q> {
    pub fn with_isectors(settings: ClamperSettings, isector: Q, triple_isector: Q) -> Self {
        let batch = Vec::with_capacity(settings.batch_capacity);
        Self {
            settings,
            policy: Box::new(DefaultClampPolicy),
            isector,
            triple_isector,
            batch,
            eye_point: None,
        }
    }

    pub fn with_policy(mut self, policy: impl ClampPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn set_policy(&mut self, policy: Box<dyn ClampPolicy>) {
        self.policy = policy;
    }

    pub fn policy(&self) -> &dyn ClampPolicy {
        self.policy.as_ref()
    }

    pub fn settings(&self) -> &ClamperSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ClamperSettings {
        &mut self.settings
    }

    /// Viewer position for ranged three-point LOD. `None` disables the range rules.
    pub fn set_eye_point(&mut self, eye_point: Option<Vec3>) {
        self.eye_point = eye_point;
    }

    pub fn eye_point(&self) -> Option<Vec3> {
        self.eye_point
    }

    /// Whether there is any terrain to clamp to.
    pub fn has_valid_surface(&self) -> bool {
        self.isector.has_surface()
    }

    /// Number of requests waiting for `finish_up`.
    pub fn clamp_batch_size(&self) -> usize {
        self.batch.len()
    }

    pub fn pending(&self) -> &[ClampBatchEntry] {
        &self.batch
    }

    pub fn ground_clamp_isector(&self) -> &Q {
        &self.isector
    }

    pub fn ground_clamp_isector_mut(&mut self) -> &mut Q {
        &mut self.isector
    }

    pub fn triple_isector_mut(&mut self) -> &mut Q {
        &mut self.triple_isector
    }

    /// Clamp one actor for this tick.
    ///
    /// The actor's transform is written now (`Skipped`, `Direct`, `Reused`) or
    /// by the next `finish_up` (`Queued`), never both.
    pub fn clamp_to_ground(
        &mut self,
        request: ClampRequest,
        actor: &mut dyn ClampableActor,
        data: &mut GroundClampingData,
    ) -> ClampOutcome {
        let ClampRequest {
            clamp_type,
            current_time,
            mut transform,
            transform_changed,
            velocity,
        } = request;

        let (has_clamped, held_rotation) = {
            let runtime = get_or_create_runtime_data(data);
            (runtime.has_clamped(), *runtime.last_clamped_rotation())
        };

        let suggested = self
            .policy
            .best_clamp_type(clamp_type, &*actor, data, transform_changed, velocity);
        let clamp_type = self.policy.resolve_extended_type(suggested, &*actor, data);

        if clamp_type == ClampType::None || !self.has_valid_surface() {
            actor.set_transform(transform);
            return ClampOutcome::Skipped;
        }

        // Hold the last clamped rotation while the actor is not moving, so a
        // re-applied raw rotation does not twitch against the terrain.
        if !transform_changed && has_clamped {
            transform.rotation = held_rotation;
        }

        let clamp_type = self.ranged_clamp_type(clamp_type, &transform);
        log::debug!(
            "Ground clamping actor \"{}\" ({}) with {:?}.",
            actor.name(),
            actor.id(),
            clamp_type
        );

        match clamp_type {
            ClampType::ThreePoint => {
                self.clamp_to_ground_three_point(current_time, transform, actor, data)
            }
            ClampType::IntermittentSaveOffset => self.clamp_to_ground_intermittent(
                current_time,
                transform,
                transform_changed,
                actor,
                data,
            ),
            _ => {
                self.enqueue(actor.id(), transform, current_time, data);
                ClampOutcome::Queued
            }
        }
    }

    /// Apply eye-point ranges to three-point requests: beyond the low-res range
    /// fall back to intermittent, beyond the high-res range to a single probe.
    fn ranged_clamp_type(&self, clamp_type: ClampType, transform: &Transform) -> ClampType {
        if clamp_type != ClampType::ThreePoint {
            return clamp_type;
        }
        let Some(eye) = self.eye_point else {
            return clamp_type;
        };

        let distance_sq = (transform.translation - eye).norm_squared();
        let s = &self.settings;
        if s.low_res_range > 0.0 && distance_sq > s.low_res_range_sq() {
            ClampType::IntermittentSaveOffset
        } else if s.high_res_range > 0.0 && distance_sq > s.high_res_range_sq() {
            ClampType::KeepAboveTerrain
        } else {
            clamp_type
        }
    }

    /// Throttled single-point clamp.
    ///
    /// Queues a real query when the actor was never clamped, moved, or the
    /// intermittent interval elapsed. Otherwise the last offset is applied to
    /// the raw height and written immediately.
    pub fn clamp_to_ground_intermittent(
        &mut self,
        current_time: f64,
        transform: Transform,
        transform_changed: bool,
        actor: &mut dyn ClampableActor,
        data: &mut GroundClampingData,
    ) -> ClampOutcome {
        let interval = f64::from(self.settings.intermittent_time_delta);
        let (due, offset) = {
            let runtime = get_or_create_runtime_data(data);
            let due = !runtime.has_clamped()
                || transform_changed
                || current_time - runtime.last_clamped_time() >= interval;
            (due, runtime.last_clamped_offset())
        };

        if due {
            self.enqueue(actor.id(), transform, current_time, data);
            return ClampOutcome::Queued;
        }

        let mut transform = transform;
        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Using previous offset {} for actor \"{}\". Starting position is {:?}.",
                offset,
                actor.name(),
                transform.translation
            );
        }
        transform.translation.z += offset;
        actor.set_transform(transform);
        ClampOutcome::Reused
    }

    /// Fit height and orientation to the surface under the actor's footprint.
    pub fn clamp_to_ground_three_point(
        &mut self,
        current_time: f64,
        transform: Transform,
        actor: &mut dyn ClampableActor,
        data: &mut GroundClampingData,
    ) -> ClampOutcome {
        let dimensions = probe::calculate_and_set_bounding_box(self.policy.as_ref(), &*actor, data);
        if dimensions.x.abs() <= DIST_EPS || dimensions.y.abs() <= DIST_EPS {
            log::debug!(
                "Actor \"{}\" has a degenerate footprint {:?}, using a single probe.",
                actor.name(),
                dimensions
            );
            return self.clamp_to_ground_single_point(current_time, transform, actor, data);
        }

        let points = probe::actor_detection_points(dimensions, data.adjustment)
            .map(|p| transform.transform_point(p));

        let Some(mut surface) = probe::surface_points(
            &mut self.triple_isector,
            self.policy.as_ref(),
            &*actor,
            data,
            points,
            self.settings.probe_half_length,
        ) else {
            actor.set_transform(transform);
            return ClampOutcome::Skipped;
        };

        self.policy
            .finalize_surface_points(&*actor, data, &mut surface.points);

        let raw = transform.translation;
        let location = Vec3::new(
            raw.x,
            raw.y,
            fitter::average_height(&surface.points) + data.height_above_terrain,
        );
        let mut rotation = transform.rotation;
        let mut clamped = transform;
        fitter::orient_transform_to_surface_points(
            &mut clamped,
            &mut rotation,
            location,
            &surface.points,
        );

        log::debug!(
            "Setting actor \"{}\" to average surface height {} with clamp offset {}.",
            actor.name(),
            location.z,
            location.z - raw.z
        );

        get_or_create_runtime_data(data).record(location.z - raw.z, current_time, rotation);
        actor.set_transform(clamped);
        ClampOutcome::Direct
    }

    /// Immediate single-point clamp on the three-point query service. Rotation
    /// is left as requested.
    fn clamp_to_ground_single_point(
        &mut self,
        current_time: f64,
        transform: Transform,
        actor: &mut dyn ClampableActor,
        data: &mut GroundClampingData,
    ) -> ClampOutcome {
        let probe_origin = transform.transform_point(data.adjustment);
        let (start, end) =
            probe::probe_segment(probe_origin, data, self.settings.probe_half_length);

        self.triple_isector.reset();
        let handle = self.triple_isector.add_segment(start, end);
        self.triple_isector.query();

        let hit = self.surface_hit(
            self.triple_isector.hit_list(handle),
            transform.translation.z,
            probe_origin,
            &*actor,
            data,
        );
        let clamped = apply_single_point(hit, transform, current_time, false, data);
        actor.set_transform(clamped);
        ClampOutcome::Direct
    }

    /// Model-space footprint points for `actor`, computing and caching its
    /// dimensions on first use.
    pub fn actor_detection_points(
        &self,
        actor: &dyn ClampableActor,
        data: &mut GroundClampingData,
    ) -> [Vec3; 3] {
        let dimensions = probe::calculate_and_set_bounding_box(self.policy.as_ref(), actor, data);
        probe::actor_detection_points(dimensions, data.adjustment)
    }

    fn enqueue(
        &mut self,
        actor_id: ActorId,
        transform: Transform,
        requested_at: f64,
        data: &GroundClampingData,
    ) {
        let probe_origin = transform.transform_point(data.adjustment);
        let entry = ClampBatchEntry {
            actor_id,
            transform,
            requested_at,
            probe_origin,
            segment: probe::probe_segment(probe_origin, data, self.settings.probe_half_length),
            handle: None,
        };

        if let Some(existing) = self.batch.iter_mut().find(|e| e.actor_id == actor_id) {
            log::warn!("Actor {actor_id} queued twice in one tick; keeping the latest request.");
            *existing = entry;
        } else {
            self.batch.push(entry);
        }
    }

    /// Closest crossing, or the policy's fallback.
    fn surface_hit(
        &self,
        hits: &[Hit],
        target_z: f32,
        probe_origin: Vec3,
        actor: &dyn ClampableActor,
        data: &GroundClampingData,
    ) -> Option<Hit> {
        probe::closest_hit(hits, target_z)
            .or_else(|| self.policy.missing_hit(actor, data, target_z, probe_origin))
    }

    /// Resolve every queued request in order and clear the batch.
    ///
    /// Entries whose actor is no longer in `targets` are dropped with a warning.
    pub fn run_clamp_batch<T: ClampTargets + ?Sized>(&mut self, targets: &mut T) {
        if self.batch.is_empty() {
            return;
        }

        let mut batch = std::mem::take(&mut self.batch);

        self.isector.reset();
        for entry in &mut batch {
            let (start, end) = entry.segment;
            entry.handle = Some(self.isector.add_segment(start, end));
        }

        if !self.isector.query() {
            log::debug!("Found no hits with batch query of {} segments.", batch.len());
        }

        for entry in &batch {
            let Some((actor, data)) = targets.clamp_target(entry.actor_id) else {
                log::warn!(
                    "Actor {} queued for ground clamping is gone; dropping its request.",
                    entry.actor_id
                );
                continue;
            };

            let hits = entry
                .handle
                .map_or(&[][..], |handle| self.isector.hit_list(handle));
            let hit = self.surface_hit(
                hits,
                entry.transform.translation.z,
                entry.probe_origin,
                &*actor,
                data,
            );
            let orient = data.adjust_rotation_to_ground;
            let clamped =
                apply_single_point(hit, entry.transform, entry.requested_at, orient, data);
            actor.set_transform(clamped);
        }

        batch.clear();
        self.batch = batch;
    }

    /// End-of-tick hook. Must be called once per tick after every
    /// `clamp_to_ground` call; a no-op when nothing is queued.
    pub fn finish_up<T: ClampTargets + ?Sized>(&mut self, targets: &mut T) {
        self.run_clamp_batch(targets);
    }
}

/// Single-point fit: put the actor `height_above_terrain` over `hit`, optionally
/// tilted to its normal, and commit the runtime data.
fn apply_single_point(
    hit: Option<Hit>,
    transform: Transform,
    time: f64,
    orient: bool,
    data: &mut GroundClampingData,
) -> Transform {
    let raw = transform.translation;
    let mut clamped = transform;
    let mut rotation = transform.rotation;

    let offset = match hit {
        Some(hit) => {
            let location = Vec3::new(raw.x, raw.y, hit.point.z + data.height_above_terrain);
            if orient {
                fitter::orient_transform(&mut clamped, &mut rotation, location, hit.normal);
            } else {
                clamped.set(location, rotation);
            }
            location.z - raw.z
        }
        None => 0.0,
    };

    get_or_create_runtime_data(data).record(offset, time, rotation);
    clamped
}

impl<Q> Drop for GroundClamper<Q> {
    fn drop(&mut self) {
        if !self.batch.is_empty() {
            log::error!(
                "Ground clamper dropped with {} unresolved requests; finish_up was not called.",
                self.batch.len()
            );
        }
    }
}
