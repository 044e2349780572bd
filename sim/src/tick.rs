//! Tick pipeline: advance, clamp, flush.
//!
//! Responsibilities
//! - Dead-reckon every actor's raw transform from its velocity.
//! - Issue one clamp request per actor.
//! - Flush the clamper's batch once all requests are in, so every actor's
//!   transform is written exactly once per tick.
//!
//! Determinism
//! - Actors are visited in registry order and the clamper preserves request order.
//! - No randomness; timing only affects debug logging.

use std::sync::Arc;

use groundclamp::{
    ClampEntity, ClampOutcome, ClampRequest, ClamperSettings, GroundClamper, RapierIsector,
    TerrainQueryWorld, Vec3, VelocityLodPolicy,
};

use crate::{actor::SimActor, utils::TickStopwatch};

/// Per-tick counts of how requests were handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub skipped: usize,
    pub direct: usize,
    pub reused: usize,
    pub queued: usize,
}

impl TickReport {
    fn record(&mut self, outcome: ClampOutcome) {
        match outcome {
            ClampOutcome::Skipped => self.skipped += 1,
            ClampOutcome::Direct => self.direct += 1,
            ClampOutcome::Reused => self.reused += 1,
            ClampOutcome::Queued => self.queued += 1,
        }
    }
}

pub struct Simulation {
    clamper: GroundClamper<RapierIsector>,
    entities: Vec<ClampEntity<SimActor>>,
    time: f64,
    tick: u64,
    profile_every: u32,
}

impl Simulation {
    pub fn new(
        settings: ClamperSettings,
        terrain: Arc<TerrainQueryWorld>,
        entities: Vec<ClampEntity<SimActor>>,
    ) -> Self {
        let clamper = GroundClamper::new(settings, RapierIsector::new(terrain));
        Self {
            clamper,
            entities,
            time: 0.0,
            tick: 0,
            profile_every: 0,
        }
    }

    pub fn with_eye_point(mut self, eye_point: Option<Vec3>) -> Self {
        self.clamper.set_eye_point(eye_point);
        self
    }

    /// Install a [`VelocityLodPolicy`] when a speed limit is configured.
    pub fn with_max_three_point_speed(mut self, speed: Option<f32>) -> Self {
        if let Some(speed) = speed {
            self.clamper.set_policy(Box::new(VelocityLodPolicy::new(speed)));
        }
        self
    }

    /// Log timing spans every `every` ticks (`0` disables).
    pub fn with_profiling(mut self, every: u32) -> Self {
        self.profile_every = every;
        self
    }

    pub fn entities(&self) -> &[ClampEntity<SimActor>] {
        &self.entities
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Run one tick of `dt` seconds.
    pub fn step(&mut self, dt: f64) -> TickReport {
        let mut sw = TickStopwatch::new("tick", self.tick, false, self.profile_every);
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        self.time += dt;
        let now = self.time;

        sw.span("clamp");
        for entity in self.entities.iter_mut() {
            let moved = entity.actor.advance(dt as f32);
            let request = ClampRequest::new(entity.data.clamp_type, now, entity.actor.raw)
                .with_transform_changed(moved)
                .with_velocity(entity.actor.velocity);
            let outcome = self
                .clamper
                .clamp_to_ground(request, &mut entity.actor, &mut entity.data);
            report.record(outcome);
        }

        sw.span("finish_up");
        self.clamper.finish_up(&mut self.entities);
        sw.end_span();

        self.tick += 1;
        report
    }
}
