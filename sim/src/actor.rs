use groundclamp::{
    ActorId, BoundingBox, ClampEntity, ClampableActor, GroundClampingData, Transform, Vec3,
};

use crate::scenario::ActorRow;

/// A dead-reckoned actor.
///
/// `raw` is advanced by velocity every tick and never sees clamping; the clamper
/// reads it as the request transform and writes its result to `clamped`. Keeping
/// the two apart stops intermittent offsets from piling up tick after tick.
#[derive(Clone, Debug)]
pub struct SimActor {
    pub id: ActorId,
    pub name: String,
    pub raw: Transform,
    pub clamped: Transform,
    pub velocity: Vec3,
    pub bounds: BoundingBox,
}

impl SimActor {
    /// Advance the raw transform by `dt` seconds. Returns whether it moved.
    pub fn advance(&mut self, dt: f32) -> bool {
        let step = self.velocity * dt;
        if step.norm_squared() <= f32::EPSILON {
            return false;
        }
        self.raw.translation += step;
        true
    }
}

impl ClampableActor for SimActor {
    fn id(&self) -> ActorId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self) -> Transform {
        self.clamped
    }

    fn set_transform(&mut self, xform: Transform) {
        self.clamped = xform;
    }

    fn bounding_box(&self) -> BoundingBox {
        self.bounds
    }
}

/// Build the registry entry for a scenario actor.
pub fn spawn(row: &ActorRow) -> ClampEntity<SimActor> {
    let transform = Transform::from_yaw_pitch_roll(Vec3::from(row.position), row.yaw, 0.0, 0.0);
    let actor = SimActor {
        id: row.id,
        name: row.name.clone(),
        raw: transform,
        clamped: transform,
        velocity: Vec3::from(row.velocity),
        bounds: BoundingBox::from_dimensions(Vec3::from(row.dimensions)),
    };

    let mut data =
        GroundClampingData::new(row.clamp_type).with_height_above_terrain(row.height_above_terrain);
    data.step_up_distance = row.step_up_distance;
    data.adjust_rotation_to_ground = row.adjust_rotation_to_ground;

    ClampEntity::new(actor, data)
}
