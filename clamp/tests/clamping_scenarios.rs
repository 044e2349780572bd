use std::sync::Arc;

use groundclamp::{
    BasicActor, BoundingBox, ClampEntity, ClampOutcome, ClampPolicy, ClampRequest, ClampType,
    ClamperSettings, ClampableActor, GroundClamper, GroundClampingData, Hit, RapierIsector, Rot,
    TerrainDef, TerrainQueryWorld, TerrainShapeDef, Transform, Vec3, flat_surface,
    get_or_create_runtime_data,
};

fn crate_entity(id: u64, at: Vec3, clamp_type: ClampType) -> ClampEntity<BasicActor> {
    ClampEntity::new(
        BasicActor::new(
            id,
            "crate",
            Transform::from_translation(at),
            BoundingBox::from_dimensions(Vec3::new(2.0, 2.0, 2.0)),
        ),
        GroundClampingData::new(clamp_type).with_height_above_terrain(1.8),
    )
}

fn plane(id: u32, height: f32) -> TerrainDef {
    TerrainDef {
        id,
        translation: Vec3::new(0.0, 0.0, height),
        rotation: Rot::identity(),
        shape: TerrainShapeDef::Plane {
            offset_along_normal: 0.0,
        },
    }
}

fn rapier_clamper(defs: Vec<TerrainDef>) -> GroundClamper<RapierIsector> {
    let world = Arc::new(TerrainQueryWorld::build(defs).expect("valid terrain"));
    GroundClamper::new(ClamperSettings::default(), RapierIsector::new(world))
}

#[test]
fn crate_settles_on_flat_ground() {
    let mut clamper = GroundClamper::new(ClamperSettings::default(), flat_surface(0.0));
    let mut actors = vec![crate_entity(
        1,
        Vec3::new(10.0, 10.0, 50.0),
        ClampType::KeepAboveTerrain,
    )];

    let request = ClampRequest::new(ClampType::KeepAboveTerrain, 0.0, actors[0].actor.transform);
    let ClampEntity { actor, data } = &mut actors[0];
    clamper.clamp_to_ground(request, actor, data);
    clamper.finish_up(&mut actors);

    let t = actors[0].actor.transform();
    assert!((t.translation - Vec3::new(10.0, 10.0, 1.8)).norm() < 1.0e-5);
    assert_eq!(t.rotation, Rot::identity());
}

#[test]
fn crate_settles_on_rapier_ground_plane() {
    let mut clamper = rapier_clamper(vec![plane(1, 0.0)]);
    let mut actors = vec![crate_entity(
        1,
        Vec3::new(10.0, 10.0, 50.0),
        ClampType::KeepAboveTerrain,
    )];

    let request = ClampRequest::new(ClampType::KeepAboveTerrain, 0.0, actors[0].actor.transform);
    let ClampEntity { actor, data } = &mut actors[0];
    clamper.clamp_to_ground(request, actor, data);
    clamper.finish_up(&mut actors);

    let t = actors[0].actor.transform();
    assert!((t.translation - Vec3::new(10.0, 10.0, 1.8)).norm() < 1.0e-3);
    assert_eq!(t.rotation, Rot::identity());
}

#[test]
fn empty_terrain_leaves_crate_untouched() {
    let mut clamper = rapier_clamper(Vec::new());
    assert!(!clamper.has_valid_surface());

    let mut e = crate_entity(1, Vec3::new(10.0, 10.0, 50.0), ClampType::KeepAboveTerrain);
    let input = e.actor.transform;
    let request = ClampRequest::new(ClampType::KeepAboveTerrain, 0.0, input);

    assert_eq!(
        clamper.clamp_to_ground(request, &mut e.actor, &mut e.data),
        ClampOutcome::Skipped
    );
    assert_eq!(e.actor.transform, input);
    assert_eq!(clamper.clamp_batch_size(), 0);
}

#[test]
fn actor_under_bridge_stays_under_and_actor_over_it_stays_over() {
    let deck = TerrainDef {
        id: 2,
        translation: Vec3::new(0.0, 0.0, 10.0),
        rotation: Rot::identity(),
        shape: TerrainShapeDef::Cuboid {
            half_extents: Vec3::new(5.0, 20.0, 0.5),
        },
    };
    let mut clamper = rapier_clamper(vec![plane(1, 0.0), deck]);

    let mut actors = vec![
        crate_entity(1, Vec3::new(0.0, 0.0, 2.0), ClampType::KeepAboveTerrain),
        crate_entity(2, Vec3::new(0.0, 5.0, 12.0), ClampType::KeepAboveTerrain),
    ];
    for e in actors.iter_mut() {
        let request = ClampRequest::new(ClampType::KeepAboveTerrain, 0.0, e.actor.transform);
        clamper.clamp_to_ground(request, &mut e.actor, &mut e.data);
    }
    clamper.finish_up(&mut actors);

    assert!((actors[0].actor.transform.translation.z - 1.8).abs() < 1.0e-3);
    assert!((actors[1].actor.transform.translation.z - 12.3).abs() < 1.0e-3);
}

#[test]
fn actor_in_cave_stays_on_floor_of_layered_mesh() {
    // One mesh: cave floor at z = 0 and roof at z = 10.
    let quad = |z: f32| {
        [
            Vec3::new(-10.0, -10.0, z),
            Vec3::new(10.0, -10.0, z),
            Vec3::new(10.0, 10.0, z),
            Vec3::new(-10.0, 10.0, z),
        ]
    };
    let mut vertices = quad(0.0).to_vec();
    vertices.extend(quad(10.0));
    let cave = TerrainDef {
        id: 1,
        translation: Vec3::zeros(),
        rotation: Rot::identity(),
        shape: TerrainShapeDef::Trimesh {
            vertices,
            indices: vec![[0, 1, 2], [0, 2, 3], [4, 5, 6], [4, 6, 7]],
        },
    };
    let mut clamper = rapier_clamper(vec![cave]);

    let mut actors = vec![
        crate_entity(1, Vec3::new(0.3, 0.2, 1.0), ClampType::KeepAboveTerrain),
        crate_entity(2, Vec3::new(-2.0, 3.0, 11.0), ClampType::KeepAboveTerrain),
    ];
    for e in actors.iter_mut() {
        e.data.height_above_terrain = 0.5;
        let request = ClampRequest::new(ClampType::KeepAboveTerrain, 0.0, e.actor.transform);
        clamper.clamp_to_ground(request, &mut e.actor, &mut e.data);
    }
    clamper.finish_up(&mut actors);

    assert!((actors[0].actor.transform.translation.z - 0.5).abs() < 1.0e-3);
    assert!((actors[1].actor.transform.translation.z - 10.5).abs() < 1.0e-3);
}

#[test]
fn three_point_tilts_onto_rapier_slope() {
    // Plane rising along +X with a 0.2 rad slope.
    let slope = TerrainDef {
        id: 1,
        translation: Vec3::zeros(),
        rotation: Rot::from_euler_angles(0.0, -0.2, 0.0),
        shape: TerrainShapeDef::Plane {
            offset_along_normal: 0.0,
        },
    };
    let mut clamper = rapier_clamper(vec![slope.clone()]);
    let mut e = crate_entity(1, Vec3::new(0.0, 0.0, 20.0), ClampType::ThreePoint);
    e.data.height_above_terrain = 0.0;

    let request = ClampRequest::new(ClampType::ThreePoint, 0.0, e.actor.transform);
    assert_eq!(
        clamper.clamp_to_ground(request, &mut e.actor, &mut e.data),
        ClampOutcome::Direct
    );

    let expected_up = slope.rotation * Vec3::z();
    assert!((e.actor.transform.local_up() - expected_up).norm() < 1.0e-3);
}

#[test]
fn gap_in_terrain_holds_current_height() {
    // Ground only west of x = 0.
    let ground = TerrainDef {
        id: 1,
        translation: Vec3::new(-50.0, 0.0, -0.5),
        rotation: Rot::identity(),
        shape: TerrainShapeDef::Cuboid {
            half_extents: Vec3::new(50.0, 50.0, 0.5),
        },
    };
    let mut clamper = rapier_clamper(vec![ground]);
    let mut actors = vec![crate_entity(1, Vec3::new(20.0, 0.0, 7.0), ClampType::KeepAboveTerrain)];

    let request = ClampRequest::new(ClampType::KeepAboveTerrain, 0.0, actors[0].actor.transform);
    let ClampEntity { actor, data } = &mut actors[0];
    clamper.clamp_to_ground(request, actor, data);
    clamper.finish_up(&mut actors);

    assert!((actors[0].actor.transform.translation.z - 7.0).abs() < 1.0e-5);
    let runtime = get_or_create_runtime_data(&mut actors[0].data);
    assert!(runtime.last_clamped_offset().abs() < 1.0e-5);
}

/// Shallow water: probes report the lake bed, the surface sits at a fixed level.
struct WaterPolicy {
    water_level: f32,
}

impl ClampPolicy for WaterPolicy {
    fn resolve_extended_type(
        &self,
        clamp_type: ClampType,
        _actor: &dyn ClampableActor,
        _data: &GroundClampingData,
    ) -> ClampType {
        match clamp_type {
            ClampType::RangedSwim => ClampType::ThreePoint,
            other => other,
        }
    }

    fn finalize_surface_points(
        &self,
        _actor: &dyn ClampableActor,
        _data: &GroundClampingData,
        points: &mut [Vec3; 3],
    ) {
        for p in points.iter_mut() {
            p.z = p.z.max(self.water_level);
        }
    }
}

#[test]
fn swim_policy_floats_actor_on_water_surface() {
    let mut clamper = GroundClamper::new(ClamperSettings::default(), flat_surface(-3.0))
        .with_policy(WaterPolicy { water_level: 0.0 });
    let mut e = crate_entity(1, Vec3::new(0.0, 0.0, 1.0), ClampType::RangedSwim);
    e.data.height_above_terrain = 0.25;

    let request = ClampRequest::new(ClampType::RangedSwim, 0.0, e.actor.transform);
    assert_eq!(
        clamper.clamp_to_ground(request, &mut e.actor, &mut e.data),
        ClampOutcome::Direct
    );
    assert!((e.actor.transform.translation.z - 0.25).abs() < 1.0e-5);
}

/// Refuses to synthesize surfaces: probes over holes leave the actor where it is.
struct NoFallbackPolicy;

impl ClampPolicy for NoFallbackPolicy {
    fn missing_hit(
        &self,
        _actor: &dyn ClampableActor,
        _data: &GroundClampingData,
        _target_z: f32,
        _probe_point: Vec3,
    ) -> Option<Hit> {
        None
    }
}

#[test]
fn policy_without_fallback_leaves_actor_in_place() {
    let mut clamper = rapier_clamper(vec![TerrainDef {
        id: 1,
        translation: Vec3::new(100.0, 0.0, 0.0),
        rotation: Rot::identity(),
        shape: TerrainShapeDef::Ball { radius: 1.0 },
    }])
    .with_policy(NoFallbackPolicy);
    let mut actors = vec![crate_entity(1, Vec3::new(0.0, 0.0, 4.0), ClampType::KeepAboveTerrain)];

    let request = ClampRequest::new(ClampType::KeepAboveTerrain, 0.0, actors[0].actor.transform);
    let ClampEntity { actor, data } = &mut actors[0];
    clamper.clamp_to_ground(request, actor, data);
    clamper.finish_up(&mut actors);

    assert_eq!(
        actors[0].actor.transform.translation,
        Vec3::new(0.0, 0.0, 4.0)
    );
}
