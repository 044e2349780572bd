//! Surface fitting: turn probed surface points into a clamped transform.
//!
//! Orientation is always applied as a shortest-arc tilt of the actor's
//! current local up onto the surface normal, so heading is kept wherever the
//! tilt axis allows it. Degenerate input never produces NaN: the rotation is
//! simply left alone.

use nalgebra as na;

use crate::{
    settings::{ALIGN_EPS, DIST_EPS},
    types::{Rot, Transform, Vec3, is_finite, up},
};

/// Unit normal of the plane through `points`, facing +Z.
///
/// Computed as `(p0 - p2) x (p0 - p1)`. Returns `None` for collinear or
/// non-finite points.
pub fn surface_normal(points: &[Vec3; 3]) -> Option<Vec3> {
    let ab = points[0] - points[2];
    let ac = points[0] - points[1];
    let n = ab.cross(&ac);

    let len = n.norm();
    if !len.is_finite() || len <= DIST_EPS {
        return None;
    }

    let n = n / len;
    Some(if n.z < 0.0 { -n } else { n })
}

/// Mean height of the three surface points.
#[inline]
pub fn average_height(points: &[Vec3; 3]) -> f32 {
    (points[0].z + points[1].z + points[2].z) / 3.0
}

/// Rotation that maps the local up of `rotation` onto `normal`.
///
/// Returns `None` when no tilt is needed: the normal is unusable (zero or
/// non-finite) or already aligned within `ALIGN_EPS`.
pub fn alignment_delta(rotation: &Rot, normal: &Vec3) -> Option<Rot> {
    let len = normal.norm();
    if !is_finite(normal) || len <= DIST_EPS {
        return None;
    }
    let n = normal / len;

    let current = rotation * up();
    if current.dot(&n) >= 1.0 - ALIGN_EPS {
        return None;
    }

    let delta = Rot::rotation_between(&current, &n).unwrap_or_else(|| {
        // Antiparallel: flip about the actor's own X axis.
        let axis = na::Unit::new_normalize(rotation * Vec3::x());
        Rot::from_axis_angle(&axis, std::f32::consts::PI)
    });
    Some(delta)
}

/// Tilt `rotation` so its local up matches `normal`, then write `location` and
/// the resulting rotation into `xform`.
pub fn orient_transform(xform: &mut Transform, rotation: &mut Rot, location: Vec3, normal: Vec3) {
    if let Some(delta) = alignment_delta(rotation, &normal) {
        let tilted = delta * *rotation;
        if tilted.matrix().iter().all(|c| c.is_finite()) {
            *rotation = tilted;
        } else {
            log::debug!("Discarding non-finite surface alignment for normal {normal:?}.");
        }
    }

    xform.set(location, *rotation);
}

/// Orient to the plane through three surface points. Collinear points keep the
/// current rotation.
pub fn orient_transform_to_surface_points(
    xform: &mut Transform,
    rotation: &mut Rot,
    location: Vec3,
    points: &[Vec3; 3],
) {
    match surface_normal(points) {
        Some(normal) => orient_transform(xform, rotation, location, normal),
        None => xform.set(location, *rotation),
    }
}
