/*!
Core math aliases and value types shared by the clamping modules.

This module intentionally contains no algorithms. It defines the data exchanged
between:
- the spatial query backends (segments in, hits out)
- the surface probe (detection points, closest hits)
- the surface fitter (transforms and rotations)
- the batch coordinator (transform snapshots)

Conventions
- World is Z-up. Units are meters.
- Rotations are 3x3 rotation matrices; `rotation * Vec3::z()` is the actor's local up.
*/

use nalgebra as na;

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Rot = na::Rotation3<f32>;

/// World up axis.
#[inline]
pub fn up() -> Vec3 {
    Vec3::z()
}

/// Returns true if every component of `v` is finite.
#[inline]
pub fn is_finite(v: &Vec3) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// A rigid transform (position + rotation matrix) in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Rot,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Rot::identity(),
        }
    }
}

impl Transform {
    #[inline]
    pub fn new(translation: Vec3, rotation: Rot) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Rot::identity(),
        }
    }

    /// Heading (yaw about +Z), pitch and roll in radians.
    #[inline]
    pub fn from_yaw_pitch_roll(translation: Vec3, yaw: f32, pitch: f32, roll: f32) -> Self {
        Self {
            translation,
            rotation: Rot::from_euler_angles(roll, pitch, yaw),
        }
    }

    /// Map a model-space point into world space.
    #[inline]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation * p + self.translation
    }

    /// The actor's local up axis expressed in world space.
    #[inline]
    pub fn local_up(&self) -> Vec3 {
        self.rotation * up()
    }

    #[inline]
    pub fn set(&mut self, translation: Vec3, rotation: Rot) {
        self.translation = translation;
        self.rotation = rotation;
    }
}

/// Axis-aligned bounds in model space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    #[inline]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box of the given full dimensions centered on the model origin.
    #[inline]
    pub fn from_dimensions(dimensions: Vec3) -> Self {
        let half = dimensions * 0.5;
        Self {
            min: -half,
            max: half,
        }
    }

    /// Width (X), depth (Y) and height (Z). Inverted boxes report zero extents.
    #[inline]
    pub fn dimensions(&self) -> Vec3 {
        (self.max - self.min).map(|d| if d.is_finite() { d.max(0.0) } else { 0.0 })
    }
}

/// A single intersection between a probe segment and the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// World-space intersection point.
    pub point: Vec3,
    /// World-space surface normal at the intersection.
    pub normal: Vec3,
}

impl Hit {
    #[inline]
    pub fn new(point: Vec3, normal: Vec3) -> Self {
        Self { point, normal }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_point_applies_rotation_then_translation() {
        let xform = Transform::from_yaw_pitch_roll(
            Vec3::new(1.0, 2.0, 3.0),
            std::f32::consts::FRAC_PI_2,
            0.0,
            0.0,
        );
        let p = xform.transform_point(Vec3::new(1.0, 0.0, 0.0));

        // +X rotated 90 degrees about +Z lands on +Y.
        assert!((p - Vec3::new(1.0, 3.0, 3.0)).norm() < 1.0e-5);
    }

    #[test]
    fn bounding_box_dimensions_never_negative() {
        let inverted = BoundingBox::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(-1.0, 2.0, 0.0));
        assert_eq!(inverted.dimensions(), Vec3::new(0.0, 1.0, 0.0));

        let centered = BoundingBox::from_dimensions(Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(centered.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(centered.dimensions(), Vec3::new(2.0, 4.0, 6.0));
    }
}
