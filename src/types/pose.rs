use std::fmt;

use glam::{DMat4, DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::layout::{self, QUAT_LEN, VEC3_LEN};

/// Number of reals in the flat pose layout:
/// position (3), orientation (4), rotation point (3), scale (3).
pub const POSE_LEN: usize = VEC3_LEN + QUAT_LEN + VEC3_LEN + VEC3_LEN;

/// Local-to-global mapping of a sub-level: a rigid transform about a pivot,
/// with non-uniform scale.
///
/// Forward: `orientation * ((local - rotation_point) * scale) + position`.
///
/// Every scale component must be nonzero. A zero axis makes the inverse
/// transforms divide by zero; the result is `inf`/`NaN` and is not guarded.
///
/// Fields missing from a serialized record take their identity values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pose {
    /// Global position of the pivot.
    #[serde(with = "layout::vec3")]
    pub position: DVec3,
    /// Global orientation. Expected to be (approximately) normalized.
    #[serde(with = "layout::quat")]
    pub orientation: DQuat,
    /// Pivot in local coordinates.
    #[serde(with = "layout::vec3")]
    pub rotation_point: DVec3,
    /// Per-axis scale.
    #[serde(with = "layout::vec3")]
    pub scale: DVec3,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: DVec3::ZERO,
        orientation: DQuat::IDENTITY,
        rotation_point: DVec3::ZERO,
        scale: DVec3::ONE,
    };

    pub fn new(position: DVec3, orientation: DQuat, rotation_point: DVec3, scale: DVec3) -> Self {
        Self {
            position,
            orientation,
            rotation_point,
            scale,
        }
    }

    /// Pure translation: identity orientation, zero pivot, unit scale.
    pub fn from_position(position: DVec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Transform a local position to a global position.
    pub fn transform_position(&self, local: DVec3) -> DVec3 {
        self.orientation * ((local - self.rotation_point) * self.scale) + self.position
    }

    /// Transform a global position to a local position.
    pub fn transform_position_inverse(&self, global: DVec3) -> DVec3 {
        (self.orientation.inverse() * (global - self.position)) / self.scale + self.rotation_point
    }

    /// Transform a local normal to a global normal.
    ///
    /// This is the linear part of the pose (scale, then rotate). Under
    /// non-uniform scale the result is not of the same magnitude.
    pub fn transform_normal(&self, local: DVec3) -> DVec3 {
        self.orientation * (local * self.scale)
    }

    /// Transform a global normal to a local normal.
    ///
    /// Under non-uniform scale the result is not of the same magnitude.
    pub fn transform_normal_inverse(&self, global: DVec3) -> DVec3 {
        (self.orientation.inverse() * global) / self.scale
    }

    pub fn transform_position_in_place(&self, v: &mut DVec3) {
        *v = self.transform_position(*v);
    }

    pub fn transform_position_inverse_in_place(&self, v: &mut DVec3) {
        *v = self.transform_position_inverse(*v);
    }

    pub fn transform_normal_in_place(&self, v: &mut DVec3) {
        *v = self.transform_normal(*v);
    }

    pub fn transform_normal_inverse_in_place(&self, v: &mut DVec3) {
        *v = self.transform_normal_inverse(*v);
    }

    /// Interpolate towards `other` by `t` (0.0 = `self`, 1.0 = `other`).
    ///
    /// Position, pivot and scale are interpolated linearly. The orientation
    /// uses normalized linear interpolation (glam's quaternion `lerp`), not
    /// slerp: cheap and close enough for per-tick rotation deltas, but not
    /// constant-speed over large angles.
    pub fn lerp(&self, other: &Pose, t: f64) -> Pose {
        Pose {
            position: self.position.lerp(other.position, t),
            orientation: self.orientation.lerp(other.orientation, t),
            rotation_point: self.rotation_point.lerp(other.rotation_point, t),
            scale: self.scale.lerp(other.scale, t),
        }
    }

    /// In-place form of [`Pose::lerp`].
    pub fn lerp_mut(&mut self, other: &Pose, t: f64) -> &mut Self {
        *self = self.lerp(other, t);
        self
    }

    /// Rotation angle, in radians, between this orientation and `other`'s.
    pub fn angle_to(&self, other: &Pose) -> f64 {
        let delta = self.orientation * other.orientation.inverse();
        // q and -q are the same rotation
        2.0 * delta.w.abs().min(1.0).acos()
    }

    /// Whether `other` is within `distance_tolerance` (metres) in both
    /// position and pivot, and within `angular_tolerance` (radians) in
    /// orientation. Scale is not compared.
    pub fn within_tolerance(
        &self,
        other: &Pose,
        distance_tolerance: f64,
        angular_tolerance: f64,
    ) -> bool {
        let tol_sq = distance_tolerance * distance_tolerance;
        self.position.distance_squared(other.position) <= tol_sq
            && self.rotation_point.distance_squared(other.rotation_point) <= tol_sq
            && self.angle_to(other) <= angular_tolerance
    }

    /// Bake into an affine matrix: `T(position) * R(orientation) * S(scale) * T(-rotation_point)`.
    pub fn bake_into_matrix(&self) -> DMat4 {
        DMat4::from_translation(self.position)
            * DMat4::from_quat(self.orientation)
            * DMat4::from_scale(self.scale)
            * DMat4::from_translation(-self.rotation_point)
    }

    /// Flat layout: position, orientation (`x, y, z, w`), rotation point, scale.
    pub fn to_array(&self) -> [f64; POSE_LEN] {
        let p = self.position.to_array();
        let q = self.orientation.to_array();
        let r = self.rotation_point.to_array();
        let s = self.scale.to_array();
        [
            p[0], p[1], p[2], q[0], q[1], q[2], q[3], r[0], r[1], r[2], s[0], s[1], s[2],
        ]
    }

    /// Decode the flat layout written by [`Pose::to_array`].
    pub fn from_slice(values: &[f64]) -> Result<Pose> {
        let v = layout::fixed_size(values, POSE_LEN)?;
        Ok(Pose {
            position: layout::vec3_from_slice(&v[0..3])?,
            orientation: layout::quat_from_slice(&v[3..7])?,
            rotation_point: layout::vec3_from_slice(&v[7..10])?,
            scale: layout::vec3_from_slice(&v[10..13])?,
        })
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.position;
        let q = self.orientation;
        let r = self.rotation_point;
        let s = self.scale;
        write!(
            f,
            "Pose{{position=({:.3}, {:.3}, {:.3}), orientation=({:.4}, {:.4}, {:.4}, {:.4}), \
             rotation_point=({:.3}, {:.3}, {:.3}), scale=({:.3}, {:.3}, {:.3})}}",
            p.x, p.y, p.z, q.x, q.y, q.z, q.w, r.x, r.y, r.z, s.x, s.y, s.z
        )
    }
}
