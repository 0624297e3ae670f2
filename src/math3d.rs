//! 3D Math Utilities for the Cube Renderer
//!
//! Vertex rotation and the perspective divide used by the solids.
//! Everything here is pure; no state, no allocation.

use std::ops::{Add, Mul, Sub};

/// Near plane: smallest `focal + z` the perspective divide accepts.
/// Keeps the scale factor at or below `focal`.
pub const NEAR_PLANE: f32 = 1.0;

/// 3D Vector
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Approximate equality check for floating point comparison
    #[inline]
    pub fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        (self.x - other.x).abs() < epsilon
            && (self.y - other.y).abs() < epsilon
            && (self.z - other.z).abs() < epsilon
    }

    /// Rotate around X axis (mixes y and z)
    #[inline]
    pub fn rotate_x(&self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x,
            y: self.y * cos - self.z * sin,
            z: self.y * sin + self.z * cos,
        }
    }

    /// Rotate around Y axis (mixes x and z)
    #[inline]
    pub fn rotate_y(&self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos + self.z * sin,
            y: self.y,
            z: -self.x * sin + self.z * cos,
        }
    }

    /// Rotate around Z axis (mixes x and y)
    #[inline]
    pub fn rotate_z(&self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
            z: self.z,
        }
    }

    /// Apply all three rotations, X first, then Y, then Z.
    ///
    /// The order is part of the look of the demo: X-Y-Z does not commute
    /// with any other ordering.
    #[inline]
    pub fn rotate_xyz(&self, rx: f32, ry: f32, rz: f32) -> Self {
        self.rotate_x(rx).rotate_y(ry).rotate_z(rz)
    }
}

impl Add for Vec3 {
    type Output = Self;
    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Vec3 {
    type Output = Self;
    #[inline]
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    #[inline]
    fn mul(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

/// Project a 3D point onto the z = 0 plane, viewer sitting at z = -focal
///
/// - `point`: object-space point, already rotated
/// - `focal`: distance from eye to projection plane
///
/// `factor = focal / (focal + z)`. Returns `None` when the point is closer
/// to the eye than [`NEAR_PLANE`] (or behind it), so callers never divide by
/// zero and never see coordinates blown up by a tiny divisor.
#[inline]
pub fn project(point: Vec3, focal: f32) -> Option<(f32, f32)> {
    let depth = focal + point.z;
    if depth.is_nan() || depth < NEAR_PLANE {
        return None;
    }
    let factor = focal / depth;
    Some((point.x * factor, point.y * factor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    const EPS: f32 = 1e-4;

    #[test]
    fn test_zero_rotation_is_identity() {
        let v = Vec3::new(3.0, -7.5, 12.25);
        assert_eq!(v.rotate_xyz(0.0, 0.0, 0.0), v);
    }

    #[test]
    fn test_rotation_is_periodic_per_axis() {
        let v = Vec3::new(10.0, -10.0, 10.0);
        let steps = 64;
        let step = TAU / steps as f32;

        let mut rx = v;
        let mut ry = v;
        let mut rz = v;
        for _ in 0..steps {
            rx = rx.rotate_xyz(step, 0.0, 0.0);
            ry = ry.rotate_xyz(0.0, step, 0.0);
            rz = rz.rotate_xyz(0.0, 0.0, step);
        }
        assert!(rx.approx_eq(&v, 1e-3), "x drifted: {:?}", rx);
        assert!(ry.approx_eq(&v, 1e-3), "y drifted: {:?}", ry);
        assert!(rz.approx_eq(&v, 1e-3), "z drifted: {:?}", rz);
    }

    #[test]
    fn test_quarter_turns() {
        let q = TAU / 4.0;
        // X: +y goes to +z
        assert!(Vec3::new(0.0, 1.0, 0.0)
            .rotate_x(q)
            .approx_eq(&Vec3::new(0.0, 0.0, 1.0), EPS));
        // Y: +z goes to +x
        assert!(Vec3::new(0.0, 0.0, 1.0)
            .rotate_y(q)
            .approx_eq(&Vec3::new(1.0, 0.0, 0.0), EPS));
        // Z: +x goes to +y
        assert!(Vec3::new(1.0, 0.0, 0.0)
            .rotate_z(q)
            .approx_eq(&Vec3::new(0.0, 1.0, 0.0), EPS));
    }

    #[test]
    fn test_rotation_order_matters() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        let xyz = v.rotate_xyz(0.7, 1.1, 0.4);
        let zyx = v.rotate_z(0.4).rotate_y(1.1).rotate_x(0.7);
        assert!(!xyz.approx_eq(&zyx, 1e-3));
    }

    #[test]
    fn test_project_on_plane_is_identity() {
        let (x, y) = project(Vec3::new(5.0, -3.0, 0.0), 200.0).unwrap();
        assert!((x - 5.0).abs() < EPS);
        assert!((y + 3.0).abs() < EPS);
    }

    #[test]
    fn test_project_shrinks_far_points() {
        let (near, _) = project(Vec3::new(10.0, 0.0, -10.0), 200.0).unwrap();
        let (far, _) = project(Vec3::new(10.0, 0.0, 10.0), 200.0).unwrap();
        assert!(near > 10.0);
        assert!(far < 10.0);
        assert!((far - 10.0 * 200.0 / 210.0).abs() < EPS);
    }

    #[test]
    fn test_project_guards_eye_plane() {
        assert!(project(Vec3::new(1.0, 1.0, -200.0), 200.0).is_none());
        assert!(project(Vec3::new(1.0, 1.0, -250.0), 200.0).is_none());
        // Just in front of the eye is still rejected
        assert!(project(Vec3::new(1.0, 1.0, -199.5), 200.0).is_none());
        assert!(project(Vec3::new(1.0, 1.0, f32::NAN), 200.0).is_none());
        let (x, _) = project(Vec3::new(1.0, 1.0, -199.0), 200.0).unwrap();
        assert!((x - 200.0).abs() < EPS);
    }
}
