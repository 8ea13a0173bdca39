//! Fixed-layout math types.
//!
//! Byte-identical to the host's structs (32-bit reals). No handle and no
//! ownership: they travel through slots by plain copy. Conversions to and
//! from `glam` are the guest-side rewrap.

use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Default, Debug, Pod, Zeroable)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2::new(0.0, 0.0);

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Default, Debug, Pod, Zeroable)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3::new(0.0, 0.0, 0.0);
    pub const RIGHT: Vector3 = Vector3::new(1.0, 0.0, 0.0);
    pub const UP: Vector3 = Vector3::new(0.0, 1.0, 0.0);
    pub const BACK: Vector3 = Vector3::new(0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Debug, Pod, Zeroable)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };
}

/// 3×3 matrix stored as rows, matching the host.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Debug, Pod, Zeroable)]
pub struct Basis {
    pub rows: [Vector3; 3],
}

impl Basis {
    pub const IDENTITY: Basis = Basis {
        rows: [Vector3::RIGHT, Vector3::UP, Vector3::BACK],
    };
}

impl Default for Basis {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Basis plus origin.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Default, Debug, Pod, Zeroable)]
pub struct Transform3D {
    pub basis: Basis,
    pub origin: Vector3,
}

impl Transform3D {
    pub const IDENTITY: Transform3D = Transform3D {
        basis: Basis::IDENTITY,
        origin: Vector3::ZERO,
    };

    pub const fn from_origin(origin: Vector3) -> Self {
        Transform3D {
            basis: Basis::IDENTITY,
            origin,
        }
    }
}

/// Axis-aligned bounding box.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Default, Debug, Pod, Zeroable)]
pub struct Aabb {
    pub position: Vector3,
    pub size: Vector3,
}

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Default, Debug, Pod, Zeroable)]
pub struct Rect2 {
    pub position: Vector2,
    pub size: Vector2,
}

impl Rect2 {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rect2 {
            position: Vector2::new(x, y),
            size: Vector2::new(width, height),
        }
    }
}

impl From<glam::Vec2> for Vector2 {
    fn from(v: glam::Vec2) -> Self {
        Vector2::new(v.x, v.y)
    }
}

impl From<Vector2> for glam::Vec2 {
    fn from(v: Vector2) -> Self {
        glam::Vec2::new(v.x, v.y)
    }
}

impl From<glam::Vec3> for Vector3 {
    fn from(v: glam::Vec3) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

impl From<Vector3> for glam::Vec3 {
    fn from(v: Vector3) -> Self {
        glam::Vec3::new(v.x, v.y, v.z)
    }
}

impl From<glam::Quat> for Quaternion {
    fn from(q: glam::Quat) -> Self {
        Quaternion {
            x: q.x,
            y: q.y,
            z: q.z,
            w: q.w,
        }
    }
}

impl From<Quaternion> for glam::Quat {
    fn from(q: Quaternion) -> Self {
        glam::Quat::from_xyzw(q.x, q.y, q.z, q.w)
    }
}

// glam is column-major; the host stores rows.
impl From<glam::Mat3> for Basis {
    fn from(m: glam::Mat3) -> Self {
        let t = m.transpose();
        Basis {
            rows: [t.x_axis.into(), t.y_axis.into(), t.z_axis.into()],
        }
    }
}

impl From<Basis> for glam::Mat3 {
    fn from(b: Basis) -> Self {
        glam::Mat3::from_cols(b.rows[0].into(), b.rows[1].into(), b.rows[2].into()).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(std::mem::size_of::<Vector2>(), 8);
        assert_eq!(std::mem::size_of::<Vector3>(), 12);
        assert_eq!(std::mem::size_of::<Quaternion>(), 16);
        assert_eq!(std::mem::size_of::<Basis>(), 36);
        assert_eq!(std::mem::size_of::<Transform3D>(), 48);
        assert_eq!(std::mem::size_of::<Aabb>(), 24);
        assert_eq!(std::mem::size_of::<Rect2>(), 16);
    }

    #[test]
    fn test_basis_row_major_rewrap() {
        let m = glam::Mat3::from_cols(
            glam::Vec3::new(1.0, 2.0, 3.0),
            glam::Vec3::new(4.0, 5.0, 6.0),
            glam::Vec3::new(7.0, 8.0, 9.0),
        );
        let b = Basis::from(m);
        // First row holds the x components of every column.
        assert_eq!(b.rows[0], Vector3::new(1.0, 4.0, 7.0));
        assert_eq!(glam::Mat3::from(b), m);
    }

    #[test]
    fn test_vector_rewrap() {
        let v = Vector3::new(1.0, -2.0, 0.5);
        let g: glam::Vec3 = v.into();
        assert_eq!(Vector3::from(g), v);
    }
}
