use glam::{Mat4, Vec3, Vec4};

use crate::math::{orthonormal_basis, Ray};

/// Affine transform stored together with its inverse, so that inversion
/// and normal transformation never invert a matrix at render time.
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    pub m: Mat4,
    pub inv: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        m: Mat4::IDENTITY,
        inv: Mat4::IDENTITY,
    };

    /// Build from a forward matrix, inverting once at construction.
    pub fn new(m: Mat4) -> Self {
        Self { m, inv: m.inverse() }
    }

    pub fn from_parts(m: Mat4, inv: Mat4) -> Self {
        Self { m, inv }
    }

    /// Swap forward and inverse.
    pub fn inverse(&self) -> Transform {
        Transform {
            m: self.inv,
            inv: self.m,
        }
    }

    /// Apply to a point (homogeneous w = 1).
    pub fn point(&self, p: Vec3) -> Vec3 {
        (self.m * p.extend(1.0)).truncate()
    }

    /// Apply to a direction (w = 0).
    pub fn vector(&self, v: Vec3) -> Vec3 {
        (self.m * v.extend(0.0)).truncate()
    }

    /// Apply to a surface normal: inverse transpose on w = 0. The result is
    /// not unit length in general; callers renormalize.
    pub fn normal(&self, n: Vec3) -> Vec3 {
        (self.inv.transpose() * n.extend(0.0)).truncate()
    }

    /// Transform a ray, preserving its parametric interval. The direction
    /// is deliberately not renormalized so that t values stay comparable
    /// across frames.
    pub fn ray(&self, r: &Ray) -> Ray {
        Ray {
            o: self.point(r.o),
            d: self.vector(r.d),
            t_min: r.t_min,
            t_max: r.t_max,
        }
    }

    pub fn translate(v: Vec3) -> Transform {
        Transform {
            m: Mat4::from_translation(v),
            inv: Mat4::from_translation(-v),
        }
    }

    pub fn scale(v: Vec3) -> Transform {
        Transform {
            m: Mat4::from_scale(v),
            inv: Mat4::from_scale(1.0 / v),
        }
    }

    /// Rotation by axis-angle in degrees. The axis must be non-zero; the
    /// scene loader validates that before calling.
    pub fn rotate(degrees: f32, axis: Vec3) -> Transform {
        let radians = degrees.to_radians();
        let axis = axis.normalize();
        Transform {
            m: Mat4::from_axis_angle(axis, radians),
            inv: Mat4::from_axis_angle(axis, -radians),
        }
    }

    /// World-from-camera transform for a camera at `eye` looking at
    /// `center`.
    pub fn look_at(eye: Vec3, center: Vec3, up: Vec3) -> Transform {
        let view = Mat4::look_at_rh(eye, center, up);
        Transform {
            m: view.inverse(),
            inv: view,
        }
    }
}

impl std::ops::Mul for Transform {
    type Output = Transform;

    /// Composition: forward matrices multiply left-to-right, inverses
    /// compose right-to-left.
    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            m: self.m * rhs.m,
            inv: rhs.inv * self.inv,
        }
    }
}

/// Transform taking world-space vectors into the tangent frame at a surface
/// point with unit normal `n`. Rows of the forward matrix are (s, t, n), so
/// the frame is orthonormal and its inverse is the transpose.
pub fn tangent_from_world(n: Vec3) -> Transform {
    let (s, t) = orthonormal_basis(n);
    let cols = Mat4::from_cols(
        s.extend(0.0),
        t.extend(0.0),
        n.extend(0.0),
        Vec4::new(0.0, 0.0, 0.0, 1.0),
    );
    Transform {
        m: cols.transpose(),
        inv: cols,
    }
}
