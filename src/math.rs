use glam::{Vec2, Vec3};

/// Radiance/reflectance as an RGB triple.
pub type Spectrum = Vec3;

pub const PI: f32 = std::f32::consts::PI;
pub const TWO_PI: f32 = 2.0 * PI;

/// A finite, non-negative spectrum. Anything else is a numerical bug that
/// gets counted by the executor rather than masked.
pub fn spectrum_is_valid(s: Spectrum) -> bool {
    s.is_finite() && s.x >= 0.0 && s.y >= 0.0 && s.z >= 0.0
}

/// Ray with a shrinking parametric interval. `t_max` narrows monotonically
/// as closer intersections are found.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub o: Vec3,
    pub d: Vec3,
    pub t_min: f32,
    pub t_max: f32,
}

impl Ray {
    pub fn new(o: Vec3, d: Vec3) -> Self {
        Self {
            o,
            d,
            t_min: 0.0,
            t_max: f32::INFINITY,
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.o + t * self.d
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn extend(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn dim(&self) -> Vec3 {
        self.max - self.min
    }

    /// Slab test against the ray's current `[t_min, t_max]` interval.
    pub fn intersect(&self, ray: &Ray) -> bool {
        let mut tmin = ray.t_min;
        let mut tmax = ray.t_max;
        for axis in 0..3 {
            let t1 = (self.min[axis] - ray.o[axis]) / ray.d[axis];
            let t2 = (self.max[axis] - ray.o[axis]) / ray.d[axis];
            tmin = tmin.max(t1.min(t2));
            tmax = tmax.min(t1.max(t2));
        }
        tmax >= tmin
    }
}

/// Index of the component with the largest value.
pub fn max_axis(v: Vec3) -> usize {
    let mut axis = 0;
    if v.y > v.x {
        axis = 1;
    }
    if v.z > v[axis] {
        axis = 2;
    }
    axis
}

/// Index of the component with the smallest magnitude.
pub fn abs_min_axis(v: Vec3) -> usize {
    let a = v.abs();
    let mut axis = 0;
    if a.y < a.x {
        axis = 1;
    }
    if a[2] < a[axis] {
        axis = 2;
    }
    axis
}

/// Index of the component with the largest magnitude.
pub fn abs_max_axis(v: Vec3) -> usize {
    max_axis(v.abs())
}

/// Two unit vectors completing `n` to a right-handed orthonormal basis.
/// `s` is built perpendicular to `n` in the plane of its two largest
/// components, `t = n × s`.
pub fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let i = abs_min_axis(n);
    let (i2, i3) = match i {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    };
    let mut s = Vec3::ZERO;
    s[i2] = -n[i3];
    s[i3] = n[i2];
    let s = s.normalize();
    let t = n.cross(s);
    (s, t)
}

// Tangent-space trigonometry. All of these assume a unit vector expressed
// in a frame whose z axis is the surface normal.

pub fn cos_theta(w: Vec3) -> f32 {
    w.z
}

pub fn abs_cos_theta(w: Vec3) -> f32 {
    w.z.abs()
}

pub fn sin2_theta(w: Vec3) -> f32 {
    (1.0 - w.z * w.z).max(0.0)
}

pub fn sin_theta(w: Vec3) -> f32 {
    sin2_theta(w).sqrt()
}

pub fn tan_theta(w: Vec3) -> f32 {
    sin_theta(w) / w.z
}

pub fn cos_phi(w: Vec3) -> f32 {
    let d = w.x * w.x + w.y * w.y;
    if d > 0.0 {
        w.x / d.sqrt()
    } else {
        0.0
    }
}

pub fn sin_phi(w: Vec3) -> f32 {
    let d = w.x * w.x + w.y * w.y;
    if d > 0.0 {
        w.y / d.sqrt()
    } else {
        1.0
    }
}

/// Uniform direction on the z-up hemisphere.
pub fn uniform_sample_hemisphere(u: Vec2) -> Vec3 {
    let z = u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = u.y * TWO_PI;
    Vec3::new(phi.cos() * r, phi.sin() * r, z)
}

pub fn uniform_hemisphere_pdf() -> f32 {
    1.0 / TWO_PI
}
