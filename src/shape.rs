use glam::Vec3;

use crate::bvh::intersect_triangle;
use crate::math::{abs_max_axis, Aabb, Ray};
use crate::mesh::TriangleMesh;

/// Hit point and outward normal in the shape's local frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalHit {
    pub p: Vec3,
    pub n: Vec3,
}

/// Geometric primitives, each defined in its own local frame: the sphere
/// has radius 1 at the origin, the plane is y = 0, the rectangle and disk
/// live in that plane with unit extent, the cube spans [-1, 1] on every
/// axis.
///
/// The intersection contract: the ray is already in the local frame; on a
/// hit, `ray.t_max` is narrowed to the hit distance and `hit` is filled in
/// local coordinates. `self_hit` tells the shape the ray originates on its
/// own surface, and `inside_self` that it was additionally shot against the
/// surface normal; the shape decides how to suppress reintersection
/// instead of relying on a global ray epsilon.
pub enum Shape {
    Sphere,
    Plane,
    Disk,
    Rectangle,
    Cube,
    Triangle { v: [Vec3; 3] },
    Mesh(TriangleMesh),
}

impl Shape {
    pub fn intersect(
        &self,
        ray: &mut Ray,
        hit: &mut LocalHit,
        self_hit: bool,
        inside_self: bool,
    ) -> bool {
        match self {
            Shape::Sphere => intersect_sphere(ray, hit, self_hit, inside_self),
            Shape::Plane => {
                if self_hit {
                    return false;
                }
                match intersect_plane(ray) {
                    Some(t) => {
                        ray.t_max = t;
                        hit.p = ray.at(t);
                        hit.n = Vec3::Y;
                        true
                    }
                    None => false,
                }
            }
            Shape::Disk => {
                if self_hit {
                    return false;
                }
                match intersect_plane(ray) {
                    Some(t) => {
                        let p = ray.at(t);
                        if p.x * p.x + p.z * p.z > 1.0 {
                            return false;
                        }
                        ray.t_max = t;
                        hit.p = p;
                        hit.n = Vec3::Y;
                        true
                    }
                    None => false,
                }
            }
            Shape::Rectangle => {
                if self_hit {
                    return false;
                }
                match intersect_plane(ray) {
                    Some(t) => {
                        let p = ray.at(t);
                        if p.x.abs() > 1.0 || p.z.abs() > 1.0 {
                            return false;
                        }
                        ray.t_max = t;
                        hit.p = p;
                        hit.n = Vec3::Y;
                        true
                    }
                    None => false,
                }
            }
            Shape::Cube => intersect_cube(ray, hit, self_hit, inside_self),
            Shape::Triangle { v } => {
                if self_hit {
                    return false;
                }
                match intersect_triangle(ray, v[0], v[1], v[2], true) {
                    Some((t, _, _)) => {
                        ray.t_max = t;
                        hit.p = ray.at(t);
                        hit.n = (v[1] - v[0]).cross(v[2] - v[0]).normalize();
                        true
                    }
                    None => false,
                }
            }
            Shape::Mesh(mesh) => mesh.intersect(ray, hit, self_hit),
        }
    }

    /// Local-frame bounding box. Unbounded shapes report infinite extents.
    pub fn bbox(&self) -> Aabb {
        match self {
            Shape::Sphere | Shape::Cube => Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)),
            Shape::Plane => Aabb::new(
                Vec3::new(f32::NEG_INFINITY, 0.0, f32::NEG_INFINITY),
                Vec3::new(f32::INFINITY, 0.0, f32::INFINITY),
            ),
            Shape::Disk | Shape::Rectangle => {
                Aabb::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, 1.0))
            }
            Shape::Triangle { v } => {
                let mut bbox = Aabb::empty();
                for &p in v {
                    bbox.extend(p);
                }
                bbox
            }
            Shape::Mesh(mesh) => mesh.bbox(),
        }
    }
}

fn intersect_plane(ray: &Ray) -> Option<f32> {
    if ray.d.y == 0.0 {
        return None;
    }
    let t = -ray.o.y / ray.d.y;
    if t < ray.t_min || t > ray.t_max {
        return None;
    }
    Some(t)
}

fn intersect_sphere(ray: &mut Ray, hit: &mut LocalHit, self_hit: bool, inside_self: bool) -> bool {
    // A sphere is convex: a ray leaving the outside of its own surface can
    // never come back.
    if self_hit && !inside_self {
        return false;
    }

    let a = ray.d.dot(ray.d);
    let b = 2.0 * ray.d.dot(ray.o);
    let c = ray.o.dot(ray.o) - 1.0;

    let discrim = b * b - 4.0 * a * c;
    if discrim < 0.0 {
        return false;
    }
    let root = discrim.sqrt();
    let t0 = (-b - root) / (2.0 * a);
    let t1 = (-b + root) / (2.0 * a);

    let t = if self_hit {
        // Crossing into the sphere from its own surface: the near root is
        // the origin itself, the far root is the exit point.
        t1
    } else if t0 >= ray.t_min {
        t0
    } else {
        t1
    };
    if t < ray.t_min || t > ray.t_max || (self_hit && t <= 0.0) {
        return false;
    }

    ray.t_max = t;
    hit.p = ray.at(t);
    hit.n = hit.p.normalize();
    true
}

fn intersect_cube(ray: &mut Ray, hit: &mut LocalHit, self_hit: bool, inside_self: bool) -> bool {
    if self_hit && !inside_self {
        return false;
    }

    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;
    for axis in 0..3 {
        let t1 = (-1.0 - ray.o[axis]) / ray.d[axis];
        let t2 = (1.0 - ray.o[axis]) / ray.d[axis];
        t_near = t_near.max(t1.min(t2));
        t_far = t_far.min(t1.max(t2));
    }
    if t_near > t_far || t_far < ray.t_min {
        return false;
    }

    let t = if self_hit {
        t_far
    } else if t_near >= ray.t_min {
        t_near
    } else {
        t_far
    };
    if t < ray.t_min || t > ray.t_max || (self_hit && t <= 0.0) {
        return false;
    }

    ray.t_max = t;
    hit.p = ray.at(t);
    // The face normal is the axis where the hit point reaches the surface.
    let axis = abs_max_axis(hit.p);
    let mut n = Vec3::ZERO;
    n[axis] = hit.p[axis].signum();
    hit.n = n;
    true
}
