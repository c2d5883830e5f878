use std::sync::Arc;

use glam::Vec3;

use crate::material::Material;
use crate::math::{Ray, Spectrum};
use crate::shape::{LocalHit, Shape};
use crate::transform::Transform;

/// World-space intersection record. Lives on the stack for the duration of
/// one ray query; the previous bounce's record is threaded back into the
/// next `Scene::intersect` for the self-intersection policy.
#[derive(Clone)]
pub struct Isect {
    pub p: Vec3,
    pub n: Vec3,
    pub material: Arc<Material>,
    pub le: Spectrum,
    /// Identity of the primitive that produced the hit (its index in the
    /// aggregate).
    pub prim: u32,
}

/// A shape placed in the world with a material and an emitted radiance.
pub struct GeometricPrimitive {
    pub shape: Arc<Shape>,
    pub material: Arc<Material>,
    pub world_from_prim: Transform,
    pub le: Spectrum,
}

impl GeometricPrimitive {
    /// Transform the ray to the local frame, intersect, and transform the
    /// hit back. `id` is this primitive's index in the aggregate; `prev`
    /// the intersection the ray originates from, if any.
    fn intersect(&self, id: u32, ray: &mut Ray, prev: Option<&Isect>) -> Option<Isect> {
        let prim_from_world = self.world_from_prim.inverse();
        let mut local_ray = prim_from_world.ray(ray);
        let mut hit = LocalHit::default();

        let hit_ok = match prev {
            Some(prev) if prev.prim == id => {
                let inside = ray.d.dot(prev.n) < 0.0;
                self.shape.intersect(&mut local_ray, &mut hit, true, inside)
            }
            _ => self.shape.intersect(&mut local_ray, &mut hit, false, false),
        };
        if !hit_ok {
            return None;
        }

        ray.t_max = local_ray.t_max;
        Some(Isect {
            p: self.world_from_prim.point(hit.p),
            n: self.world_from_prim.normal(hit.n).normalize(),
            material: Arc::clone(&self.material),
            le: self.le,
            prim: id,
        })
    }
}

/// Flat list of primitives. Closest-hit semantics fall out of the
/// monotonically narrowing `ray.t_max`.
#[derive(Default)]
pub struct Aggregate {
    prims: Vec<GeometricPrimitive>,
}

impl Aggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, prim: GeometricPrimitive) {
        self.prims.push(prim);
    }

    pub fn len(&self) -> usize {
        self.prims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prims.is_empty()
    }

    pub fn intersect(&self, ray: &mut Ray, prev: Option<&Isect>) -> Option<Isect> {
        let mut closest = None;
        for (id, prim) in self.prims.iter().enumerate() {
            if let Some(isect) = prim.intersect(id as u32, ray, prev) {
                closest = Some(isect);
            }
        }
        closest
    }
}
