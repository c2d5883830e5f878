use crate::camera::Camera;
use crate::math::Ray;
use crate::primitive::{Aggregate, Isect};
use crate::skylight::Skylight;

/// Everything the integrator sees: the primitive tree, the camera and the
/// background. Immutable once rendering starts; workers share it by
/// reference without locking.
pub struct Scene {
    pub aggregate: Aggregate,
    pub camera: Camera,
    pub skylight: Skylight,
}

impl Scene {
    pub fn new(aggregate: Aggregate, camera: Camera, skylight: Skylight) -> Self {
        Self {
            aggregate,
            camera,
            skylight,
        }
    }

    /// Closest intersection along the ray. `prev` is the intersection the
    /// ray originates from (None for camera rays); it feeds the
    /// self-intersection policy of the shapes.
    pub fn intersect(&self, ray: &mut Ray, prev: Option<&Isect>) -> Option<Isect> {
        self.aggregate.intersect(ray, prev)
    }
}
