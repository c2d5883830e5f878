use glam::Vec3;

use crate::math::Ray;
use crate::transform::Transform;

/// How camera-space film points turn into rays.
#[derive(Clone, Copy, Debug)]
pub enum Projection {
    /// Ideal pinhole; the lens sample is ignored.
    Pinhole { hfov: f32 },
    /// Thin lens with circular aperture. `obj_dist` is the focus distance
    /// stored negative (the object sits on the -z side).
    ThinLens {
        focal: f32,
        obj_dist: f32,
        f_number: f32,
    },
}

/// Camera with a physical film plane measured in meters. Pixel and lens
/// coordinates come in normalized to the unit square.
pub struct Camera {
    pub world_from_cam: Transform,
    pub film_w: f32,
    pub film_h: f32,
    pub projection: Projection,
}

impl Camera {
    /// Standard full-frame 36x24 mm film.
    const DEFAULT_FILM: (f32, f32) = (0.036, 0.024);

    pub fn pinhole(hfov_degrees: f32) -> Camera {
        Camera {
            world_from_cam: Transform::IDENTITY,
            film_w: Self::DEFAULT_FILM.0,
            film_h: Self::DEFAULT_FILM.1,
            projection: Projection::Pinhole {
                hfov: hfov_degrees.to_radians(),
            },
        }
    }

    pub fn thin_lens(focal_length_mm: f32, focus_distance_m: f32, f_number: f32) -> Camera {
        Camera {
            world_from_cam: Transform::IDENTITY,
            film_w: Self::DEFAULT_FILM.0,
            film_h: Self::DEFAULT_FILM.1,
            projection: Projection::ThinLens {
                focal: focal_length_mm / 1000.0,
                obj_dist: -focus_distance_m,
                f_number,
            },
        }
    }

    pub fn set_film(&mut self, w_mm: f32, h_mm: f32) {
        self.film_w = w_mm / 1000.0;
        self.film_h = h_mm / 1000.0;
    }

    pub fn set_xform(&mut self, world_from_cam: Transform) {
        self.world_from_cam = world_from_cam;
    }

    /// Map `(x, y, u, v)` in [0,1]^4 (normalized pixel + lens coordinates)
    /// to a world-space ray.
    pub fn generate_ray(&self, x: f32, y: f32, u: f32, v: f32) -> Ray {
        let (o, d) = self.get_vector(
            (x * 2.0 - 1.0) * self.film_w / 2.0,
            (y * 2.0 - 1.0) * self.film_h / 2.0,
            u * 2.0 - 1.0,
            v * 2.0 - 1.0,
        );
        self.world_from_cam.ray(&Ray::new(o, d))
    }

    fn get_vector(&self, x: f32, y: f32, u: f32, v: f32) -> (Vec3, Vec3) {
        match self.projection {
            Projection::Pinhole { hfov } => {
                // Distance from pinhole to film, derived from the field of
                // view on demand so film dimensions can change after
                // construction.
                let film_d = (self.film_w / 2.0) / (hfov / 2.0).tan();
                let i = Vec3::new(x, y, film_d);
                (Vec3::ZERO, (-i).normalize())
            }
            Projection::ThinLens {
                focal,
                obj_dist,
                f_number,
            } => {
                // magnification and image distance from the thin-lens
                // equation
                let m = focal / (focal - obj_dist);
                let d_i = -m * obj_dist;
                // aperture diameter
                let d = focal / f_number;

                let i = Vec3::new(x, y, d_i);
                let p = Vec3::new(u * d / 2.0, v * d / 2.0, 0.0);
                // virtual object point the image point focuses on
                let o = Vec3::new(i.x / m, i.y / m, obj_dist);
                (p, (o - p).normalize())
            }
        }
    }
}
