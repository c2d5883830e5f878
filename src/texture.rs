use glam::Vec3;

use crate::math::Spectrum;

/// Procedural textures: pure, deterministic functions from a world-space
/// point to a spectrum.
#[derive(Clone, Copy, Debug)]
pub enum Texture {
    Solid(Spectrum),
    /// 3D checkerboard with unit-sized cells.
    Checker { a: Spectrum, b: Spectrum },
    /// Thin axis-aligned grid lines of the given width over a base color.
    Grid { a: Spectrum, b: Spectrum, width: f32 },
}

impl Texture {
    pub fn sample(&self, p: Vec3) -> Spectrum {
        match *self {
            Texture::Solid(a) => a,
            Texture::Checker { a, b } => {
                // Offset far from the origin so the parity pattern does not
                // flip exactly on the coordinate planes.
                let pp = p * 2.0 - Vec3::splat(1000.0);
                let parity = (pp.x.floor() as i64)
                    ^ (pp.y.floor() as i64)
                    ^ (pp.z.floor() as i64);
                if parity & 1 != 0 {
                    a
                } else {
                    b
                }
            }
            Texture::Grid { a, b, width } => {
                if p.x - p.x.floor() < width
                    || p.y - p.y.floor() < width
                    || p.z - p.z.floor() < width
                {
                    b
                } else {
                    a
                }
            }
        }
    }
}
