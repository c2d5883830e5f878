use glam::{Vec2, Vec3};

use crate::bsdf::{Bsdf, Fresnel};
use crate::math::Spectrum;
use crate::texture::Texture;
use crate::transform::Transform;

/// Refraction index used by the glass material.
pub const GLASS_IOR: f32 = 1.3;

/// Surface materials. `bsdf` builds a fresh scratch BSDF for one hit; the
/// 2D sample lets a material pick a lobe stochastically so that the
/// integrator's single BSDF sample represents the mixture fairly.
pub enum Material {
    /// Lambertian reflection over a texture.
    Diffuse {
        reflectance: Texture,
        tex_xform: Transform,
    },
    /// Oren-Nayar rough diffuse; sigma comes from a texture as well.
    RoughDiffuse {
        reflectance: Texture,
        sigma: Texture,
        tex_xform: Transform,
    },
    /// Ideal mirror.
    Mirror { reflectance: Spectrum },
    /// Smooth conductor with complex index (eta, k) per channel.
    Metal { eta: Spectrum, k: Spectrum },
    /// Smooth dielectric slab.
    Glass { reflectance: Spectrum, ior: f32 },
}

impl Material {
    pub fn bsdf(&self, p: Vec3, u: Vec2) -> Bsdf {
        match self {
            Material::Diffuse {
                reflectance,
                tex_xform,
            } => Bsdf::Lambertian {
                rho: reflectance.sample(tex_xform.point(p)),
            },
            Material::RoughDiffuse {
                reflectance,
                sigma,
                tex_xform,
            } => {
                let tp = tex_xform.point(p);
                Bsdf::oren_nayar(reflectance.sample(tp), sigma.sample(tp).x)
            }
            Material::Mirror { reflectance } => Bsdf::SpecularReflection {
                r: *reflectance,
                fresnel: Fresnel::One,
            },
            Material::Metal { eta, k } => Bsdf::SpecularReflection {
                r: Spectrum::ONE,
                fresnel: Fresnel::Conductor { eta: *eta, k: *k },
            },
            Material::Glass { reflectance, ior } => {
                // Pick reflection or transmission with equal probability;
                // scaling the reflectance by 2 compensates the 1/2
                // selection probability. The Fresnel term does not enter
                // the choice.
                if u.x < 0.5 {
                    Bsdf::SpecularReflection {
                        r: 2.0 * *reflectance,
                        fresnel: Fresnel::Dielectric {
                            eta_i: 1.0,
                            eta_t: *ior,
                        },
                    }
                } else {
                    Bsdf::SpecularTransmission {
                        t: 2.0 * *reflectance,
                        eta_i: 1.0,
                        eta_t: *ior,
                    }
                }
            }
        }
    }
}
