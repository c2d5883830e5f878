use glam::{Vec2, Vec3};

use crate::math::{
    abs_cos_theta, cos_phi, cos_theta, sin2_theta, sin_phi, sin_theta, tan_theta,
    uniform_hemisphere_pdf, uniform_sample_hemisphere, Spectrum, PI,
};

/// Unpolarized dielectric reflectance from the incident and transmitted
/// cosines and indices of refraction.
fn fresnel_dielectric(cos_i: f32, cos_t: f32, eta_i: f32, eta_t: f32) -> f32 {
    // parallel and perpendicular polarized amplitudes
    let r_par = (eta_t * cos_i - eta_i * cos_t) / (eta_t * cos_i + eta_i * cos_t);
    let r_per = (eta_i * cos_i - eta_t * cos_t) / (eta_i * cos_i + eta_t * cos_t);
    (r_par * r_par + r_per * r_per) / 2.0
}

/// Fresnel reflectance as a function of the incident cosine.
#[derive(Clone, Copy, Debug)]
pub enum Fresnel {
    /// Smooth dielectric interface between media with the given indices.
    Dielectric { eta_i: f32, eta_t: f32 },
    /// Conductor with per-channel complex index of refraction (eta, k).
    Conductor { eta: Spectrum, k: Spectrum },
    /// Reflects everything; used by the ideal mirror.
    One,
}

impl Fresnel {
    pub fn evaluate(&self, cos_i: f32) -> Spectrum {
        match *self {
            Fresnel::Dielectric { eta_i, eta_t } => {
                let (mut ei, mut et) = (eta_i, eta_t);
                let mut cos_i = cos_i;
                // Swap indices when exiting: the incident direction is on
                // the far side of the normal.
                if cos_i < 0.0 {
                    std::mem::swap(&mut ei, &mut et);
                    cos_i = -cos_i;
                }

                // Snell: eta_i sin_i = eta_t sin_t.
                let sin_i = (1.0 - cos_i * cos_i).max(0.0).sqrt();
                let sin_t = sin_i * ei / et;
                if sin_t >= 1.0 {
                    // Total internal reflection.
                    return Spectrum::ONE;
                }
                let cos_t = (1.0 - sin_t * sin_t).sqrt();
                Spectrum::splat(fresnel_dielectric(cos_i, cos_t, ei, et))
            }
            Fresnel::Conductor { eta, k } => {
                // A ray arriving from inside a conductor is a clipping bug.
                if cos_i < 0.0 {
                    return Spectrum::ZERO;
                }
                let e2k2 = eta * eta + k * k;
                let eta2cos = 2.0 * eta * cos_i;
                let cos2 = cos_i * cos_i;

                let r_par2 = (e2k2 * cos2 - eta2cos + Spectrum::ONE)
                    / (e2k2 * cos2 + eta2cos + Spectrum::ONE);
                let r_per2 = (e2k2 - eta2cos + Spectrum::splat(cos2))
                    / (e2k2 + eta2cos + Spectrum::splat(cos2));
                (r_par2 + r_per2) * 0.5
            }
            Fresnel::One => Spectrum::ONE,
        }
    }
}

/// One draw from a BSDF: the sampled incoming direction in tangent space,
/// the BSDF value and the density the direction was drawn with. `pdf` is
/// always positive on a returned sample.
#[derive(Clone, Copy, Debug)]
pub struct BsdfSample {
    pub wi: Vec3,
    pub f: Spectrum,
    pub pdf: f32,
}

/// Tangent-space scattering functions. The frame is right-handed with z
/// along the surface normal; `wo` points away from the surface.
pub enum Bsdf {
    Lambertian {
        rho: Spectrum,
    },
    OrenNayar {
        rho: Spectrum,
        a: f32,
        b: f32,
    },
    SpecularReflection {
        r: Spectrum,
        fresnel: Fresnel,
    },
    SpecularTransmission {
        t: Spectrum,
        eta_i: f32,
        eta_t: f32,
    },
}

impl Bsdf {
    pub fn oren_nayar(rho: Spectrum, sigma: f32) -> Bsdf {
        let sigma2 = sigma * sigma;
        Bsdf::OrenNayar {
            rho,
            a: 1.0 - sigma2 / (2.0 * (sigma2 + 0.33)),
            b: 0.45 * sigma2 / (sigma2 + 0.09),
        }
    }

    /// Sample an incoming direction for the given outgoing one. `None`
    /// means the drawn direction carries no energy (total internal
    /// reflection, or a view direction under the surface for lobes that
    /// reject it); the path terminates with only the emitted term.
    pub fn sample(&self, wo: Vec3, u: Vec2) -> Option<BsdfSample> {
        match *self {
            Bsdf::Lambertian { rho } => {
                let wi = uniform_sample_hemisphere(u);
                Some(BsdfSample {
                    wi,
                    f: rho / PI,
                    pdf: uniform_hemisphere_pdf(),
                })
            }
            Bsdf::OrenNayar { rho, a, b } => {
                if cos_theta(wo) <= 0.0 {
                    return None;
                }
                let wi = uniform_sample_hemisphere(u);

                // fr = rho/pi (A + B max(0, cos(phi_i - phi_o)) sin a tan b)
                // with a = max(theta_i, theta_o), b = min(theta_i, theta_o).
                // cos X < cos Y  <=>  X > Y
                let i_greater = cos_theta(wi) < cos_theta(wo);
                let sin_a = if i_greater { sin_theta(wi) } else { sin_theta(wo) };
                let tan_b = if i_greater { tan_theta(wo) } else { tan_theta(wi) };

                // cos(phi_i - phi_o) without extracting the angles.
                let c = cos_phi(wi) * cos_phi(wo) + sin_phi(wi) * sin_phi(wo);
                let term = a + b * c.max(0.0) * sin_a * tan_b;

                Some(BsdfSample {
                    wi,
                    f: term * rho / PI,
                    pdf: uniform_hemisphere_pdf(),
                })
            }
            Bsdf::SpecularReflection { r, fresnel } => {
                let wi = Vec3::new(-wo.x, -wo.y, wo.z);
                Some(BsdfSample {
                    wi,
                    f: fresnel.evaluate(cos_theta(wo)) * r / abs_cos_theta(wi),
                    pdf: 1.0,
                })
            }
            Bsdf::SpecularTransmission { t, eta_i, eta_t } => {
                let cos_o = cos_theta(wo);
                let (mut eta_o, mut eta_in) = (eta_i, eta_t);
                let entering = cos_o >= 0.0;
                if !entering {
                    std::mem::swap(&mut eta_o, &mut eta_in);
                }

                // Snell: sin2_i = (eta_o / eta_i)^2 sin2_o.
                let eta = eta_o / eta_in;
                let sin2_i = eta * eta * sin2_theta(wo);
                if sin2_i >= 1.0 {
                    // Total internal reflection; the material layer is
                    // expected to carry a reflection lobe for this case.
                    return None;
                }
                let cos_i = (1.0 - sin2_i).sqrt();

                // The tangential part of wi is -wo scaled by sin_i/sin_o,
                // which by Snell's law is eta_o/eta_i.
                let wi = Vec3::new(
                    eta * -wo.x,
                    eta * -wo.y,
                    if entering { -cos_i } else { cos_i },
                );

                let fr = Fresnel::Dielectric { eta_i, eta_t }.evaluate(cos_i);
                Some(BsdfSample {
                    wi,
                    f: (eta * eta) * (Spectrum::ONE - fr) * t / abs_cos_theta(wi),
                    pdf: 1.0,
                })
            }
        }
    }
}
