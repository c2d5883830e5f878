use crate::math::{abs_cos_theta, Ray, Spectrum};
use crate::sampler::Sample;
use crate::scene::Scene;
use crate::transform::tangent_from_world;

/// Russian-roulette survival probability. High enough that long paths are
/// terminated rarely; the energy bias is compensated by dividing every
/// surviving segment's contribution by it.
pub const SURVIVAL_PROB: f32 = 0.99;

/// Recursive Monte-Carlo radiance estimator, written as a loop carrying
/// (throughput, accumulated radiance) so nearly-specular paths cannot
/// exhaust the call stack.
pub struct PathIntegrator {
    survival: f32,
}

impl Default for PathIntegrator {
    fn default() -> Self {
        Self::new()
    }
}

impl PathIntegrator {
    pub fn new() -> Self {
        Self {
            survival: SURVIVAL_PROB,
        }
    }

    /// Override the survival probability; 1.0 disables stochastic
    /// termination entirely (emission-only test scenes).
    pub fn with_survival(survival: f32) -> Self {
        Self { survival }
    }

    /// Outgoing radiance along `ray`, equivalently the incoming radiance at
    /// its origin.
    pub fn li(&self, ray: Ray, scene: &Scene, sample: &mut Sample) -> Spectrum {
        let mut l = Spectrum::ZERO;
        let mut throughput = Spectrum::ONE;
        let mut ray = ray;
        let mut prev = None;

        loop {
            if sample.rand() > self.survival {
                break;
            }
            throughput /= self.survival;

            match scene.intersect(&mut ray, prev.as_ref()) {
                Some(isect) => {
                    l += throughput * isect.le;

                    let bsdf = isect.material.bsdf(isect.p, sample.next_2d());
                    let tangent = tangent_from_world(isect.n);
                    let wo = tangent.vector(-ray.d);

                    let Some(bs) = bsdf.sample(wo, sample.next_2d()) else {
                        break;
                    };
                    // Scattering contract: pdf > 0 on every returned
                    // sample, and pdf divides exactly once.
                    throughput *= bs.f * abs_cos_theta(bs.wi) / bs.pdf;

                    let wi_world = tangent.inverse().vector(bs.wi);
                    ray = Ray::new(isect.p, wi_world);
                    prev = Some(isect);
                }
                None => {
                    l += throughput * scene.skylight.sample(ray.d);
                    break;
                }
            }
        }

        l
    }
}
