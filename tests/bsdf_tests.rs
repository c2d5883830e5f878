use glam::{Vec2, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use pathlight::bsdf::{Bsdf, Fresnel};
use pathlight::math::Spectrum;

#[test]
fn lambertian_white_furnace() {
    // For rho = 1 the reflected energy integrates to 1: the Monte-Carlo
    // mean of f |cos| / pdf over hemisphere samples converges to it.
    let bsdf = Bsdf::Lambertian {
        rho: Spectrum::ONE,
    };
    let wo = Vec3::Z;
    let mut rng = SmallRng::seed_from_u64(7);
    let n = 200_000;
    let mut sum = 0.0f64;
    for _ in 0..n {
        let u = Vec2::new(rng.gen(), rng.gen());
        let bs = bsdf.sample(wo, u).unwrap();
        assert!(bs.pdf > 0.0);
        sum += f64::from(bs.f.x * bs.wi.z.abs() / bs.pdf);
    }
    let mean = sum / n as f64;
    assert!((mean - 1.0).abs() < 0.01, "white furnace mean {mean}");
}

#[test]
fn lambertian_samples_upper_hemisphere() {
    let bsdf = Bsdf::Lambertian {
        rho: Spectrum::splat(0.5),
    };
    let mut rng = SmallRng::seed_from_u64(11);
    for _ in 0..1000 {
        let bs = bsdf
            .sample(Vec3::Z, Vec2::new(rng.gen(), rng.gen()))
            .unwrap();
        assert!(bs.wi.z >= 0.0);
        assert!((bs.wi.length() - 1.0).abs() < 1e-4);
        assert!((bs.f.x - 0.5 / std::f32::consts::PI).abs() < 1e-6);
    }
}

#[test]
fn oren_nayar_zero_sigma_is_lambertian() {
    let rough = Bsdf::oren_nayar(Spectrum::splat(0.8), 0.0);
    let smooth = Bsdf::Lambertian {
        rho: Spectrum::splat(0.8),
    };
    let wo = Vec3::new(0.3, 0.2, 0.933).normalize();
    let u = Vec2::new(0.37, 0.61);
    let a = rough.sample(wo, u).unwrap();
    let b = smooth.sample(wo, u).unwrap();
    assert!((a.f - b.f).length() < 1e-5);
    assert!((a.wi - b.wi).length() < 1e-6);
    assert_eq!(a.pdf, b.pdf);
}

#[test]
fn oren_nayar_rejects_views_from_below() {
    let bsdf = Bsdf::oren_nayar(Spectrum::ONE, 0.3);
    assert!(bsdf
        .sample(Vec3::new(0.0, 0.5, -0.866), Vec2::new(0.5, 0.5))
        .is_none());
}

#[test]
fn oren_nayar_darkens_at_grazing_difference() {
    // Same outgoing elevation: retroreflection (phi difference 0) must be
    // at least as bright as the opposite azimuth.
    let bsdf = Bsdf::oren_nayar(Spectrum::ONE, 0.4);
    let wo = Vec3::new(0.6, 0.0, 0.8);
    // Force wi via sample(u) pairs that land near the wanted azimuths is
    // fiddly; instead exploit that f only depends on wo and wi. Use two
    // manual draws with mirrored first components.
    let mut rng = SmallRng::seed_from_u64(3);
    let mut best_same = 0.0f32;
    let mut best_opposite = 0.0f32;
    for _ in 0..2000 {
        let bs = bsdf
            .sample(wo, Vec2::new(rng.gen(), rng.gen()))
            .unwrap();
        if bs.wi.z < 0.3 || bs.wi.z > 0.5 {
            continue;
        }
        let radial = (bs.wi.x * bs.wi.x + bs.wi.y * bs.wi.y).sqrt();
        if bs.wi.x > 0.8 * radial {
            best_same = best_same.max(bs.f.x);
        }
        if bs.wi.x < -0.8 * radial {
            best_opposite = best_opposite.max(bs.f.x);
        }
    }
    assert!(best_same > 0.0 && best_opposite > 0.0);
    assert!(best_same >= best_opposite);
}

#[test]
fn mirror_reflects_across_normal() {
    let bsdf = Bsdf::SpecularReflection {
        r: Spectrum::ONE,
        fresnel: Fresnel::One,
    };
    let wo = Vec3::new(0.3, -0.4, 0.866).normalize();
    let bs = bsdf.sample(wo, Vec2::ZERO).unwrap();
    assert!((bs.wi - Vec3::new(-wo.x, -wo.y, wo.z)).length() < 1e-6);
    assert_eq!(bs.pdf, 1.0);
    // f |cos| equals the reflectance: the mirror is lossless.
    let carried = bs.f * bs.wi.z.abs();
    assert!((carried - Spectrum::ONE).length() < 1e-5);
}

#[test]
fn fresnel_dielectric_symmetry() {
    // F(cos_i; n1, n2) == F(cos_t; n2, n1) for Snell-related angles.
    let (n1, n2) = (1.0f32, 1.5f32);
    for cos_i in [0.95f32, 0.8, 0.6, 0.4, 0.2] {
        let sin_i = (1.0 - cos_i * cos_i).sqrt();
        let sin_t = sin_i * n1 / n2;
        let cos_t = (1.0 - sin_t * sin_t).sqrt();

        let forward = Fresnel::Dielectric {
            eta_i: n1,
            eta_t: n2,
        }
        .evaluate(cos_i)
        .x;
        let reverse = Fresnel::Dielectric {
            eta_i: n2,
            eta_t: n1,
        }
        .evaluate(cos_t)
        .x;
        assert!(
            (forward - reverse).abs() < 1e-5,
            "cos_i {cos_i}: {forward} vs {reverse}"
        );
    }
}

#[test]
fn fresnel_dielectric_total_internal_reflection() {
    // Past the critical angle inside the denser medium everything reflects.
    let f = Fresnel::Dielectric {
        eta_i: 1.5,
        eta_t: 1.0,
    };
    // cos_i < 0 encodes a ray on the inside; sin_i = 0.8 > 1/1.5.
    assert_eq!(f.evaluate(-0.6), Spectrum::ONE);
}

#[test]
fn fresnel_conductor_normal_incidence() {
    let eta = 0.2f32;
    let k = 3.1f32;
    let f = Fresnel::Conductor {
        eta: Spectrum::splat(eta),
        k: Spectrum::splat(k),
    }
    .evaluate(1.0);
    let expected = (eta * eta + k * k - 2.0 * eta + 1.0) / (eta * eta + k * k + 2.0 * eta + 1.0);
    assert!((f.x - expected).abs() < 1e-5);
    // Inside a conductor there is nothing to reflect.
    let inside = Fresnel::Conductor {
        eta: Spectrum::splat(eta),
        k: Spectrum::splat(k),
    }
    .evaluate(-0.5);
    assert_eq!(inside, Spectrum::ZERO);
}

#[test]
fn transmission_normal_incidence_goes_straight_through() {
    let bsdf = Bsdf::SpecularTransmission {
        t: Spectrum::ONE,
        eta_i: 1.0,
        eta_t: 1.5,
    };
    let bs = bsdf.sample(Vec3::Z, Vec2::ZERO).unwrap();
    assert!((bs.wi - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
    assert_eq!(bs.pdf, 1.0);
}

#[test]
fn transmission_bends_toward_the_normal_entering_glass() {
    let bsdf = Bsdf::SpecularTransmission {
        t: Spectrum::ONE,
        eta_i: 1.0,
        eta_t: 1.5,
    };
    let wo = Vec3::new(0.6, 0.0, 0.8);
    let bs = bsdf.sample(wo, Vec2::ZERO).unwrap();
    // sin_t = sin_i / 1.5
    assert!((bs.wi.x - (-0.4)).abs() < 1e-5);
    assert!(bs.wi.z < 0.0);
    assert!((bs.wi.length() - 1.0).abs() < 1e-5);
}

#[test]
fn transmission_total_internal_reflection_returns_no_sample() {
    let bsdf = Bsdf::SpecularTransmission {
        t: Spectrum::ONE,
        eta_i: 1.0,
        eta_t: 1.5,
    };
    // Leaving the dense side at a grazing angle: cos_o < 0 and
    // sin_i = 1.5 * 0.9 > 1.
    let wo = Vec3::new(0.9, 0.0, -(1.0f32 - 0.81).sqrt());
    assert!(bsdf.sample(wo, Vec2::ZERO).is_none());
}
