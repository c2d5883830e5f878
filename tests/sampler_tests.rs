use rand::rngs::StdRng;
use rand::SeedableRng;

use pathlight::error::Error;
use pathlight::sampler::{SampleGenerator, SamplerKind};

#[test]
fn sampler_kind_parses() {
    assert_eq!("random".parse::<SamplerKind>().unwrap(), SamplerKind::Random);
    assert_eq!(
        "stratified".parse::<SamplerKind>().unwrap(),
        SamplerKind::Stratified
    );
    assert!(matches!(
        "sobol".parse::<SamplerKind>(),
        Err(Error::Config(_))
    ));
}

#[test]
fn stratified_requires_square_sample_count() {
    assert!(SampleGenerator::new(SamplerKind::Stratified, 4, 16).is_ok());
    assert!(matches!(
        SampleGenerator::new(SamplerKind::Stratified, 4, 12),
        Err(Error::Config(_))
    ));
    // The random sampler takes any count.
    assert!(SampleGenerator::new(SamplerKind::Random, 4, 12).is_ok());
}

#[test]
fn random_samples_are_in_unit_square() {
    let mut gen = SampleGenerator::new(SamplerKind::Random, 8, 16).unwrap();
    let mut rng = StdRng::seed_from_u64(99);
    gen.generate(&mut rng);
    assert_eq!(gen.samples.len(), 16);
    for sample in &mut gen.samples {
        for _ in 0..8 {
            let v = sample.next_2d();
            assert!((0.0..1.0).contains(&v.x));
            assert!((0.0..1.0).contains(&v.y));
        }
    }
}

#[test]
fn stratified_covers_every_stratum() {
    const DIM: usize = 4;
    const SPP: usize = DIM * DIM;
    const N2D: usize = 3;

    let mut gen = SampleGenerator::new(SamplerKind::Stratified, N2D, SPP).unwrap();
    let mut rng = StdRng::seed_from_u64(4242);
    gen.generate(&mut rng);

    // Drain the prearranged points dimension-major: the j-th call on each
    // sample yields that sample's j-th dimension.
    let mut dims = vec![Vec::new(); N2D];
    for _ in 0..SPP {
        dims.iter_mut().for_each(|d| d.push(None));
    }
    for (s, sample) in gen.samples.iter_mut().enumerate() {
        for dim in dims.iter_mut() {
            dim[s] = Some(sample.next_2d());
        }
    }

    for dim in &dims {
        let mut seen = vec![false; SPP];
        for v in dim.iter().flatten() {
            let cu = (v.x * DIM as f32) as usize;
            let cv = (v.y * DIM as f32) as usize;
            assert!(cu < DIM && cv < DIM, "sample outside the unit square");
            let cell = cu + cv * DIM;
            assert!(!seen[cell], "two samples in stratum {cell}");
            seen[cell] = true;
        }
        assert!(seen.iter().all(|&s| s), "a stratum received no sample");
    }
}

#[test]
fn generation_is_deterministic_per_seed() {
    let mut a = SampleGenerator::new(SamplerKind::Stratified, 6, 9).unwrap();
    let mut b = SampleGenerator::new(SamplerKind::Stratified, 6, 9).unwrap();
    a.generate(&mut StdRng::seed_from_u64(1717));
    b.generate(&mut StdRng::seed_from_u64(1717));

    for (sa, sb) in a.samples.iter_mut().zip(b.samples.iter_mut()) {
        for _ in 0..10 {
            // Identical through the prearranged budget and beyond: the
            // overflow RNGs are seeded from the same stream too.
            assert_eq!(sa.next_2d(), sb.next_2d());
        }
        assert_eq!(sa.rand(), sb.rand());
    }

    let mut c = SampleGenerator::new(SamplerKind::Stratified, 6, 9).unwrap();
    c.generate(&mut StdRng::seed_from_u64(1718));
    let first_a = {
        let mut a2 = SampleGenerator::new(SamplerKind::Stratified, 6, 9).unwrap();
        a2.generate(&mut StdRng::seed_from_u64(1717));
        a2.samples[0].next_2d()
    };
    assert_ne!(first_a, c.samples[0].next_2d());
}

#[test]
fn overflow_falls_back_to_uniform() {
    let mut gen = SampleGenerator::new(SamplerKind::Random, 2, 4).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    gen.generate(&mut rng);

    let sample = &mut gen.samples[0];
    for _ in 0..20 {
        let v = sample.next_2d();
        assert!((0.0..1.0).contains(&v.x));
        assert!((0.0..1.0).contains(&v.y));
    }
    let r = sample.rand();
    assert!((0.0..1.0).contains(&r));
}
