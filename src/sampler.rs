use glam::Vec2;
use rand::rngs::{SmallRng, StdRng};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

/// How many 2D dimensions are prearranged per sample before the overflow
/// RNG takes over. One pair goes to the pixel jitter, one to the lens, the
/// rest to BSDF and lobe-selection draws along the path.
pub const SAMPLE_DIMENSIONS: usize = 20;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SamplerKind {
    Random,
    Stratified,
}

impl std::str::FromStr for SamplerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "random" => Ok(SamplerKind::Random),
            "stratified" => Ok(SamplerKind::Stratified),
            other => Err(Error::Config(format!("unknown sampler {other:?}"))),
        }
    }
}

/// One pixel sample: an ordered sequence of prearranged 2D points plus an
/// RNG that serves overflow dimensions and scalar draws (Russian roulette).
pub struct Sample {
    samples_2d: Vec<Vec2>,
    index_2d: usize,
    rng: SmallRng,
}

impl Sample {
    fn new(rng: SmallRng, n2d: usize) -> Self {
        Self {
            samples_2d: vec![Vec2::ZERO; n2d],
            index_2d: 0,
            rng,
        }
    }

    /// Next prearranged 2D point, falling back to fresh uniform pairs once
    /// the budget is spent.
    pub fn next_2d(&mut self) -> Vec2 {
        if self.index_2d < self.samples_2d.len() {
            let s = self.samples_2d[self.index_2d];
            self.index_2d += 1;
            s
        } else {
            Vec2::new(self.rng.gen(), self.rng.gen())
        }
    }

    pub fn rand(&mut self) -> f32 {
        self.rng.gen()
    }
}

/// Per-pixel sample set of `spp` samples, regenerated from a fresh seed for
/// every pixel so the stream is a deterministic function of (x, y).
pub struct SampleGenerator {
    kind: SamplerKind,
    n2d: usize,
    spp: usize,
    /// Strata per axis; only meaningful for the stratified kind.
    dim: usize,
    pub samples: Vec<Sample>,
}

impl SampleGenerator {
    pub fn new(kind: SamplerKind, n2d: usize, spp: usize) -> Result<Self> {
        let mut dim = 0;
        if kind == SamplerKind::Stratified {
            dim = (spp as f32).sqrt() as usize;
            if dim * dim != spp {
                return Err(Error::Config(format!(
                    "stratified sampler needs a square sample count, got {spp}"
                )));
            }
        }
        Ok(Self {
            kind,
            n2d,
            spp,
            dim,
            samples: Vec::new(),
        })
    }

    pub fn spp(&self) -> usize {
        self.spp
    }

    /// Rebuild all samples for one pixel from the given generator.
    pub fn generate(&mut self, rng: &mut StdRng) {
        self.samples.clear();
        for _ in 0..self.spp {
            let sample_rng = SmallRng::seed_from_u64(rng.gen());
            self.samples.push(Sample::new(sample_rng, self.n2d));
        }

        match self.kind {
            SamplerKind::Random => {
                for sample in &mut self.samples {
                    for s in &mut sample.samples_2d {
                        *s = Vec2::new(rng.gen(), rng.gen());
                    }
                }
            }
            SamplerKind::Stratified => {
                // For every dimension, jitter one point per stratum and
                // scatter them over the samples with a fresh permutation so
                // dimensions stay decorrelated.
                let dim = self.dim;
                let inv = 1.0 / dim as f32;
                let mut indices: Vec<usize> = (0..self.spp).collect();
                for j in 0..self.n2d {
                    indices.shuffle(rng);
                    for v in 0..dim {
                        for u in 0..dim {
                            let uf = rng.gen_range(u as f32 * inv..(u + 1) as f32 * inv);
                            let vf = rng.gen_range(v as f32 * inv..(v + 1) as f32 * inv);
                            self.samples[indices[u + v * dim]].samples_2d[j] = Vec2::new(uf, vf);
                        }
                    }
                }
            }
        }
    }
}
