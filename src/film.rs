use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::hdr::HdrEncoder;
use image::Rgb;
use log::debug;

use crate::error::Result;
use crate::math::Spectrum;

/// One film pixel: a weighted running sum of radiance estimates plus the
/// cached tone-mapped value.
#[derive(Clone, Copy, Default)]
pub struct Pixel {
    pub sum: Spectrum,
    pub weight: f32,
    pub tonemapped: Spectrum,
}

impl Pixel {
    fn add(&mut self, s: Spectrum, w: f32) {
        self.sum += s;
        self.weight += w;
    }

    pub fn normalized(&self) -> Spectrum {
        if self.weight > 0.0 {
            self.sum / self.weight
        } else {
            Spectrum::ZERO
        }
    }
}

/// Rectangular radiance accumulator. Samples arrive in any order; merges of
/// disjoint partial films commute.
#[derive(Clone)]
pub struct Film {
    pub xres: usize,
    pub yres: usize,
    data: Vec<Pixel>,
}

impl Film {
    pub fn new(xres: usize, yres: usize) -> Self {
        Self {
            xres,
            yres,
            data: vec![Pixel::default(); xres * yres],
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> &Pixel {
        &self.data[x + y * self.xres]
    }

    /// Accumulate a radiance estimate at normalized film coordinates,
    /// snapping to the nearest pixel with unit weight.
    pub fn add_sample(&mut self, x: f32, y: f32, s: Spectrum) {
        let xi = ((x * self.xres as f32) as isize).clamp(0, self.xres as isize - 1) as usize;
        let yi = ((y * self.yres as f32) as isize).clamp(0, self.yres as isize - 1) as usize;
        self.data[xi + yi * self.xres].add(s, 1.0);
    }

    /// Add another film's sums and weights pixelwise at the given offset.
    /// Commutative and associative across disjoint source films.
    pub fn merge(&mut self, src: &Film, xofs: usize, yofs: usize) {
        for y in 0..src.yres {
            if yofs + y >= self.yres {
                break;
            }
            for x in 0..src.xres {
                if xofs + x >= self.xres {
                    break;
                }
                let s = src.data[x + y * src.xres];
                self.data[xofs + x + (yofs + y) * self.xres].add(s.sum, s.weight);
            }
        }
    }

    /// Reinhard photographic tone reproduction, applied per channel, with
    /// gamma 2.2. Fills the cached `tonemapped` values.
    pub fn tone_map(&mut self) {
        const DELTA: f64 = 1e-5;
        const ALPHA: f64 = 0.18;
        const GAMMA: f64 = 2.2;

        let n = (self.xres * self.yres) as f64;
        for ch in 0..3 {
            let mut log_sum = 0.0f64;
            let mut l_max = 0.0f64;
            for px in &self.data {
                let lw = f64::from(px.normalized()[ch]);
                log_sum += (DELTA + lw).ln();
                l_max = l_max.max(lw);
            }
            // Log-average luminance of the channel.
            let l_avg = (log_sum / n).exp();
            debug!("tone map channel {ch}: log-avg {l_avg:.5}, max {l_max:.5}");

            if l_max <= 0.0 {
                for px in &mut self.data {
                    px.tonemapped[ch] = 0.0;
                }
                continue;
            }

            let l_white2 = l_max * l_max;
            for px in &mut self.data {
                let l = ALPHA / l_avg * f64::from(px.normalized()[ch]);
                let ld = l * (1.0 + l / l_white2) / (1.0 + l);
                px.tonemapped[ch] = ld.powf(1.0 / GAMMA) as f32;
            }
        }
    }

    /// Tone-mapped 24-bit PNG.
    pub fn save_png(&mut self, path: &Path) -> Result<()> {
        self.tone_map();
        let mut rgb = vec![0u8; self.xres * self.yres * 3];
        for y in 0..self.yres {
            for x in 0..self.xres {
                let px = self.data[x + y * self.xres];
                let o = x + (self.yres - 1 - y) * self.xres;
                for k in 0..3 {
                    rgb[o * 3 + k] = (px.tonemapped[k] * 255.0).clamp(0.0, 255.0) as u8;
                }
            }
        }
        image::save_buffer(
            path,
            &rgb,
            self.xres as u32,
            self.yres as u32,
            image::ColorType::Rgb8,
        )?;
        Ok(())
    }

    /// Normalized (un-tonemapped) radiance as Radiance RGBE, rows written
    /// bottom-to-top.
    pub fn save_hdr(&self, path: &Path) -> Result<()> {
        let mut pixels = Vec::with_capacity(self.xres * self.yres);
        for y in (0..self.yres).rev() {
            for x in 0..self.xres {
                let v = self.data[x + y * self.xres].normalized();
                pixels.push(Rgb([v.x, v.y, v.z]));
            }
        }
        let writer = BufWriter::new(File::create(path)?);
        HdrEncoder::new(writer).encode(&pixels, self.xres, self.yres)?;
        Ok(())
    }

    /// Raw dump: i32 xres, i32 yres, then xres*yres float32 RGB triples of
    /// normalized radiance, all little-endian.
    pub fn save_float(&self, path: &Path) -> Result<()> {
        let mut floats = Vec::with_capacity(self.xres * self.yres * 3);
        for y in 0..self.yres {
            for x in 0..self.xres {
                let v = self.data[x + y * self.xres].normalized();
                floats.extend_from_slice(&[v.x, v.y, v.z]);
            }
        }
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&(self.xres as i32).to_le_bytes())?;
        writer.write_all(&(self.yres as i32).to_le_bytes())?;
        writer.write_all(bytemuck::cast_slice(&floats))?;
        Ok(())
    }
}
