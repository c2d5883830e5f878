use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use glam::Vec3;
use image::codecs::hdr::HdrDecoder;
use log::info;

use crate::error::{Error, Result};
use crate::math::{Spectrum, PI};

/// Spacing and half-width of the orientation-debug grid, in radians.
const GRID_STEP: f32 = PI / 12.0;
const GRID_HALF_WIDTH: f32 = 0.01;

/// Background radiance for rays that escape the scene.
pub enum Skylight {
    /// Constant radiance in every direction.
    Solid(Spectrum),
    /// Upward-biased background: R * max(0, dir.y)^3.
    Cosine(Spectrum),
    /// Direction-visualizing debug sky: (dir+1)/2 with black grid lines at
    /// regular (theta, phi) intervals.
    Directions,
    /// Debevec-style angular map loaded from a Radiance HDR probe.
    Probe {
        pixels: Vec<Spectrum>,
        xres: usize,
        yres: usize,
    },
}

impl Skylight {
    pub fn probe(path: &Path) -> Result<Skylight> {
        let file = File::open(path)
            .map_err(|e| Error::Scene(format!("cannot open probe {}: {e}", path.display())))?;
        let decoder = HdrDecoder::new(BufReader::new(file))?;
        let meta = decoder.metadata();
        let (xres, yres) = (meta.width as usize, meta.height as usize);
        let pixels = decoder
            .read_image_hdr()?
            .into_iter()
            .map(|px| Spectrum::new(px.0[0], px.0[1], px.0[2]))
            .collect();
        info!("loaded probe {} ({}x{})", path.display(), xres, yres);
        Ok(Skylight::Probe { pixels, xres, yres })
    }

    /// Radiance arriving from the given unit direction.
    pub fn sample(&self, dir: Vec3) -> Spectrum {
        match self {
            Skylight::Solid(r) => *r,
            Skylight::Cosine(r) => {
                let c = dir.y.max(0.0);
                *r * (c * c * c)
            }
            Skylight::Directions => {
                let theta = dir.y.clamp(-1.0, 1.0).acos();
                let phi = dir.z.atan2(dir.x) + PI;
                let on_line = |angle: f32| {
                    let frac = angle / GRID_STEP;
                    (frac - frac.round()).abs() * GRID_STEP < GRID_HALF_WIDTH
                };
                if on_line(theta) || on_line(phi) {
                    Spectrum::ZERO
                } else {
                    (dir + Vec3::ONE) / 2.0
                }
            }
            Skylight::Probe { pixels, xres, yres } => {
                // Angular map: (u, v) = (dx r, -dy r) with
                // r = (1/pi) acos(dz) / sqrt(dx^2 + dy^2).
                let d2 = dir.x * dir.x + dir.y * dir.y;
                let (u, v) = if d2 > 0.0 {
                    let r = (1.0 / PI) * dir.z.clamp(-1.0, 1.0).acos() / d2.sqrt();
                    (dir.x * r, -dir.y * r)
                } else {
                    // Looking straight along +-z maps to the probe center.
                    (0.0, 0.0)
                };
                let x = ((*xres as f32 * (u + 1.0) / 2.0) as isize)
                    .clamp(0, *xres as isize - 1) as usize;
                let y = ((*yres as f32 * (v + 1.0) / 2.0) as isize)
                    .clamp(0, *yres as isize - 1) as usize;
                pixels[x + y * xres]
            }
        }
    }
}
