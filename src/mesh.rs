use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use glam::Vec3;
use log::info;

use crate::bvh::Bvh;
use crate::error::{Error, Result};
use crate::math::{Aabb, Ray};
use crate::shape::LocalHit;

/// Acceptance floor for rays that start on the mesh itself. A mesh is not
/// convex, so re-hits are legitimate; only the immediate neighborhood of
/// the origin is suppressed.
const SELF_HIT_EPS: f32 = 1e-4;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NormalMode {
    Flat,
    Smooth,
}

/// Indexed triangle mesh with a face BVH built at load time.
pub struct TriangleMesh {
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
    /// Per-vertex normals; empty unless smooth shading was requested.
    normals: Vec<Vec3>,
    mode: NormalMode,
    bvh: Bvh,
    bbox: Aabb,
}

/// Configures one-shot mesh post-processing before the BVH is built:
/// optional floor alignment, optional uniform height scaling and the
/// shading-normal mode.
pub struct MeshBuilder {
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
    smooth: bool,
    floor: Option<f32>,
    height: Option<f32>,
}

impl MeshBuilder {
    pub fn new(vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            smooth: false,
            floor: None,
            height: None,
        }
    }

    /// Load an ASCII PLY file: `element vertex`/`element face` counts from
    /// the header, `x y z` per vertex line, `3 a b c` per face line.
    pub fn load_ply(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Scene(format!("cannot open mesh {}: {e}", path.display())))?;
        let mut lines = BufReader::new(file).lines();

        let mut next_line = || -> Result<String> {
            lines
                .next()
                .ok_or_else(|| Error::Scene(format!("{}: unexpected end of file", path.display())))?
                .map_err(Error::Io)
        };

        if next_line()?.trim() != "ply" {
            return Err(Error::Scene(format!("{}: not a ply file", path.display())));
        }

        let mut vertex_count = 0usize;
        let mut face_count = 0usize;
        loop {
            let line = next_line()?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                ["end_header"] => break,
                ["format", kind, ..] if *kind != "ascii" => {
                    return Err(Error::Scene(format!(
                        "{}: only ascii ply is supported",
                        path.display()
                    )));
                }
                ["element", "vertex", n] => {
                    vertex_count = n
                        .parse()
                        .map_err(|_| Error::Scene(format!("{}: bad vertex count", path.display())))?;
                }
                ["element", _, n] => {
                    face_count = n
                        .parse()
                        .map_err(|_| Error::Scene(format!("{}: bad face count", path.display())))?;
                }
                _ => {}
            }
        }

        let mut vertices = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            let line = next_line()?;
            let mut it = line.split_whitespace();
            let mut coord = [0.0f32; 3];
            for c in &mut coord {
                *c = it
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| Error::Scene(format!("{}: bad vertex line", path.display())))?;
            }
            vertices.push(Vec3::from_array(coord));
        }

        let mut indices = Vec::with_capacity(face_count * 3);
        for _ in 0..face_count {
            let line = next_line()?;
            let mut it = line.split_whitespace();
            let arity: usize = it
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| Error::Scene(format!("{}: bad face line", path.display())))?;
            if arity != 3 {
                return Err(Error::Scene(format!(
                    "{}: only triangle faces are supported",
                    path.display()
                )));
            }
            for _ in 0..3 {
                let i: u32 = it
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| Error::Scene(format!("{}: bad face index", path.display())))?;
                indices.push(i);
            }
        }

        info!(
            "loaded {}: {} vertices, {} faces",
            path.display(),
            vertex_count,
            face_count
        );
        Ok(Self::new(vertices, indices))
    }

    pub fn smooth(mut self, on: bool) -> Self {
        self.smooth = on;
        self
    }

    /// Translate so the mesh rests on the plane `y = floor_y`.
    pub fn floor(mut self, floor_y: f32) -> Self {
        self.floor = Some(floor_y);
        self
    }

    /// Uniformly scale so the mesh height equals `target`.
    pub fn height(mut self, target: f32) -> Self {
        self.height = Some(target);
        self
    }

    pub fn build(mut self) -> Result<TriangleMesh> {
        if self.indices.len() % 3 != 0 {
            return Err(Error::Scene("mesh index count is not a multiple of 3".into()));
        }
        if let Some(&bad) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.vertices.len())
        {
            return Err(Error::Scene(format!("mesh face references vertex {bad}")));
        }

        let mut bbox = Aabb::empty();
        for &v in &self.vertices {
            bbox.extend(v);
        }

        if let Some(target) = self.height {
            let h = bbox.dim().y;
            if h > 0.0 {
                let s = target / h;
                for v in &mut self.vertices {
                    *v *= s;
                }
                bbox.min *= s;
                bbox.max *= s;
            }
        }
        if let Some(floor_y) = self.floor {
            let shift = Vec3::new(0.0, floor_y - bbox.min.y, 0.0);
            for v in &mut self.vertices {
                *v += shift;
            }
            bbox.min += shift;
            bbox.max += shift;
        }

        let normals = if self.smooth {
            smooth_normals(&self.vertices, &self.indices)
        } else {
            Vec::new()
        };
        let bvh = Bvh::build(&self.vertices, &self.indices);

        Ok(TriangleMesh {
            vertices: self.vertices,
            indices: self.indices,
            normals,
            mode: if self.smooth {
                NormalMode::Smooth
            } else {
                NormalMode::Flat
            },
            bvh,
            bbox,
        })
    }
}

/// Angle-weighted per-vertex normals: each incident face contributes its
/// normal weighted by the corner angle at the vertex.
fn smooth_normals(vertices: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; vertices.len()];
    for face in indices.chunks_exact(3) {
        let v = [
            vertices[face[0] as usize],
            vertices[face[1] as usize],
            vertices[face[2] as usize],
        ];
        let face_n = (v[1] - v[0]).cross(v[2] - v[0]).normalize_or_zero();
        for k in 0..3 {
            let e1 = (v[(k + 1) % 3] - v[k]).normalize_or_zero();
            let e2 = (v[(k + 2) % 3] - v[k]).normalize_or_zero();
            let angle = e1.dot(e2).clamp(-1.0, 1.0).acos();
            normals[face[k] as usize] += angle * face_n;
        }
    }
    for n in &mut normals {
        *n = n.normalize_or_zero();
    }
    normals
}

impl TriangleMesh {
    pub fn bbox(&self) -> Aabb {
        self.bbox
    }

    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn intersect(&self, ray: &mut Ray, hit: &mut LocalHit, self_hit: bool) -> bool {
        let t_floor = if self_hit { SELF_HIT_EPS } else { ray.t_min };
        match self.bvh.intersect(&self.vertices, &self.indices, ray, t_floor) {
            Some(face_hit) => {
                hit.p = ray.at(ray.t_max);
                hit.n = self.shading_normal(face_hit.face, face_hit.u, face_hit.v);
                true
            }
            None => false,
        }
    }

    fn shading_normal(&self, face: u32, u: f32, v: f32) -> Vec3 {
        let i0 = self.indices[(face * 3) as usize] as usize;
        let i1 = self.indices[(face * 3 + 1) as usize] as usize;
        let i2 = self.indices[(face * 3 + 2) as usize] as usize;
        match self.mode {
            NormalMode::Flat => {
                let e1 = self.vertices[i1] - self.vertices[i0];
                let e2 = self.vertices[i2] - self.vertices[i0];
                e1.cross(e2).normalize()
            }
            NormalMode::Smooth => {
                let n = (1.0 - u - v) * self.normals[i0]
                    + u * self.normals[i1]
                    + v * self.normals[i2];
                n.normalize()
            }
        }
    }
}
