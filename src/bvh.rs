use glam::Vec3;

use crate::math::{max_axis, Aabb, Ray};

/// Faces per leaf before splitting stops.
const LEAF_FACES: usize = 32;

/// Möller–Trumbore ray/triangle test. Returns `(t, u, v)` for a hit with
/// `t` strictly inside the ray interval. With `cull_backface` the whole
/// back-facing half-space is rejected; otherwise only near-degenerate
/// triangles are.
pub fn intersect_triangle(
    ray: &Ray,
    a: Vec3,
    b: Vec3,
    c: Vec3,
    cull_backface: bool,
) -> Option<(f32, f32, f32)> {
    let e1 = b - a;
    let e2 = c - a;
    let pvec = ray.d.cross(e2);
    let det = e1.dot(pvec);

    if cull_backface {
        if det <= 1e-6 {
            return None;
        }
    } else if det.abs() < 1e-9 {
        return None;
    }
    let inv_det = 1.0 / det;

    let tvec = ray.o - a;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(e1);
    let v = ray.d.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(qvec) * inv_det;
    if t <= ray.t_min || t >= ray.t_max {
        return None;
    }

    Some((t, u, v))
}

struct Node {
    bbox: Aabb,
    faces: Vec<u32>,
    children: Option<(u32, u32)>,
}

/// Closest face found by a traversal, with its barycentric coordinates.
#[derive(Clone, Copy, Debug)]
pub struct FaceHit {
    pub face: u32,
    pub u: f32,
    pub v: f32,
}

/// Bounding-volume hierarchy over the faces of one triangle mesh.
///
/// Split rule: midpoint of the largest bounding-box extent; a face goes
/// left if any vertex lies below the threshold and right if any vertex lies
/// at or above it, so spanning faces are duplicated into both children. A
/// split that leaves a child empty or identical to its parent is abandoned
/// and the node stays a leaf.
pub struct Bvh {
    nodes: Vec<Node>,
}

fn face_bbox(vertices: &[Vec3], indices: &[u32], face: u32) -> Aabb {
    let mut bbox = Aabb::empty();
    for k in 0..3 {
        bbox.extend(vertices[indices[(face * 3 + k) as usize] as usize]);
    }
    bbox
}

fn faces_bbox(vertices: &[Vec3], indices: &[u32], faces: &[u32]) -> Aabb {
    let mut bbox = Aabb::empty();
    for &f in faces {
        bbox = bbox.union(&face_bbox(vertices, indices, f));
    }
    bbox
}

impl Bvh {
    pub fn build(vertices: &[Vec3], indices: &[u32]) -> Bvh {
        let face_count = (indices.len() / 3) as u32;
        let all: Vec<u32> = (0..face_count).collect();
        let root = Node {
            bbox: faces_bbox(vertices, indices, &all),
            faces: all,
            children: None,
        };

        let mut nodes = vec![root];
        let mut stack = vec![0usize];
        while let Some(ni) = stack.pop() {
            if nodes[ni].faces.len() <= LEAF_FACES {
                continue;
            }

            let bbox = nodes[ni].bbox;
            let axis = max_axis(bbox.dim());
            let threshold = (bbox.min[axis] + bbox.max[axis]) * 0.5;

            let faces = std::mem::take(&mut nodes[ni].faces);
            let mut left = Vec::new();
            let mut right = Vec::new();
            for &f in &faces {
                let mut go_left = false;
                let mut go_right = false;
                for k in 0..3 {
                    let v = vertices[indices[(f * 3 + k) as usize] as usize][axis];
                    if v < threshold {
                        go_left = true;
                    } else {
                        go_right = true;
                    }
                }
                if go_left {
                    left.push(f);
                }
                if go_right {
                    right.push(f);
                }
            }

            // Degenerate split: keep the node as a leaf.
            if left.is_empty()
                || right.is_empty()
                || left.len() == faces.len()
                || right.len() == faces.len()
            {
                nodes[ni].faces = faces;
                continue;
            }

            let left_node = Node {
                bbox: faces_bbox(vertices, indices, &left),
                faces: left,
                children: None,
            };
            let right_node = Node {
                bbox: faces_bbox(vertices, indices, &right),
                faces: right,
                children: None,
            };
            let li = nodes.len() as u32;
            let ri = li + 1;
            nodes.push(left_node);
            nodes.push(right_node);
            nodes[ni].children = Some((li, ri));
            stack.push(li as usize);
            stack.push(ri as usize);
        }

        Bvh { nodes }
    }

    /// Closest hit against the hierarchy. `t_floor` raises the lower end of
    /// the acceptance interval (used for self-intersection suppression on
    /// meshes). Narrows `ray.t_max` on a hit.
    pub fn intersect(
        &self,
        vertices: &[Vec3],
        indices: &[u32],
        ray: &mut Ray,
        t_floor: f32,
    ) -> Option<FaceHit> {
        let mut local = *ray;
        local.t_min = local.t_min.max(t_floor);

        let mut hit = None;
        let mut stack = vec![0u32];
        while let Some(ni) = stack.pop() {
            let node = &self.nodes[ni as usize];
            if !node.bbox.intersect(&local) {
                continue;
            }
            if let Some((li, ri)) = node.children {
                stack.push(ri);
                stack.push(li);
            } else {
                for &f in &node.faces {
                    let a = vertices[indices[(f * 3) as usize] as usize];
                    let b = vertices[indices[(f * 3 + 1) as usize] as usize];
                    let c = vertices[indices[(f * 3 + 2) as usize] as usize];
                    if let Some((t, u, v)) = intersect_triangle(&local, a, b, c, false) {
                        local.t_max = t;
                        hit = Some(FaceHit { face: f, u, v });
                    }
                }
            }
        }

        if hit.is_some() {
            ray.t_max = local.t_max;
        }
        hit
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
