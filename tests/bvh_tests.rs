use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use pathlight::bvh::{intersect_triangle, Bvh};
use pathlight::math::Ray;
use pathlight::mesh::MeshBuilder;
use pathlight::shape::{LocalHit, Shape};

/// A soup of small random triangles inside the unit-ish cube.
fn random_triangles(count: usize, seed: u64) -> (Vec<Vec3>, Vec<u32>) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for _ in 0..count {
        let center = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        for _ in 0..3 {
            let jitter = Vec3::new(
                rng.gen_range(-0.2..0.2),
                rng.gen_range(-0.2..0.2),
                rng.gen_range(-0.2..0.2),
            );
            indices.push(vertices.len() as u32);
            vertices.push(center + jitter);
        }
    }
    (vertices, indices)
}

fn brute_force(vertices: &[Vec3], indices: &[u32], ray: &Ray) -> Option<(u32, f32)> {
    let mut local = *ray;
    let mut best = None;
    for face in 0..(indices.len() / 3) as u32 {
        let a = vertices[indices[(face * 3) as usize] as usize];
        let b = vertices[indices[(face * 3 + 1) as usize] as usize];
        let c = vertices[indices[(face * 3 + 2) as usize] as usize];
        if let Some((t, _, _)) = intersect_triangle(&local, a, b, c, false) {
            local.t_max = t;
            best = Some((face, t));
        }
    }
    best
}

#[test]
fn bvh_matches_brute_force() {
    let (vertices, indices) = random_triangles(300, 42);
    let bvh = Bvh::build(&vertices, &indices);
    assert!(bvh.node_count() > 1);

    let mut rng = SmallRng::seed_from_u64(1234);
    let mut hits = 0;
    for _ in 0..500 {
        let o = Vec3::new(
            rng.gen_range(-2.0..2.0),
            rng.gen_range(-2.0..2.0),
            rng.gen_range(2.0..3.0),
        );
        let d = (Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.5..-0.5),
        ))
        .normalize();
        let ray = Ray::new(o, d);

        let expected = brute_force(&vertices, &indices, &ray);
        let mut bvh_ray = ray;
        let got = bvh
            .intersect(&vertices, &indices, &mut bvh_ray, ray.t_min)
            .map(|h| (h.face, bvh_ray.t_max));

        match (expected, got) {
            (None, None) => {}
            (Some((ef, et)), Some((gf, gt))) => {
                hits += 1;
                assert!((et - gt).abs() < 1e-5, "t mismatch: {et} vs {gt}");
                // Faces may differ only on exact ties.
                if ef != gf {
                    assert!((et - gt).abs() < 1e-5);
                }
            }
            other => panic!("bvh/brute-force disagree: {other:?}"),
        }
    }
    // The ray distribution is aimed at the soup; most should hit.
    assert!(hits > 50, "only {hits} hits, test rays miss the mesh");
}

#[test]
fn bvh_small_mesh_stays_leaf() {
    let (vertices, indices) = random_triangles(10, 7);
    let bvh = Bvh::build(&vertices, &indices);
    assert_eq!(bvh.node_count(), 1);
}

#[test]
fn mesh_floor_and_height_postprocess() {
    let (vertices, indices) = random_triangles(50, 9);
    let mesh = MeshBuilder::new(vertices, indices)
        .height(2.0)
        .floor(-1.0)
        .build()
        .unwrap();
    let bbox = mesh.bbox();
    assert!((bbox.min.y - -1.0).abs() < 1e-4);
    assert!((bbox.dim().y - 2.0).abs() < 1e-4);
}

#[test]
fn mesh_rejects_bad_indices() {
    let vertices = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
    assert!(MeshBuilder::new(vertices.clone(), vec![0, 1, 7]).build().is_err());
    assert!(MeshBuilder::new(vertices, vec![0, 1]).build().is_err());
}

#[test]
fn mesh_shape_intersects_both_sides() {
    // A single face; mesh triangles are not backface-culled.
    let vertices = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
    let mesh = MeshBuilder::new(vertices, vec![0, 1, 2]).build().unwrap();
    let shape = Shape::Mesh(mesh);

    let mut hit = LocalHit::default();
    let mut front = Ray::new(Vec3::new(0.25, 0.25, 1.0), -Vec3::Z);
    assert!(shape.intersect(&mut front, &mut hit, false, false));

    let mut back = Ray::new(Vec3::new(0.25, 0.25, -1.0), Vec3::Z);
    assert!(shape.intersect(&mut back, &mut hit, false, false));
}

#[test]
fn mesh_smooth_normals_on_flat_surface() {
    // Two coplanar triangles: every shading normal is the plane normal,
    // whether flat or angle-weighted smooth.
    let vertices = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    ];
    let indices = vec![0, 1, 2, 0, 2, 3];
    let mesh = MeshBuilder::new(vertices, indices)
        .smooth(true)
        .build()
        .unwrap();

    let mut hit = LocalHit::default();
    let mut ray = Ray::new(Vec3::new(0.6, 0.4, 1.0), -Vec3::Z);
    assert!(Shape::Mesh(mesh).intersect(&mut ray, &mut hit, false, false));
    assert!((hit.n - Vec3::Z).length() < 1e-5);
}

#[test]
fn ply_round_trip() {
    let dir = std::env::temp_dir();
    let path = dir.join("pathlight_test_tetra.ply");
    let ply = "ply\n\
        format ascii 1.0\n\
        comment test tetrahedron\n\
        element vertex 4\n\
        property float x\n\
        property float y\n\
        property float z\n\
        element face 4\n\
        property list uchar int vertex_indices\n\
        end_header\n\
        0 0 0\n\
        1 0 0\n\
        0 1 0\n\
        0 0 1\n\
        3 0 1 2\n\
        3 0 1 3\n\
        3 0 2 3\n\
        3 1 2 3\n";
    std::fs::write(&path, ply).unwrap();

    let mesh = MeshBuilder::load_ply(&path).unwrap().build().unwrap();
    assert_eq!(mesh.face_count(), 4);
    let bbox = mesh.bbox();
    assert_eq!(bbox.min, Vec3::ZERO);
    assert_eq!(bbox.max, Vec3::ONE);

    std::fs::remove_file(&path).ok();
}

#[test]
fn ply_rejects_binary() {
    let dir = std::env::temp_dir();
    let path = dir.join("pathlight_test_binary.ply");
    std::fs::write(&path, "ply\nformat binary_little_endian 1.0\nend_header\n").unwrap();
    assert!(MeshBuilder::load_ply(&path).is_err());
    std::fs::remove_file(&path).ok();
}
