use glam::Vec3;

use pathlight::math::Ray;
use pathlight::transform::{tangent_from_world, Transform};

fn assert_close(a: Vec3, b: Vec3, eps: f32) {
    assert!(
        (a - b).length() < eps,
        "expected {b:?}, got {a:?} (eps {eps})"
    );
}

#[test]
fn ray_transform_round_trip() {
    let t = Transform::translate(Vec3::new(1.0, -2.0, 3.0))
        * Transform::rotate(37.0, Vec3::new(0.3, 1.0, -0.2))
        * Transform::scale(Vec3::new(2.0, 0.5, 1.5));

    let ray = Ray::new(
        Vec3::new(0.4, -1.2, 2.5),
        Vec3::new(0.6, -0.3, 0.742).normalize(),
    );

    let back_d = t.inverse().vector(t.vector(ray.d));
    assert_close(back_d, ray.d, 1e-5);

    let back_o = t.inverse().point(t.point(ray.o));
    assert_close(back_o, ray.o, 1e-5);
}

#[test]
fn ray_transform_preserves_interval() {
    let t = Transform::scale(Vec3::splat(3.0));
    let mut ray = Ray::new(Vec3::ZERO, Vec3::Z);
    ray.t_min = 0.25;
    ray.t_max = 7.5;
    let moved = t.ray(&ray);
    assert_eq!(moved.t_min, 0.25);
    assert_eq!(moved.t_max, 7.5);
}

#[test]
fn composition_applies_right_to_left() {
    let a = Transform::translate(Vec3::new(5.0, 0.0, 0.0));
    let b = Transform::scale(Vec3::splat(2.0));
    let p = Vec3::new(1.0, 1.0, 1.0);
    assert_close((a * b).point(p), a.point(b.point(p)), 1e-6);
}

#[test]
fn inverse_swaps_matrices() {
    let t = Transform::translate(Vec3::new(1.0, 2.0, 3.0));
    let p = Vec3::new(4.0, 5.0, 6.0);
    assert_close(t.inverse().point(t.point(p)), p, 1e-6);
    assert_close(t.inverse().inverse().point(p), t.point(p), 1e-6);
}

#[test]
fn normal_transform_uses_inverse_transpose() {
    // Squash along y: the plane normal must stay perpendicular to the
    // transformed surface, which a plain vector transform would not give.
    let t = Transform::scale(Vec3::new(1.0, 0.25, 1.0));
    let surface_dir = t.vector(Vec3::new(1.0, 1.0, 0.0).normalize());
    let n = t.normal(Vec3::new(-1.0, 1.0, 0.0).normalize()).normalize();
    assert!(n.dot(surface_dir).abs() < 1e-6);
}

#[test]
fn tangent_frame_is_orthonormal() {
    let normals = [
        Vec3::X,
        Vec3::Y,
        Vec3::Z,
        -Vec3::Z,
        Vec3::new(0.3, -0.6, 0.742).normalize(),
        Vec3::new(-0.9, 0.1, 0.05).normalize(),
    ];
    for n in normals {
        let frame = tangent_from_world(n);

        // The rows are the world-space basis vectors; read them back by
        // applying the inverse to the tangent-space axes.
        let s = frame.inverse().vector(Vec3::X);
        let t = frame.inverse().vector(Vec3::Y);
        let z = frame.inverse().vector(Vec3::Z);

        assert!((s.length() - 1.0).abs() < 1e-5);
        assert!((t.length() - 1.0).abs() < 1e-5);
        assert!((z.length() - 1.0).abs() < 1e-5);
        assert!(s.dot(t).abs() < 1e-5);
        assert!(s.dot(z).abs() < 1e-5);
        assert!(t.dot(z).abs() < 1e-5);

        // Third row is the normal itself.
        assert_close(z, n, 1e-5);
        assert_close(frame.vector(n), Vec3::Z, 1e-5);
    }
}

#[test]
fn look_at_is_world_from_camera() {
    let eye = Vec3::new(0.0, 0.0, 3.0);
    let t = Transform::look_at(eye, Vec3::ZERO, Vec3::Y);

    // The camera origin maps to the eye point and the camera's -z axis
    // points at the target.
    assert_close(t.point(Vec3::ZERO), eye, 1e-5);
    let forward = t.vector(-Vec3::Z).normalize();
    assert_close(forward, Vec3::new(0.0, 0.0, -1.0), 1e-5);
}
