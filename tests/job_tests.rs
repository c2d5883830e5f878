use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glam::Vec3;

use pathlight::camera::Camera;
use pathlight::error::Error;
use pathlight::job::{tile_blocks, Job};
use pathlight::math::Spectrum;
use pathlight::primitive::Aggregate;
use pathlight::sampler::SamplerKind;
use pathlight::scene::Scene;
use pathlight::skylight::Skylight;
use pathlight::transform::Transform;

fn sky_scene() -> Arc<Scene> {
    let mut camera = Camera::pinhole(60.0);
    camera.set_xform(Transform::translate(Vec3::new(0.0, 0.0, 3.0)));
    Arc::new(Scene::new(
        Aggregate::new(),
        camera,
        Skylight::Solid(Spectrum::splat(0.25)),
    ))
}

#[test]
fn tiling_covers_the_image_exactly_once() {
    let blocks = tile_blocks(100, 70, 32, 4, SamplerKind::Random);
    assert_eq!(blocks.len(), 4 * 3);

    let mut covered = vec![0u8; 100 * 70];
    for b in &blocks {
        assert!(b.xres <= 32 && b.yres <= 32);
        assert!(b.xofs + b.xres <= 100);
        assert!(b.yofs + b.yres <= 70);
        for y in b.yofs..b.yofs + b.yres {
            for x in b.xofs..b.xofs + b.xres {
                covered[x + y * 100] += 1;
            }
        }
    }
    assert!(covered.iter().all(|&c| c == 1), "blocks overlap or miss");
}

#[test]
fn tiling_clips_border_blocks() {
    let blocks = tile_blocks(100, 70, 32, 4, SamplerKind::Random);
    let right = blocks.iter().find(|b| b.xofs == 96).unwrap();
    assert_eq!(right.xres, 4);
    let bottom = blocks.iter().find(|b| b.yofs == 64).unwrap();
    assert_eq!(bottom.yres, 6);
}

#[test]
fn callback_fires_once_per_block() {
    let scene = sky_scene();
    let mut job = Job::new(3, scene, 32, 32);

    let calls = Arc::new(AtomicUsize::new(0));
    let calls_cb = Arc::clone(&calls);
    job.set_callback(Box::new(move |block, master| {
        assert_eq!(block.desc.xres * block.desc.yres, 8 * 8);
        // The snapshot reflects at least this block's merged samples.
        assert_eq!(master.xres, 32);
        calls_cb.fetch_add(1, Ordering::SeqCst);
    }));

    let blocks = tile_blocks(32, 32, 8, 2, SamplerKind::Random);
    let count = blocks.len();
    for desc in blocks {
        job.add_task(desc);
    }
    let (film, stats) = job.finish().unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), count);
    assert_eq!(stats.anomalies, 0);

    // Every pixel received exactly its samples-per-pixel weight.
    for y in 0..32 {
        for x in 0..32 {
            assert_eq!(film.pixel(x, y).weight, 2.0);
        }
    }
}

#[test]
fn stratified_spp_mismatch_fails_the_job() {
    let scene = sky_scene();
    let job = Job::new(2, scene, 16, 16);
    for desc in tile_blocks(16, 16, 8, 3, SamplerKind::Stratified) {
        job.add_task(desc);
    }
    let err = job.finish().err().expect("job should fail");
    match err {
        Error::Config(msg) => assert!(msg.contains("square")),
        other => panic!("expected a config error, got {other}"),
    }
}

#[test]
fn stratified_blocks_render_like_random_ones() {
    let scene = sky_scene();
    let job = Job::new(2, scene, 16, 16);
    for desc in tile_blocks(16, 16, 8, 16, SamplerKind::Stratified) {
        job.add_task(desc);
    }
    let (film, stats) = job.finish().unwrap();
    assert_eq!(stats.anomalies, 0);
    for y in 0..16 {
        for x in 0..16 {
            let v = film.pixel(x, y).normalized();
            assert!((v.x - 0.25).abs() < 0.1);
        }
    }
}

#[test]
fn finish_with_no_tasks_returns_an_empty_film() {
    let scene = sky_scene();
    let job = Job::new(4, scene, 8, 8);
    let (film, stats) = job.finish().unwrap();
    assert_eq!(stats.anomalies, 0);
    for y in 0..8 {
        for x in 0..8 {
            assert_eq!(film.pixel(x, y).weight, 0.0);
        }
    }
}
