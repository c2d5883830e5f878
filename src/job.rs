use std::sync::Arc;
use std::thread::JoinHandle;

use log::{trace, warn};
use parking_lot::{Condvar, Mutex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::film::Film;
use crate::integrator::PathIntegrator;
use crate::math::spectrum_is_valid;
use crate::sampler::{SampleGenerator, SamplerKind, SAMPLE_DIMENSIONS};
use crate::scene::Scene;

/// Seed for the per-pixel seed table. Fixed so that a render is a pure
/// function of the scene and the job parameters, independent of thread
/// count and block order.
const SEED_TABLE_SEED: u64 = 14217;

/// One tile of the image to render: offset and extent in pixels plus the
/// sampling parameters.
#[derive(Clone, Copy, Debug)]
pub struct BlockDesc {
    pub xofs: usize,
    pub yofs: usize,
    pub xres: usize,
    pub yres: usize,
    pub spp: usize,
    pub sampler: SamplerKind,
}

/// A rendered block: its descriptor, its partial film and the number of
/// anomalous (NaN or negative) radiance estimates it produced.
pub struct Block {
    pub desc: BlockDesc,
    pub film: Film,
    pub anomalies: u64,
}

/// Aggregate render diagnostics returned by `Job::finish`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderStats {
    pub anomalies: u64,
}

/// Invoked after each completed block, outside the job lock, with the
/// block and a snapshot of the master film taken just after the merge.
pub type BlockCallback = Box<dyn Fn(&Block, &Film) + Send + Sync>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum WorkerState {
    Idle,
    InputReady,
    Working,
    Quit,
}

struct Slot {
    state: WorkerState,
    task: Option<BlockDesc>,
}

struct JobState {
    slots: Vec<Slot>,
    film: Film,
    anomalies: u64,
    failure: Option<Error>,
}

struct Shared {
    scene: Arc<Scene>,
    seeds: Vec<u64>,
    xres: usize,
    yres: usize,
    /// The one mutex of the job: worker state transitions and film merges
    /// are all serialized under it.
    state: Mutex<JobState>,
    /// Producer side: signaled whenever a worker returns to IDLE.
    prod_cv: Condvar,
    /// Consumer side, one per worker: signaled when its slot changes to
    /// INPUT_READY or QUIT.
    worker_cvs: Vec<Condvar>,
    callback: Mutex<Option<BlockCallback>>,
}

/// Block-scheduled render executor. Each worker is an OS thread cycling
/// IDLE -> INPUT_READY -> WORKING -> IDLE until `finish` flips it to QUIT.
pub struct Job {
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
}

impl Job {
    pub fn new(threads: usize, scene: Arc<Scene>, xres: usize, yres: usize) -> Job {
        let mut table_rng = StdRng::seed_from_u64(SEED_TABLE_SEED);
        let seeds = (0..xres * yres).map(|_| table_rng.gen()).collect();

        let slots = (0..threads)
            .map(|_| Slot {
                state: WorkerState::Idle,
                task: None,
            })
            .collect();

        let shared = Arc::new(Shared {
            scene,
            seeds,
            xres,
            yres,
            state: Mutex::new(JobState {
                slots,
                film: Film::new(xres, yres),
                anomalies: 0,
                failure: None,
            }),
            prod_cv: Condvar::new(),
            worker_cvs: (0..threads).map(|_| Condvar::new()).collect(),
            callback: Mutex::new(None),
        });

        let handles = (0..threads)
            .map(|i| {
                let shared = Arc::clone(&shared);
                std::thread::Builder::new()
                    .name(format!("render-{i}"))
                    .spawn(move || worker_loop(&shared, i))
                    .unwrap()
            })
            .collect();

        Job { shared, handles }
    }

    /// Register the per-block completion callback. Must be called before
    /// the first `add_task`.
    pub fn set_callback(&mut self, cb: BlockCallback) {
        *self.shared.callback.lock() = Some(cb);
    }

    /// Hand a block to the first idle worker, blocking until one frees up.
    pub fn add_task(&self, desc: BlockDesc) {
        let mut st = self.shared.state.lock();
        loop {
            if let Some(i) = st
                .slots
                .iter()
                .position(|s| s.state == WorkerState::Idle)
            {
                st.slots[i].task = Some(desc);
                st.slots[i].state = WorkerState::InputReady;
                drop(st);
                self.shared.worker_cvs[i].notify_all();
                return;
            }
            self.shared.prod_cv.wait(&mut st);
        }
    }

    /// Drain all outstanding blocks, stop the workers and return the
    /// finished film together with the render diagnostics. Surfaces the
    /// first block failure, if any.
    pub fn finish(mut self) -> Result<(Film, RenderStats)> {
        {
            let mut st = self.shared.state.lock();
            while st.slots.iter().any(|s| s.state != WorkerState::Idle) {
                self.shared.prod_cv.wait(&mut st);
            }
            for slot in &mut st.slots {
                slot.state = WorkerState::Quit;
            }
        }
        for cv in &self.shared.worker_cvs {
            cv.notify_all();
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }

        let mut st = self.shared.state.lock();
        if let Some(failure) = st.failure.take() {
            return Err(failure);
        }
        let stats = RenderStats {
            anomalies: st.anomalies,
        };
        if stats.anomalies > 0 {
            warn!("{} anomalous radiance estimates", stats.anomalies);
        }
        let film = std::mem::replace(&mut st.film, Film::new(0, 0));
        Ok((film, stats))
    }
}

fn worker_loop(shared: &Shared, index: usize) {
    loop {
        let mut st = shared.state.lock();
        while st.slots[index].state != WorkerState::InputReady
            && st.slots[index].state != WorkerState::Quit
        {
            shared.worker_cvs[index].wait(&mut st);
        }
        if st.slots[index].state == WorkerState::Quit {
            return;
        }
        st.slots[index].state = WorkerState::Working;
        let desc = st.slots[index].task.take().unwrap();
        drop(st);

        // No lock held while rendering.
        let result = render_block(shared, desc);

        let has_callback = shared.callback.lock().is_some();
        let mut st = shared.state.lock();
        let completed = match result {
            Ok(block) => {
                st.film.merge(&block.film, desc.xofs, desc.yofs);
                st.anomalies += block.anomalies;
                let snapshot = has_callback.then(|| st.film.clone());
                Some((block, snapshot))
            }
            Err(e) => {
                // No panic may escape a worker; park the failure for
                // finish() to observe.
                if st.failure.is_none() {
                    st.failure = Some(e);
                }
                None
            }
        };
        st.slots[index].state = WorkerState::Idle;
        drop(st);
        shared.prod_cv.notify_all();

        // The callback runs outside the job lock so it can do I/O.
        if let Some((block, Some(snapshot))) = completed {
            if let Some(cb) = shared.callback.lock().as_ref() {
                cb(&block, &snapshot);
            }
        }
    }
}

fn render_block(shared: &Shared, desc: BlockDesc) -> Result<Block> {
    let mut film = Film::new(desc.xres, desc.yres);
    let mut sampler = SampleGenerator::new(desc.sampler, SAMPLE_DIMENSIONS, desc.spp)?;
    let integrator = PathIntegrator::new();
    let camera = &shared.scene.camera;
    let mut anomalies = 0u64;

    for ly in 0..desc.yres {
        for lx in 0..desc.xres {
            let gx = desc.xofs + lx;
            let gy = desc.yofs + ly;
            // Every pixel's sample stream is seeded from the job-wide
            // table, so the image does not depend on which worker renders
            // which block.
            let mut generator = StdRng::seed_from_u64(shared.seeds[gx + gy * shared.xres]);
            sampler.generate(&mut generator);

            for (s, sample) in sampler.samples.iter_mut().enumerate() {
                let jitter = sample.next_2d();
                let flx = (lx as f32 + jitter.x) / desc.xres as f32;
                let fly = (ly as f32 + jitter.y) / desc.yres as f32;
                let fgx = (gx as f32 + jitter.x) / shared.xres as f32;
                let fgy = (gy as f32 + jitter.y) / shared.yres as f32;

                let lens = sample.next_2d();
                let ray = camera.generate_ray(fgx, fgy, lens.x, lens.y);
                let l = integrator.li(ray, &shared.scene, sample);
                trace!("{gx},{gy}:{s}: L {l:?}");

                if !spectrum_is_valid(l) {
                    anomalies += 1;
                }
                film.add_sample(flx, fly, l);
            }
        }
    }

    Ok(Block {
        desc,
        film,
        anomalies,
    })
}

/// Tile the image into blocks of at most `block_size` on a side, clipping
/// the border blocks to the image bounds.
pub fn tile_blocks(
    xres: usize,
    yres: usize,
    block_size: usize,
    spp: usize,
    sampler: SamplerKind,
) -> Vec<BlockDesc> {
    let mut blocks = Vec::new();
    let mut yofs = 0;
    while yofs < yres {
        let h = block_size.min(yres - yofs);
        let mut xofs = 0;
        while xofs < xres {
            let w = block_size.min(xres - xofs);
            blocks.push(BlockDesc {
                xofs,
                yofs,
                xres: w,
                yres: h,
                spp,
                sampler,
            });
            xofs += block_size;
        }
        yofs += block_size;
    }
    blocks
}
