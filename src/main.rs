use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use parking_lot::Mutex;
use rand::seq::SliceRandom;

use pathlight::job::{tile_blocks, Job};
use pathlight::loader::load_scene;
use pathlight::sampler::SamplerKind;

#[derive(Parser)]
#[command(name = "pathlight")]
#[command(version, about = "Offline Monte-Carlo path tracer", long_about = None)]
struct Cli {
    /// Input scene description
    #[arg(value_name = "SCENE")]
    scene: PathBuf,

    /// Image resolution
    #[arg(short = 'r', long, num_args = 2, value_names = ["W", "H"],
          default_values_t = [256, 256])]
    resolution: Vec<usize>,

    /// Samples per pixel
    #[arg(short = 's', long, default_value_t = 16)]
    spp: usize,

    /// Output basename; writes PATH.png, PATH.hdr and PATH.float
    #[arg(short = 'o', long, default_value = "out")]
    output: PathBuf,

    /// Worker thread count (defaults to the available parallelism)
    #[arg(short = 'm', long)]
    threads: Option<usize>,

    /// Block edge length in pixels
    #[arg(short = 'b', long, default_value_t = 32)]
    block: usize,

    /// Render only the block at the given block coordinates
    #[arg(short = 'S', long, num_args = 2, value_names = ["X", "Y"])]
    single: Option<Vec<usize>>,

    /// Pixel sampler
    #[arg(long, default_value = "random")]
    sampler: String,

    /// Per-pixel debug trace
    #[arg(short = 'd', long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    logger.filter_level(if cli.debug {
        log::LevelFilter::Trace
    } else {
        log::LevelFilter::Info
    });
    logger.init();

    let sampler: SamplerKind = cli.sampler.parse()?;
    let (xres, yres) = (cli.resolution[0], cli.resolution[1]);
    if xres == 0 || yres == 0 || cli.block == 0 || cli.spp == 0 {
        bail!("resolution, block size and sample count must be positive");
    }

    let threads = cli.threads.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1)
    });

    let scene = Arc::new(
        load_scene(&cli.scene)
            .with_context(|| format!("loading scene {}", cli.scene.display()))?,
    );

    let mut job = Job::new(threads, scene, xres, yres);

    // Preview callback: rewrite the HDR output from the partially merged
    // film, throttled to one write every couple of seconds.
    let preview_path = cli.output.with_extension("hdr");
    let last_preview = Mutex::new(Instant::now() - Duration::from_secs(60));
    job.set_callback(Box::new(move |block, film| {
        debug!(
            "block ({}, {}) {}x{} done",
            block.desc.xofs, block.desc.yofs, block.desc.xres, block.desc.yres
        );
        let mut last = last_preview.lock();
        if last.elapsed() >= Duration::from_secs(2) {
            *last = Instant::now();
            if let Err(e) = film.save_hdr(&preview_path) {
                warn!("preview write failed: {e}");
            }
        }
    }));

    let mut blocks = tile_blocks(xres, yres, cli.block, cli.spp, sampler);
    if let Some(single) = &cli.single {
        let (bx, by) = (single[0] * cli.block, single[1] * cli.block);
        blocks.retain(|b| b.xofs == bx && b.yofs == by);
        if blocks.is_empty() {
            bail!("block ({}, {}) is outside the image", single[0], single[1]);
        }
    } else {
        // Decorrelate visual progress; the result does not depend on order.
        blocks.shuffle(&mut rand::thread_rng());
    }

    info!(
        "rendering {}x{} at {} spp, {} blocks on {} threads",
        xres,
        yres,
        cli.spp,
        blocks.len(),
        threads
    );
    let started = Instant::now();
    for desc in &blocks {
        job.add_task(*desc);
    }
    let (mut film, stats) = job.finish()?;
    info!("render finished in {:.2?}", started.elapsed());
    if stats.anomalies > 0 {
        warn!("render produced {} anomalous estimates", stats.anomalies);
    }

    film.save_png(&cli.output.with_extension("png"))?;
    film.save_hdr(&cli.output.with_extension("hdr"))?;
    film.save_float(&cli.output.with_extension("float"))?;
    info!("wrote {}.png/.hdr/.float", cli.output.display());
    Ok(())
}
