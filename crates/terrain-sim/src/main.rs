/// Headless streaming run: flies a viewer across the terrain and reports what
/// the streaming manager loads, meshes and shows.
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec3;
use log::{info, warn};

use terrain_core::streaming::ViewportProjector;
use terrain_core::{
    ChunkCoord, ChunkRenderer, MaterialId, MeshBuffer, PerspectiveCamera, StreamingManager, TerrainConfig, TickReport,
};

#[derive(Parser, Debug)]
#[command(name = "terrain-sim", about = "Headless terrain streaming simulation")]
struct Args {
    /// TerrainConfig JSON; the built-in preset when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured seed.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(short, long, default_value_t = 60)]
    ticks: u32,

    /// Viewer speed along +X in world units per tick.
    #[arg(long, default_value_t = 40.0)]
    speed: f32,

    /// Viewer height above the zero plane.
    #[arg(long, default_value_t = 80.0)]
    altitude: f32,

    /// Cull chunks against a forward-facing camera.
    #[arg(long)]
    camera: bool,

    /// Sleep between ticks, in milliseconds.
    #[arg(long, default_value_t = 0)]
    frame_ms: u64,

    /// Write every tick report to this JSON file.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    dump_config: bool,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Renderer stand-in that tracks what a scene would hold.
#[derive(Default)]
struct SceneStats {
    meshes: HashMap<ChunkCoord, Arc<MeshBuffer>>,
    visible: HashSet<ChunkCoord>,
    attaches: usize,
    releases: usize,
}

impl SceneStats {
    fn visible_triangles(&self) -> usize {
        self.visible.iter().filter_map(|c| self.meshes.get(c)).map(|m| m.triangle_count()).sum()
    }
}

impl ChunkRenderer for SceneStats {
    fn attach_mesh(&mut self, coord: ChunkCoord, mesh: &Arc<MeshBuffer>, _material: MaterialId) {
        self.meshes.insert(coord, Arc::clone(mesh));
        self.attaches += 1;
    }

    fn set_visible(&mut self, coord: ChunkCoord, visible: bool) {
        if visible {
            self.visible.insert(coord);
        } else {
            self.visible.remove(&coord);
        }
    }

    fn release(&mut self, coord: ChunkCoord) {
        self.meshes.remove(&coord);
        self.visible.remove(&coord);
        self.releases += 1;
    }
}

fn load_config(args: &Args) -> Result<TerrainConfig> {
    let mut config = match &args.config {
        Some(path) => TerrainConfig::from_path(path).with_context(|| format!("loading config {}", path.display()))?,
        None => TerrainConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level.as_str())).init();

    let config = load_config(&args)?;
    if args.dump_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }

    for (i, layer) in config.layers.iter().enumerate() {
        if !layer.method.tiles_seamlessly() {
            warn!("layer {i} uses {:?}; its chunks will show seams", layer.method);
        }
    }
    info!(
        "seed {}, {} layers, chunk edge {}, view distance {}",
        config.seed,
        config.layers.len(),
        config.chunk_edge,
        config.view_distance()
    );
    let mut manager =
        StreamingManager::new(config, SceneStats::default()).context("starting the streaming manager")?;
    info!(
        "{} worker threads over {} layers, {} LODs, radius {} chunks of {} units",
        manager.pipeline().worker_threads(),
        manager.pipeline().layer_count(),
        manager.lods().len(),
        manager.view_radius(),
        manager.chunk_stride()
    );

    let started = Instant::now();
    let mut reports: Vec<TickReport> = Vec::with_capacity(args.ticks as usize);
    for t in 0..args.ticks {
        let viewer = Vec3::new(t as f32 * args.speed, args.altitude, 0.0);
        let camera = PerspectiveCamera::look_at(viewer, viewer + Vec3::X, 1.2, 16.0 / 9.0, 0.5, 10_000.0);
        let view = args.camera.then_some(&camera as &dyn ViewportProjector);
        let report = manager.tick_with_view(viewer, view);

        if t % 10 == 0 {
            info!(
                "tick {:>4} x={:>8.1}: {} resident, {} visible, {} pending, {} visible triangles",
                report.tick,
                viewer.x,
                report.resident,
                report.visible,
                report.pending,
                manager.renderer().visible_triangles()
            );
        }
        reports.push(report);
        if args.frame_ms > 0 {
            std::thread::sleep(Duration::from_millis(args.frame_ms));
        }
    }

    let idle = manager.pipeline().wait_idle(Duration::from_secs(120));
    let stats = manager.renderer();
    info!(
        "{} ticks in {:.2?} (pipeline idle: {idle}): {} chunks resident, {} mesh attaches, {} releases, {} chunks visible",
        args.ticks,
        started.elapsed(),
        manager.resident_count(),
        stats.attaches,
        stats.releases,
        stats.visible.len()
    );

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&reports)?;
        std::fs::write(path, json).with_context(|| format!("writing report {}", path.display()))?;
        info!("wrote {} tick reports to {}", reports.len(), path.display());
    }
    Ok(())
}
