//! Viewer-driven chunk streaming.
//!
//! [`StreamingManager::tick`] keeps the chunk registry populated around the
//! viewer, requests chunk data and meshes from its [`ChunkPipeline`], and
//! tells the [`ChunkRenderer`] which mesh each chunk shows and whether it is
//! visible. Everything here runs on the consumer thread; worker results
//! arrive through the pipeline's queues and this module's event inbox.
pub mod bounds;
pub mod chunk;
pub mod lod;
pub mod renderer;
pub mod view;

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, Sender};

use glam::Vec3;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub use bounds::ChunkBounds;
pub use chunk::{ChunkState, MeshSlot, TerrainChunk};
pub use lod::{LodLevel, LodTable};
pub use renderer::{ChunkRenderer, MaterialId};
pub use view::{in_viewport, PerspectiveCamera, ViewportProjector};

use crate::config::TerrainConfig;
use crate::coords::ChunkCoord;
use crate::error::Result;
use crate::pipeline::{ChunkDataResult, ChunkPipeline, MeshResult};

/// Shape of the neighbourhood kept around the viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridMetric {
    /// Square of side `2k + 1`.
    #[default]
    Chebyshev,
    /// Disc of radius `k`.
    Euclidean,
}

impl GridMetric {
    /// Whether `coord` lies within `radius` chunks of `center`.
    pub fn contains(self, center: ChunkCoord, coord: ChunkCoord, radius: i32) -> bool {
        match self {
            GridMetric::Chebyshev => center.chebyshev_distance(coord) <= radius,
            GridMetric::Euclidean => center.squared_distance(coord) <= radius as i64 * radius as i64,
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub created: usize,
    pub data_received: usize,
    pub meshes_received: usize,
    pub visible: usize,
    pub hidden: usize,
    pub evicted: usize,
    /// Requests still running on the pipeline after this tick.
    pub pending: usize,
    pub resident: usize,
}

enum StreamEvent {
    Data { coord: ChunkCoord, epoch: u64, result: ChunkDataResult },
    Mesh { coord: ChunkCoord, epoch: u64, lod: usize, result: MeshResult },
}

pub struct StreamingManager<R: ChunkRenderer> {
    config: TerrainConfig,
    lods: LodTable,
    pipeline: ChunkPipeline,
    renderer: R,
    material: MaterialId,
    chunks: HashMap<ChunkCoord, TerrainChunk>,
    visible_last_tick: HashSet<ChunkCoord>,
    events_tx: Sender<StreamEvent>,
    events_rx: Receiver<StreamEvent>,
    chunk_stride: f32,
    view_radius: i32,
    tick: u64,
    next_epoch: u64,
}

impl<R: ChunkRenderer> StreamingManager<R> {
    /// Validate `config` and start the manager's own pipeline.
    pub fn new(config: TerrainConfig, renderer: R) -> Result<Self> {
        let pipeline = ChunkPipeline::new(&config)?;
        Self::with_pipeline(config, pipeline, renderer)
    }

    /// Use an already-built pipeline, e.g. one over custom layers.
    pub fn with_pipeline(config: TerrainConfig, pipeline: ChunkPipeline, renderer: R) -> Result<Self> {
        config.validate()?;
        let lods = LodTable::new(config.lods.clone(), config.chunk_edge)?;
        let chunk_stride = (config.chunk_edge - 1) as f32;
        let view_radius = (lods.max_view_distance() / chunk_stride).ceil() as i32;
        let (events_tx, events_rx) = mpsc::channel();
        debug!(
            "streaming: chunk stride {chunk_stride}, view distance {}, radius {view_radius} chunks",
            lods.max_view_distance()
        );

        Ok(Self {
            material: config.material,
            config,
            lods,
            pipeline,
            renderer,
            chunks: HashMap::new(),
            visible_last_tick: HashSet::new(),
            events_tx,
            events_rx,
            chunk_stride,
            view_radius,
            tick: 0,
            next_epoch: 0,
        })
    }

    pub fn tick(&mut self, viewer: Vec3) -> TickReport {
        self.tick_with_view(viewer, None)
    }

    /// One streaming step. `view`, when given, drops chunks whose bounds
    /// project entirely outside the viewport.
    pub fn tick_with_view(&mut self, viewer: Vec3, view: Option<&dyn ViewportProjector>) -> TickReport {
        self.tick += 1;
        let mut report = TickReport { tick: self.tick, ..Default::default() };

        self.pipeline.drain();
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event, &mut report);
        }

        let center = ChunkCoord::from_world_pos(viewer, self.chunk_stride);
        let radius = self.view_radius;
        let mut in_range = HashSet::new();
        let mut shown = HashSet::new();
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                let coord = center.offset(dx, dz);
                if !self.config.grid_metric.contains(center, coord, radius) {
                    continue;
                }
                in_range.insert(coord);
                if !self.chunks.contains_key(&coord) {
                    self.create_chunk(coord);
                    report.created += 1;
                } else if self.refresh_chunk(coord, viewer, view, &mut report) {
                    shown.insert(coord);
                }
            }
        }

        for coord in self.visible_last_tick.difference(&shown) {
            if let Some(chunk) = self.chunks.get_mut(coord) {
                if chunk.visible {
                    self.renderer.set_visible(*coord, false);
                    chunk.visible = false;
                    chunk.state = ChunkState::Hidden;
                    report.hidden += 1;
                }
            }
        }

        report.evicted = self.evict(&in_range);
        report.visible = shown.len();
        self.visible_last_tick = shown;
        report.pending = self.pipeline.in_flight();
        report.resident = self.chunks.len();

        debug!(
            "tick {} at {center}: +{} chunks, {} data, {} meshes, {} visible, {} hidden, {} evicted, {} pending",
            report.tick,
            report.created,
            report.data_received,
            report.meshes_received,
            report.visible,
            report.hidden,
            report.evicted,
            report.pending
        );
        report
    }

    fn apply_event(&mut self, event: StreamEvent, report: &mut TickReport) {
        match event {
            StreamEvent::Data { coord, epoch, result } => {
                let Some(chunk) = self.chunks.get_mut(&coord).filter(|c| c.epoch == epoch) else {
                    debug!("dropping chunk data for evicted chunk {coord}");
                    return;
                };
                match result {
                    Ok(data) => {
                        chunk.set_data(data);
                        report.data_received += 1;
                    }
                    Err(e) => warn!("chunk {coord} has no data and stays pending: {e}"),
                }
            }
            StreamEvent::Mesh { coord, epoch, lod, result } => {
                let Some(chunk) = self.chunks.get_mut(&coord).filter(|c| c.epoch == epoch) else {
                    debug!("dropping LOD {lod} mesh for evicted chunk {coord}");
                    return;
                };
                match result {
                    Ok(mesh) => {
                        chunk.meshes[lod] = MeshSlot::Ready(mesh);
                        report.meshes_received += 1;
                    }
                    Err(e) => {
                        warn!("LOD {lod} mesh for chunk {coord} failed: {e}");
                        chunk.meshes[lod] = MeshSlot::Empty;
                    }
                }
            }
        }
    }

    fn create_chunk(&mut self, coord: ChunkCoord) {
        let epoch = self.next_epoch;
        self.next_epoch += 1;
        self.chunks
            .insert(coord, TerrainChunk::new(coord, self.chunk_stride, self.lods.len(), self.tick, epoch));

        let tx = self.events_tx.clone();
        self.pipeline.request_chunk_data(coord.world_offset(self.chunk_stride), move |result| {
            // The manager owns the receiver; a closed inbox means it is gone.
            let _ = tx.send(StreamEvent::Data { coord, epoch, result });
        });
    }

    /// Update visibility and LOD of a resident chunk. Returns whether it is
    /// shown after this tick.
    fn refresh_chunk(
        &mut self,
        coord: ChunkCoord,
        viewer: Vec3,
        view: Option<&dyn ViewportProjector>,
        report: &mut TickReport,
    ) -> bool {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return false;
        };
        let Some(data) = chunk.data.clone() else {
            return false;
        };

        let max_view = self.lods.max_view_distance();
        let sqr_distance = chunk.bounds.sqr_distance(viewer);
        let mut in_view = sqr_distance <= max_view * max_view;
        if in_view {
            if let Some(view) = view {
                in_view = in_viewport(&chunk.bounds, view, self.config.viewport_margin);
            }
        }

        if in_view {
            let lod = self.lods.select(sqr_distance.sqrt());
            if let Some(mesh) = chunk.mesh(lod).cloned() {
                if chunk.current_lod != Some(lod) {
                    self.renderer.attach_mesh(coord, &mesh, self.material);
                    chunk.current_lod = Some(lod);
                }
            } else if matches!(chunk.meshes[lod], MeshSlot::Empty) {
                // Keep showing the previous LOD until this one arrives.
                chunk.meshes[lod] = MeshSlot::Requested;
                let tx = self.events_tx.clone();
                let epoch = chunk.epoch;
                self.pipeline.request_mesh_data(data, self.lods.level(lod).stride, move |result| {
                    let _ = tx.send(StreamEvent::Mesh { coord, epoch, lod, result });
                });
            }
        }

        let show = in_view && chunk.current_lod.is_some();
        if show != chunk.visible {
            self.renderer.set_visible(coord, show);
            chunk.visible = show;
            if !show {
                report.hidden += 1;
            }
        }
        if show {
            chunk.state = ChunkState::Displayed;
            chunk.last_visible_tick = self.tick;
        } else if chunk.state == ChunkState::Displayed {
            chunk.state = ChunkState::Hidden;
        }
        show
    }

    /// Drop out-of-range chunks, least recently visible first, until the
    /// registry fits `max_resident_chunks`.
    fn evict(&mut self, in_range: &HashSet<ChunkCoord>) -> usize {
        let Some(limit) = self.config.max_resident_chunks else {
            return 0;
        };
        if self.chunks.len() <= limit {
            return 0;
        }

        let mut candidates: Vec<(u64, ChunkCoord)> = self
            .chunks
            .values()
            .filter(|c| !in_range.contains(&c.coord))
            .map(|c| (c.last_visible_tick, c.coord))
            .collect();
        candidates.sort_unstable();

        let excess = self.chunks.len() - limit;
        let mut evicted = 0;
        for (_, coord) in candidates.into_iter().take(excess) {
            self.chunks.remove(&coord);
            self.visible_last_tick.remove(&coord);
            self.renderer.release(coord);
            evicted += 1;
        }
        evicted
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.chunks.get(&coord)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &TerrainChunk> {
        self.chunks.values()
    }

    pub fn resident_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn view_radius(&self) -> i32 {
        self.view_radius
    }

    pub fn chunk_stride(&self) -> f32 {
        self.chunk_stride
    }

    pub fn lods(&self) -> &LodTable {
        &self.lods
    }

    pub fn pipeline(&self) -> &ChunkPipeline {
        &self.pipeline
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }
}
