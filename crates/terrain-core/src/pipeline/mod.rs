//! Asynchronous chunk-data and mesh generation.
//!
//! Requests run on a dedicated rayon pool. A chunk-data request fans out one
//! task per active layer, joins them, combines the fields and derives the
//! gradient field. Results travel back over one channel per result kind and
//! their callbacks run on the consumer thread inside [`ChunkPipeline::drain`].
pub mod chunk_data;
pub mod gradient;
pub(crate) mod queue;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::DVec2;
use log::{debug, info, trace, warn};
use rayon::prelude::*;

pub use chunk_data::{combine_layers, ChunkData, LayerContribution};
pub use gradient::GradientField;
pub use queue::Callback;

use crate::config::TerrainConfig;
use crate::error::{Result, TerrainError};
use crate::heightfield::HeightField;
use crate::mesh::{build_chunk_mesh, MeshBuffer};
use crate::noise::{build_method, layer_seed, GenerationMethod, GenerationSettings};
use queue::ResultQueue;

pub type ChunkDataResult = Result<Arc<ChunkData>>;
pub type MeshResult = Result<Arc<MeshBuffer>>;

/// An active generation layer and its position in the configured layer list.
#[derive(Clone)]
pub struct Layer {
    pub index: usize,
    pub method: Arc<dyn GenerationMethod>,
}

/// Immutable generation inputs shared by every worker task.
struct Generator {
    layers: Vec<Layer>,
    chunk_edge: usize,
    height_multiplier: f32,
}

impl Generator {
    fn run_layer(&self, layer: &Layer, offset: DVec2) -> Result<HeightField> {
        let field = panic::catch_unwind(AssertUnwindSafe(|| layer.method.create_height_map(offset)))
            .map_err(|payload| TerrainError::LayerFailed { layer: layer.index, reason: panic_message(&*payload) })?;
        if field.width != self.chunk_edge || field.height != self.chunk_edge {
            return Err(TerrainError::DimensionMismatch {
                layer: layer.index,
                expected: self.chunk_edge,
                found: field.width.max(field.height),
            });
        }
        Ok(field)
    }

    /// Generate every layer in parallel, then combine. The first failing
    /// layer fails the chunk.
    fn generate(&self, offset: DVec2) -> Result<ChunkData> {
        let fields = self
            .layers
            .par_iter()
            .map(|layer| self.run_layer(layer, offset))
            .collect::<Result<Vec<_>>>()?;

        for (layer, field) in self.layers.iter().zip(&fields) {
            trace!(
                "layer {} at ({:.1}, {:.1}): range [{:.4}, {:.4}]",
                layer.index,
                offset.x,
                offset.y,
                field.min_value(),
                field.max_value()
            );
        }

        let settings: Vec<&GenerationSettings> = self.layers.iter().map(|l| l.method.settings()).collect();
        let pairs: Vec<_> = settings.into_iter().zip(fields).collect();
        let (heights, contributions) = combine_layers(&pairs, self.chunk_edge, self.height_multiplier)?;
        trace!("combined {} layers: {:?}", contributions.len(), contributions);
        Ok(ChunkData::new(heights))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "layer task panicked".to_string()
    }
}

/// Worker pool plus completion queues. Owned by one consumer.
pub struct ChunkPipeline {
    pool: rayon::ThreadPool,
    generator: Arc<Generator>,
    mesh_height_scale: f32,
    data_queue: ResultQueue<ChunkDataResult>,
    mesh_queue: ResultQueue<MeshResult>,
    in_flight: Arc<AtomicUsize>,
}

impl ChunkPipeline {
    /// Validate `config`, build one method per active layer and start the pool.
    pub fn new(config: &TerrainConfig) -> Result<Self> {
        config.validate()?;
        let mut layers = Vec::new();
        for (index, settings) in config.layers.iter().enumerate() {
            if !settings.is_active {
                continue;
            }
            let method = build_method(settings, layer_seed(config.seed, index))?;
            layers.push(Layer { index, method });
        }
        Self::from_layers(config, layers)
    }

    /// Start a pool over caller-supplied layers. `config.layers` is not used.
    pub fn from_layers(config: &TerrainConfig, layers: Vec<Layer>) -> Result<Self> {
        config.validate()?;
        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("terrain-worker-{i}"));
        if let Some(n) = config.worker_threads {
            builder = builder.num_threads(n);
        }
        let pool = builder.build()?;
        info!(
            "chunk pipeline: {} active layers, edge {}, {} workers",
            layers.len(),
            config.chunk_edge,
            pool.current_num_threads()
        );

        Ok(Self {
            pool,
            generator: Arc::new(Generator {
                layers,
                chunk_edge: config.chunk_edge,
                height_multiplier: config.height_multiplier,
            }),
            mesh_height_scale: config.mesh_height_scale,
            data_queue: ResultQueue::new(),
            mesh_queue: ResultQueue::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn chunk_edge(&self) -> usize {
        self.generator.chunk_edge
    }

    pub fn layer_count(&self) -> usize {
        self.generator.layers.len()
    }

    pub fn worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Blocking generation of one chunk on the worker pool.
    pub fn generate_chunk_data(&self, offset: DVec2) -> Result<ChunkData> {
        let generator = &self.generator;
        self.pool.install(|| generator.generate(offset))
    }

    /// Queue chunk-data generation for the chunk whose sample `(0, 0)` sits
    /// at `offset`. `on_complete` runs during a later [`drain`](Self::drain).
    pub fn request_chunk_data<F>(&self, offset: DVec2, on_complete: F)
    where
        F: FnOnce(ChunkDataResult) + Send + 'static,
    {
        debug!("chunk data requested at ({:.1}, {:.1})", offset.x, offset.y);
        let generator = Arc::clone(&self.generator);
        let tx = self.data_queue.sender();
        let in_flight = Arc::clone(&self.in_flight);
        in_flight.fetch_add(1, Ordering::SeqCst);

        let callback: Callback<ChunkDataResult> = Box::new(on_complete);

        self.pool.spawn(move || {
            let result = generator.generate(offset).map(Arc::new);
            if let Err(e) = &result {
                warn!("chunk data at ({:.1}, {:.1}) failed: {e}", offset.x, offset.y);
            }
            if tx.send((result, callback)).is_err() {
                debug!("pipeline dropped before chunk data was delivered");
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });
    }

    /// Queue mesh construction for `data` at `stride`.
    pub fn request_mesh_data<F>(&self, data: Arc<ChunkData>, stride: usize, on_complete: F)
    where
        F: FnOnce(MeshResult) + Send + 'static,
    {
        let scale = self.mesh_height_scale;
        let tx = self.mesh_queue.sender();
        let in_flight = Arc::clone(&self.in_flight);
        in_flight.fetch_add(1, Ordering::SeqCst);

        let callback: Callback<MeshResult> = Box::new(on_complete);

        self.pool.spawn(move || {
            let result = build_chunk_mesh(&data, scale, stride).map(Arc::new);
            if let Err(e) = &result {
                warn!("mesh at stride {stride} failed: {e}");
            }
            if tx.send((result, callback)).is_err() {
                debug!("pipeline dropped before mesh was delivered");
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });
    }

    /// Run every completed callback on the calling thread. Chunk data first,
    /// then meshes. Returns `(chunk_data_callbacks, mesh_callbacks)`.
    pub fn drain(&self) -> (usize, usize) {
        (self.data_queue.drain(), self.mesh_queue.drain())
    }

    /// Requests dispatched whose results have not been queued yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight() == 0
    }

    /// Block until every dispatched request has queued its result, or until
    /// `timeout` passes. Returns whether the pipeline went idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_idle() {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::MethodKind;
    use std::sync::Mutex;

    const EDGE: usize = 17;

    fn small_config() -> TerrainConfig {
        TerrainConfig {
            chunk_edge: EDGE,
            layers: vec![
                GenerationSettings { chunk_edge: EDGE, scale: 8.0, ..Default::default() },
                GenerationSettings {
                    method: MethodKind::Voronoi,
                    chunk_edge: EDGE,
                    scale: 6.0,
                    weight: 0.5,
                    use_first_layer_as_mask: true,
                    ..Default::default()
                },
            ],
            lods: vec![(1, 50.0).into(), (2, 100.0).into()],
            worker_threads: Some(2),
            ..Default::default()
        }
    }

    struct Panicking(GenerationSettings);

    impl GenerationMethod for Panicking {
        fn settings(&self) -> &GenerationSettings {
            &self.0
        }
        fn evaluate_height(&self, _: DVec2) -> f32 {
            0.0
        }
        fn create_height_map(&self, _: DVec2) -> HeightField {
            panic!("kernel blew up")
        }
    }

    struct WrongSize(GenerationSettings);

    impl GenerationMethod for WrongSize {
        fn settings(&self) -> &GenerationSettings {
            &self.0
        }
        fn evaluate_height(&self, _: DVec2) -> f32 {
            0.0
        }
        fn create_height_map(&self, _: DVec2) -> HeightField {
            HeightField::square(EDGE + 2)
        }
    }

    fn layer(index: usize, method: impl GenerationMethod + 'static) -> Layer {
        Layer { index, method: Arc::new(method) }
    }

    #[test]
    fn async_request_matches_sync_generation() {
        let pipeline = ChunkPipeline::new(&small_config()).unwrap();
        let offset = DVec2::new(16.0, -32.0);
        let expected = pipeline.generate_chunk_data(offset).unwrap();

        let slot = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&slot);
        pipeline.request_chunk_data(offset, move |r| *sink.lock().unwrap() = Some(r));
        assert!(pipeline.wait_idle(Duration::from_secs(30)));
        assert!(slot.lock().unwrap().is_none(), "callbacks only run on drain");

        assert_eq!(pipeline.drain(), (1, 0));
        let got = slot.lock().unwrap().take().unwrap().unwrap();
        assert_eq!(got.heights, expected.heights);
        assert_eq!(got.gradients, expected.gradients);
    }

    #[test]
    fn panicking_layer_fails_the_chunk() {
        let config = small_config();
        let s = config.layers[0].clone();
        let pipeline = ChunkPipeline::from_layers(
            &config,
            vec![
                Layer { index: 0, method: build_method(&s, 1).unwrap() },
                layer(1, Panicking(s.clone())),
            ],
        )
        .unwrap();
        let err = pipeline.generate_chunk_data(DVec2::ZERO).unwrap_err();
        assert!(matches!(err, TerrainError::LayerFailed { layer: 1, ref reason } if reason.contains("blew up")));
    }

    #[test]
    fn wrong_sized_layer_is_reported_through_the_callback() {
        let config = small_config();
        let s = config.layers[0].clone();
        let pipeline = ChunkPipeline::from_layers(&config, vec![layer(3, WrongSize(s))]).unwrap();

        let slot = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&slot);
        pipeline.request_chunk_data(DVec2::ZERO, move |r| *sink.lock().unwrap() = Some(r));
        assert!(pipeline.wait_idle(Duration::from_secs(30)));
        pipeline.drain();
        let result = slot.lock().unwrap().take().unwrap();
        assert!(matches!(result, Err(TerrainError::DimensionMismatch { layer: 3, expected: EDGE, found: 19 })));
    }

    #[test]
    fn mesh_requests_validate_stride() {
        let pipeline = ChunkPipeline::new(&small_config()).unwrap();
        let data = Arc::new(pipeline.generate_chunk_data(DVec2::ZERO).unwrap());

        let results = Arc::new(Mutex::new(Vec::new()));
        for stride in [2, 3] {
            let sink = Arc::clone(&results);
            pipeline.request_mesh_data(Arc::clone(&data), stride, move |r| sink.lock().unwrap().push((stride, r)));
        }
        assert!(pipeline.wait_idle(Duration::from_secs(30)));
        assert_eq!(pipeline.drain(), (0, 2));

        let results = results.lock().unwrap();
        for (stride, r) in results.iter() {
            match stride {
                2 => assert_eq!(r.as_ref().unwrap().vertices_per_line(), 9),
                _ => assert!(matches!(r, Err(TerrainError::InvalidStride { stride: 3, edge: EDGE }))),
            }
        }
    }

    #[test]
    fn inactive_layers_are_skipped() {
        let mut config = small_config();
        config.layers[1].is_active = false;
        let pipeline = ChunkPipeline::new(&config).unwrap();
        assert_eq!(pipeline.layer_count(), 1);
    }

    #[test]
    fn invalid_config_is_rejected_before_any_work() {
        let mut config = small_config();
        config.layers[0].scale = 0.0;
        assert!(matches!(ChunkPipeline::new(&config), Err(TerrainError::Config(_))));
    }
}
