//! Worker pool for chunk mesh builds. Jobs go out over a channel, results come back
//! over another and are drained by the control loop in whatever order they finish.
#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use reef_geom::Vec3;
use reef_mesh_cpu::{ChunkGeometry, MeshError, build_water_plane, extract};
use reef_world::{ChunkCoord, ColumnCoord, DensityField, LatticeResolution};
use serde::{Deserialize, Serialize};

pub use rayon::ThreadPoolBuildError;

/// What a worker needs to mesh one chunk, in wire form.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub chunk_coord: ChunkCoord,
    pub lattice_resolution: LatticeResolution,
    pub chunk_world_size: Vec3,
    pub threshold: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobKind {
    Terrain,
    /// Column water plane; `request.chunk_coord` is the column's `cy = 0` chunk.
    Water,
}

#[derive(Clone, Debug)]
pub struct BuildJob {
    pub request: BuildRequest,
    pub kind: JobKind,
    pub rev: u64,
    pub job_id: u64,
    /// Snapshot taken when the job was created.
    pub field: Arc<DensityField>,
}

impl BuildJob {
    pub fn terrain(
        coord: ChunkCoord,
        res: LatticeResolution,
        chunk_size: Vec3,
        field: Arc<DensityField>,
        rev: u64,
        job_id: u64,
    ) -> Self {
        Self {
            request: BuildRequest {
                chunk_coord: coord,
                lattice_resolution: res,
                chunk_world_size: chunk_size,
                threshold: field.threshold(),
            },
            kind: JobKind::Terrain,
            rev,
            job_id,
            field,
        }
    }

    pub fn water(
        col: ColumnCoord,
        res: LatticeResolution,
        chunk_size: Vec3,
        field: Arc<DensityField>,
        rev: u64,
        job_id: u64,
    ) -> Self {
        Self {
            kind: JobKind::Water,
            ..Self::terrain(col.chunk(0), res, chunk_size, field, rev, job_id)
        }
    }

    #[inline]
    pub fn coord(&self) -> ChunkCoord {
        self.request.chunk_coord
    }

    /// Runs the build on the calling thread.
    pub fn run(&self) -> Result<ChunkGeometry, MeshError> {
        let r = &self.request;
        match self.kind {
            JobKind::Terrain => extract(
                self.field.as_ref(),
                r.chunk_coord,
                r.lattice_resolution,
                r.chunk_world_size,
                r.threshold,
            ),
            JobKind::Water => {
                let surface_y = self.field.params().surface_level * r.chunk_world_size.y;
                build_water_plane(
                    r.chunk_coord.column(),
                    r.lattice_resolution,
                    r.chunk_world_size,
                    surface_y,
                )
            }
        }
    }
}

#[derive(Debug)]
pub struct JobOut {
    pub coord: ChunkCoord,
    pub kind: JobKind,
    pub rev: u64,
    pub job_id: u64,
    pub result: Result<ChunkGeometry, MeshError>,
    pub t_total_ms: u32,
}

fn process_build_job(job: BuildJob, tx: &Sender<JobOut>) {
    let t0 = Instant::now();
    let result = job.run();
    let t_total_ms = t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32;
    match &result {
        Ok(g) => log::debug!(
            "built {:?} {:?} rev={} job={} tris={} in {}ms",
            job.kind,
            job.coord(),
            job.rev,
            job.job_id,
            g.triangle_count(),
            t_total_ms
        ),
        Err(e) => log::debug!("build {:?} {:?} failed: {}", job.kind, job.coord(), e),
    }
    // Receiver gone means the runtime is shutting down.
    let _ = tx.send(JobOut {
        coord: job.coord(),
        kind: job.kind,
        rev: job.rev,
        job_id: job.job_id,
        result,
        t_total_ms,
    });
}

pub struct Runtime {
    job_tx: Sender<BuildJob>,
    res_rx: Receiver<JobOut>,
    _pool: Arc<ThreadPool>,
    queued: Arc<AtomicUsize>,
    inflight: Arc<AtomicUsize>,
    pub workers: usize,
}

impl Runtime {
    /// `workers == 0` picks one per available core.
    pub fn new(workers: usize) -> Result<Self, ThreadPoolBuildError> {
        let workers = if workers == 0 {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            workers
        };
        let (job_tx, job_rx) = unbounded::<BuildJob>();
        let (res_tx, res_rx) = unbounded::<JobOut>();
        let queued = Arc::new(AtomicUsize::new(0));
        let inflight = Arc::new(AtomicUsize::new(0));

        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("reef-mesh-{i}"))
                .build()?,
        );
        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = res_tx.clone();
            let queued = queued.clone();
            let inflight = inflight.clone();
            pool.spawn(move || {
                while let Ok(job) = rx.recv() {
                    inflight.fetch_add(1, Ordering::SeqCst);
                    queued.fetch_sub(1, Ordering::SeqCst);
                    process_build_job(job, &tx);
                    inflight.fetch_sub(1, Ordering::SeqCst);
                }
            });
        }
        log::info!("mesh runtime started with {} workers", workers);
        Ok(Self {
            job_tx,
            res_rx,
            _pool: pool,
            queued,
            inflight,
            workers,
        })
    }

    /// Never blocks; the job is queued for the next free worker.
    pub fn submit_build_job(&self, job: BuildJob) {
        self.queued.fetch_add(1, Ordering::SeqCst);
        if self.job_tx.send(job).is_err() {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            log::warn!("mesh runtime is down, build dropped");
        }
    }

    pub fn drain_worker_results(&self) -> Vec<JobOut> {
        self.res_rx.try_iter().collect()
    }

    pub fn recv_result_timeout(&self, timeout: Duration) -> Option<JobOut> {
        self.res_rx.recv_timeout(timeout).ok()
    }

    /// `(queued, inflight)`.
    pub fn queue_debug_counts(&self) -> (usize, usize) {
        (
            self.queued.load(Ordering::SeqCst),
            self.inflight.load(Ordering::SeqCst),
        )
    }

    /// Nothing queued, nothing building and no result waiting to be drained.
    pub fn is_idle(&self) -> bool {
        let (q, f) = self.queue_debug_counts();
        q == 0 && f == 0 && self.res_rx.is_empty()
    }
}
