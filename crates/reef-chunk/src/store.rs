use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use hashbrown::HashMap;
use reef_geom::{Aabb, Vec3};
use reef_mesh_cpu::{ChunkGeometry, MeshError};
use reef_runtime::{BuildJob, JobKind, JobOut, Runtime};
use reef_world::{ChunkCoord, ColumnCoord, DensityField, World};

/// Where build jobs go. The runtime in production, a plain `Vec` in tests.
pub trait BuildDispatch {
    fn dispatch(&mut self, job: BuildJob);
}

impl BuildDispatch for Runtime {
    fn dispatch(&mut self, job: BuildJob) {
        self.submit_build_job(job);
    }
}

impl BuildDispatch for Vec<BuildJob> {
    fn dispatch(&mut self, job: BuildJob) {
        self.push(job);
    }
}

/// Renderer-facing mesh: chunk-local buffers plus the chunk's world translation.
#[derive(Clone, Debug)]
pub struct ChunkMesh {
    pub geometry: ChunkGeometry,
    pub translation: Vec3,
    /// World-space bounds.
    pub bounds: Aabb,
}

impl ChunkMesh {
    fn from_world_geometry(g: ChunkGeometry, chunk_size: Vec3) -> Self {
        let translation = g.chunk_coord.world_origin(chunk_size);
        let bounds = g.bounds();
        Self {
            geometry: g.into_local(translation),
            translation,
            bounds,
        }
    }
}

#[derive(Clone, Debug)]
pub enum ChunkState {
    Unbuilt,
    Pending { rev: u64 },
    Loaded { rev: u64, mesh: ChunkMesh },
}

#[derive(Clone, Debug)]
pub struct Chunk {
    pub coord: ChunkCoord,
    pub kind: JobKind,
    state: ChunkState,
}

impl Chunk {
    fn unbuilt(coord: ChunkCoord, kind: JobKind) -> Self {
        Self {
            coord,
            kind,
            state: ChunkState::Unbuilt,
        }
    }

    #[inline]
    pub fn state(&self) -> &ChunkState {
        &self.state
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        matches!(self.state, ChunkState::Loaded { .. })
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self.state, ChunkState::Pending { .. })
    }

    pub fn mesh(&self) -> Option<&ChunkMesh> {
        match &self.state {
            ChunkState::Loaded { mesh, .. } => Some(mesh),
            _ => None,
        }
    }

    /// Generation of the outstanding or attached build.
    pub fn rev(&self) -> Option<u64> {
        match self.state {
            ChunkState::Unbuilt => None,
            ChunkState::Pending { rev } | ChunkState::Loaded { rev, .. } => Some(rev),
        }
    }
}

/// One column: terrain chunks ordered by `cy`, plus its water plane.
#[derive(Clone, Debug)]
pub struct VerticalColumn {
    pub coord: ColumnCoord,
    chunks: BTreeMap<i32, Chunk>,
    water: Chunk,
}

impl VerticalColumn {
    fn new(coord: ColumnCoord, ys: Range<i32>) -> Self {
        let chunks = ys
            .map(|cy| (cy, Chunk::unbuilt(coord.chunk(cy), JobKind::Terrain)))
            .collect();
        Self {
            coord,
            chunks,
            water: Chunk::unbuilt(coord.chunk(0), JobKind::Water),
        }
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    #[inline]
    pub fn chunk(&self, cy: i32) -> Option<&Chunk> {
        self.chunks.get(&cy)
    }

    #[inline]
    pub fn water(&self) -> &Chunk {
        &self.water
    }

    pub fn y_range(&self) -> Option<Range<i32>> {
        let lo = *self.chunks.keys().next()?;
        let hi = *self.chunks.keys().next_back()?;
        Some(lo..hi + 1)
    }

    pub fn is_fully_loaded(&self) -> bool {
        self.water.is_loaded() && self.chunks.values().all(Chunk::is_loaded)
    }

    fn slot_mut(&mut self, coord: ChunkCoord, kind: JobKind) -> Option<&mut Chunk> {
        match kind {
            JobKind::Water => Some(&mut self.water),
            JobKind::Terrain => self.chunks.get_mut(&coord.cy),
        }
    }

    fn slots_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.chunks.values_mut().chain(std::iter::once(&mut self.water))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MismatchReason {
    /// The column was dropped after the request went out.
    UntrackedColumn,
    /// The column no longer has that chunk slot, e.g. after a level change.
    UntrackedChunk,
    /// A newer request is outstanding or already attached.
    Superseded { current: Option<u64> },
}

/// A completed build that no longer matches the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildDeliveryMismatch {
    pub coord: ChunkCoord,
    pub kind: JobKind,
    pub rev: u64,
    pub reason: MismatchReason,
}

impl fmt::Display for BuildDeliveryMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} build for {:?} at rev {} ", self.kind, self.coord, self.rev)?;
        match self.reason {
            MismatchReason::UntrackedColumn => write!(f, "arrived for an unloaded column"),
            MismatchReason::UntrackedChunk => write!(f, "arrived for an untracked chunk"),
            MismatchReason::Superseded { current: Some(cur) } => {
                write!(f, "was superseded by rev {cur}")
            }
            MismatchReason::Superseded { current: None } => {
                write!(f, "was superseded (no build outstanding)")
            }
        }
    }
}

impl std::error::Error for BuildDeliveryMismatch {}

/// Outcome of handing one worker result to the store.
#[derive(Debug)]
pub enum Delivery {
    Attached,
    Rejected(MeshError),
    Discarded(BuildDeliveryMismatch),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub requested: u64,
    pub attached: u64,
    pub rejected: u64,
    pub discarded: u64,
    pub disposed: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub columns: usize,
    pub chunks_loaded: usize,
    pub water_loaded: usize,
    pub pending: usize,
    pub vertices: usize,
    pub triangles: usize,
}

/// Owns every column and chunk. Mutated only from the control loop thread.
pub struct ChunkStore {
    world: Arc<World>,
    columns: HashMap<ColumnCoord, VerticalColumn>,
    next_rev: u64,
    next_job_id: u64,
    stats: StoreStats,
}

impl ChunkStore {
    pub fn new(world: Arc<World>) -> Self {
        Self {
            world,
            columns: HashMap::new(),
            next_rev: 1,
            next_job_id: 0,
            stats: StoreStats::default(),
        }
    }

    #[inline]
    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    /// Creates the column and requests every chunk plus its water plane.
    /// Returns `false` (and requests nothing) when the column already exists.
    pub fn ensure_column<D: BuildDispatch + ?Sized>(
        &mut self,
        col: ColumnCoord,
        dispatch: &mut D,
    ) -> bool {
        if self.columns.contains_key(&col) {
            return false;
        }
        let field = self.world.field();
        let mut column = VerticalColumn::new(col, self.world.column_y_range());
        for slot in column.slots_mut() {
            self.request(slot, &field, dispatch);
        }
        log::debug!(
            "column {:?} created with {} chunks",
            col,
            column.chunks.len()
        );
        self.columns.insert(col, column);
        true
    }

    /// Disposes all of the column's meshes. Outstanding builds become stale.
    pub fn drop_column(&mut self, col: ColumnCoord) -> bool {
        let Some(column) = self.columns.remove(&col) else {
            return false;
        };
        let disposed = column
            .chunks
            .values()
            .chain(std::iter::once(&column.water))
            .filter(|c| c.is_loaded())
            .count();
        self.stats.disposed += disposed as u64;
        log::debug!("column {:?} dropped ({} meshes disposed)", col, disposed);
        true
    }

    /// Disposes and re-requests every chunk with the current field, regardless of
    /// state. Slots are re-derived from the current levels.
    pub fn force_rebuild_all<D: BuildDispatch + ?Sized>(&mut self, dispatch: &mut D) -> usize {
        let field = self.world.field();
        let ys = self.world.column_y_range();
        let mut cols: Vec<ColumnCoord> = self.columns.keys().copied().collect();
        cols.sort_by_key(|c| (c.cx, c.cz));
        let mut requested = 0usize;
        for col in cols {
            let Some(mut column) = self.columns.remove(&col) else {
                continue;
            };
            let disposed = column.slots_mut().filter(|c| c.is_loaded()).count();
            self.stats.disposed += disposed as u64;
            column.chunks.retain(|cy, _| ys.contains(cy));
            for cy in ys.clone() {
                column
                    .chunks
                    .entry(cy)
                    .or_insert_with(|| Chunk::unbuilt(col.chunk(cy), JobKind::Terrain));
            }
            for slot in column.slots_mut() {
                slot.state = ChunkState::Unbuilt;
                self.request(slot, &field, dispatch);
                requested += 1;
            }
            self.columns.insert(col, column);
        }
        log::info!(
            "force rebuild: {} columns, {} builds requested",
            self.columns.len(),
            requested
        );
        requested
    }

    fn request<D: BuildDispatch + ?Sized>(
        &mut self,
        slot: &mut Chunk,
        field: &Arc<DensityField>,
        dispatch: &mut D,
    ) {
        debug_assert!(matches!(slot.state, ChunkState::Unbuilt));
        let rev = self.next_rev;
        self.next_rev += 1;
        let job_id = self.next_job_id;
        self.next_job_id += 1;
        let (res, size) = (self.world.resolution, self.world.chunk_size);
        let job = match slot.kind {
            JobKind::Terrain => BuildJob::terrain(slot.coord, res, size, field.clone(), rev, job_id),
            JobKind::Water => {
                BuildJob::water(slot.coord.column(), res, size, field.clone(), rev, job_id)
            }
        };
        slot.state = ChunkState::Pending { rev };
        self.stats.requested += 1;
        dispatch.dispatch(job);
    }

    /// Attaches a worker result if it matches the chunk's outstanding request.
    pub fn apply_result(&mut self, out: JobOut) -> Delivery {
        let mismatch = |reason| BuildDeliveryMismatch {
            coord: out.coord,
            kind: out.kind,
            rev: out.rev,
            reason,
        };
        let chunk_size = self.world.chunk_size;
        let Some(column) = self.columns.get_mut(&out.coord.column()) else {
            return self.discard(mismatch(MismatchReason::UntrackedColumn));
        };
        let Some(slot) = column.slot_mut(out.coord, out.kind) else {
            return self.discard(mismatch(MismatchReason::UntrackedChunk));
        };
        match slot.state {
            ChunkState::Pending { rev } if rev == out.rev => {}
            _ => {
                let current = slot.rev();
                return self.discard(mismatch(MismatchReason::Superseded { current }));
            }
        }
        match out.result {
            Ok(geometry) => {
                slot.state = ChunkState::Loaded {
                    rev: out.rev,
                    mesh: ChunkMesh::from_world_geometry(geometry, chunk_size),
                };
                self.stats.attached += 1;
                Delivery::Attached
            }
            Err(e) => {
                slot.state = ChunkState::Unbuilt;
                self.stats.rejected += 1;
                log::warn!("{:?} build for {:?} rejected: {}", out.kind, out.coord, e);
                Delivery::Rejected(e)
            }
        }
    }

    fn discard(&mut self, m: BuildDeliveryMismatch) -> Delivery {
        self.stats.discarded += 1;
        log::debug!("{}", m);
        Delivery::Discarded(m)
    }

    #[inline]
    pub fn contains_column(&self, col: ColumnCoord) -> bool {
        self.columns.contains_key(&col)
    }

    #[inline]
    pub fn column(&self, col: ColumnCoord) -> Option<&VerticalColumn> {
        self.columns.get(&col)
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_coords(&self) -> impl Iterator<Item = ColumnCoord> + '_ {
        self.columns.keys().copied()
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.columns.get(&coord.column())?.chunk(coord.cy)
    }

    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.chunk(coord).is_some_and(Chunk::is_loaded)
    }

    pub fn pending_count(&self) -> usize {
        self.columns
            .values()
            .flat_map(|c| c.chunks.values().chain(std::iter::once(&c.water)))
            .filter(|c| c.is_pending())
            .count()
    }

    /// Every attached mesh, terrain and water.
    pub fn renderables(&self) -> impl Iterator<Item = &Chunk> + '_ {
        self.columns
            .values()
            .flat_map(|c| c.chunks.values().chain(std::iter::once(&c.water)))
            .filter(|c| c.is_loaded())
    }

    #[inline]
    pub fn stats(&self) -> StoreStats {
        self.stats
    }

    pub fn render_stats(&self) -> RenderStats {
        let mut rs = RenderStats {
            columns: self.columns.len(),
            pending: self.pending_count(),
            ..Default::default()
        };
        for c in self.renderables() {
            match c.kind {
                JobKind::Terrain => rs.chunks_loaded += 1,
                JobKind::Water => rs.water_loaded += 1,
            }
            if let Some(m) = c.mesh() {
                rs.vertices += m.geometry.vertex_count();
                rs.triangles += m.geometry.triangle_count();
            }
        }
        rs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reef_world::DensityParams;
    use reef_world::params::ChunkLayout;

    fn world() -> Arc<World> {
        let layout = ChunkLayout {
            size: [10.0, 10.0, 10.0],
            resolution: [4, 4, 4],
        };
        Arc::new(World::new(DensityParams::default(), &layout).unwrap())
    }

    fn finish(job: &BuildJob) -> JobOut {
        JobOut {
            coord: job.coord(),
            kind: job.kind,
            rev: job.rev,
            job_id: job.job_id,
            result: job.run(),
            t_total_ms: 0,
        }
    }

    #[test]
    fn ensure_requests_every_slot_once() {
        let mut store = ChunkStore::new(world());
        let mut jobs = Vec::new();
        let col = ColumnCoord::new(0, 0);
        assert!(store.ensure_column(col, &mut jobs));
        // -8..4 terrain chunks plus one water plane.
        assert_eq!(jobs.len(), 13);
        assert_eq!(jobs.iter().filter(|j| j.kind == JobKind::Water).count(), 1);
        assert!(!store.ensure_column(col, &mut jobs));
        assert_eq!(jobs.len(), 13);
        assert_eq!(store.pending_count(), 13);
        assert!(!store.is_loaded(col.chunk(0)));
    }

    #[test]
    fn results_attach_in_any_order() {
        let mut store = ChunkStore::new(world());
        let mut jobs = Vec::new();
        let col = ColumnCoord::new(1, -1);
        store.ensure_column(col, &mut jobs);
        for job in jobs.iter().rev() {
            assert!(matches!(store.apply_result(finish(job)), Delivery::Attached));
        }
        assert!(store.column(col).unwrap().is_fully_loaded());
        assert_eq!(store.pending_count(), 0);
        assert_eq!(store.renderables().count(), 13);
    }

    #[test]
    fn mesh_is_chunk_local_with_translation() {
        let mut store = ChunkStore::new(world());
        let mut jobs = Vec::new();
        let col = ColumnCoord::new(2, 3);
        store.ensure_column(col, &mut jobs);
        for job in &jobs {
            store.apply_result(finish(job));
        }
        let water = store.column(col).unwrap().water();
        let mesh = water.mesh().unwrap();
        assert_eq!(mesh.translation, Vec3::new(20.0, 0.0, 30.0));
        let local = mesh.geometry.bounds();
        assert!(local.min.x.abs() < 1e-4 && local.min.z.abs() < 1e-4);
        assert!((local.min.y - 40.0).abs() < 1e-4);
        assert_eq!(local.translated(mesh.translation).min, mesh.bounds.min);
    }

    #[test]
    fn duplicate_delivery_is_superseded() {
        let mut store = ChunkStore::new(world());
        let mut jobs = Vec::new();
        store.ensure_column(ColumnCoord::new(0, 0), &mut jobs);
        let job = &jobs[0];
        assert!(matches!(store.apply_result(finish(job)), Delivery::Attached));
        match store.apply_result(finish(job)) {
            Delivery::Discarded(m) => {
                assert_eq!(m.reason, MismatchReason::Superseded { current: Some(job.rev) })
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejected_build_leaves_chunk_unbuilt() {
        let mut store = ChunkStore::new(world());
        let mut jobs = Vec::new();
        store.ensure_column(ColumnCoord::new(0, 0), &mut jobs);
        let job = &jobs[0];
        let out = JobOut {
            result: Err(MeshError::EmptyResolution(store.world().resolution)),
            ..finish(job)
        };
        assert!(matches!(store.apply_result(out), Delivery::Rejected(_)));
        let chunk = store.chunk(job.coord()).unwrap();
        assert!(matches!(chunk.state(), ChunkState::Unbuilt));
        assert_eq!(store.stats().rejected, 1);
    }
}
