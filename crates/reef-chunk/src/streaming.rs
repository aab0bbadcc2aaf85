use hashbrown::HashSet;
use reef_world::ColumnCoord;

use crate::store::{BuildDispatch, ChunkStore};

/// Largest accepted stream radius, in columns. Larger requests are clamped.
pub const MAX_STREAM_RADIUS: u32 = 64;

/// Columns with `|dx| <= radius && |dz| <= radius`, nearest first. `radius` is
/// clamped to [`MAX_STREAM_RADIUS`].
pub fn columns_in_radius(center: ColumnCoord, radius: u32) -> Vec<ColumnCoord> {
    let r = radius.min(MAX_STREAM_RADIUS) as i32;
    let side = 2 * r as usize + 1;
    let mut out = Vec::with_capacity(side * side);
    for dz in -r..=r {
        for dx in -r..=r {
            out.push(center.offset(dx, dz));
        }
    }
    out.sort_by_key(|c| {
        let dx = i64::from(c.cx - center.cx);
        let dz = i64::from(c.cz - center.cz);
        (dx * dx + dz * dz, c.cx, c.cz)
    });
    out
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamDelta {
    pub loaded: Vec<ColumnCoord>,
    pub unloaded: Vec<ColumnCoord>,
}

impl StreamDelta {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.unloaded.is_empty()
    }
}

/// Diff between the columns required around `center` and those currently present.
pub fn plan_stream<I>(center: ColumnCoord, radius: u32, present: I) -> StreamDelta
where
    I: IntoIterator<Item = ColumnCoord>,
{
    let present: HashSet<ColumnCoord> = present.into_iter().collect();
    let radius = radius.min(MAX_STREAM_RADIUS);
    let loaded = columns_in_radius(center, radius)
        .into_iter()
        .filter(|c| !present.contains(c))
        .collect();
    let mut unloaded: Vec<ColumnCoord> = present
        .into_iter()
        .filter(|c| c.chebyshev(center) > radius)
        .collect();
    unloaded.sort_by_key(|c| (c.cx, c.cz));
    StreamDelta { loaded, unloaded }
}

/// Keeps the store's column set matching a square around the viewer.
#[derive(Clone, Debug)]
pub struct StreamingPolicy {
    radius: u32,
    center: Option<ColumnCoord>,
}

impl StreamingPolicy {
    pub fn new(radius: u32) -> Self {
        Self {
            radius: clamp_radius(radius),
            center: None,
        }
    }

    #[inline]
    pub fn radius(&self) -> u32 {
        self.radius
    }

    #[inline]
    pub fn center(&self) -> Option<ColumnCoord> {
        self.center
    }

    /// Records `center` and returns the plan without touching the store.
    pub fn plan(&mut self, center: ColumnCoord, store: &ChunkStore) -> StreamDelta {
        self.center = Some(center);
        plan_stream(center, self.radius, store.column_coords())
    }

    /// Ensures every required column and drops every column out of range.
    pub fn on_viewer_moved<D: BuildDispatch + ?Sized>(
        &mut self,
        center: ColumnCoord,
        store: &mut ChunkStore,
        dispatch: &mut D,
    ) -> StreamDelta {
        let delta = self.plan(center, store);
        for &col in &delta.loaded {
            store.ensure_column(col, dispatch);
        }
        for &col in &delta.unloaded {
            store.drop_column(col);
        }
        if !delta.is_empty() {
            log::debug!(
                "stream at {:?} r={}: +{} -{}",
                center,
                self.radius,
                delta.loaded.len(),
                delta.unloaded.len()
            );
        }
        delta
    }

    /// Changes the radius for the next plan and returns the value actually used.
    pub fn set_radius(&mut self, radius: u32) -> u32 {
        self.radius = clamp_radius(radius);
        self.radius
    }
}

fn clamp_radius(radius: u32) -> u32 {
    if radius > MAX_STREAM_RADIUS {
        log::warn!(
            "stream radius {} clamped to {}",
            radius,
            MAX_STREAM_RADIUS
        );
    }
    radius.min(MAX_STREAM_RADIUS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_two_is_five_by_five() {
        let cols = columns_in_radius(ColumnCoord::new(0, 0), 2);
        assert_eq!(cols.len(), 25);
        assert_eq!(cols[0], ColumnCoord::new(0, 0));
        assert!(cols.iter().all(|c| c.cx.abs() <= 2 && c.cz.abs() <= 2));
    }

    #[test]
    fn radius_zero_is_single_column() {
        assert_eq!(
            columns_in_radius(ColumnCoord::new(4, -4), 0),
            vec![ColumnCoord::new(4, -4)]
        );
    }

    #[test]
    fn plan_from_empty_loads_all() {
        let d = plan_stream(ColumnCoord::new(0, 0), 1, std::iter::empty());
        assert_eq!(d.loaded.len(), 9);
        assert!(d.unloaded.is_empty());
    }

    #[test]
    fn huge_radius_is_clamped() {
        let cols = columns_in_radius(ColumnCoord::new(0, 0), u32::MAX);
        let side = (2 * MAX_STREAM_RADIUS + 1) as usize;
        assert_eq!(cols.len(), side * side);
        let d = plan_stream(ColumnCoord::new(0, 0), u32::MAX, std::iter::empty());
        assert_eq!(d.loaded.len(), side * side);

        let mut policy = StreamingPolicy::new(u32::MAX);
        assert_eq!(policy.radius(), MAX_STREAM_RADIUS);
        assert_eq!(policy.set_radius(3), 3);
        assert_eq!(policy.set_radius(1_000_000), MAX_STREAM_RADIUS);
    }
}
