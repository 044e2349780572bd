/*!
Spatial query service consumed by the clamper.

The clamper registers vertical probe segments, runs them in one bulk query and
then reads back every intersection per segment. Backends:

- [`SurfaceFnIsector`]: analytic surface described by a closure (procedural
  terrain, tests).
- [`RapierIsector`](crate::rapier_world::RapierIsector): static Rapier collider set.

Both keep their segment and hit storage in a [`SegmentBatch`] that is reset, not
reallocated, between ticks.
*/

use crate::{
    settings::DEFAULT_BATCH_CAPACITY,
    types::{Hit, Vec3},
};

/// Index of a segment registered with a [`SpatialQuery`] since its last reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SegmentHandle(pub usize);

/// Bulk segment-vs-surface intersection service.
pub trait SpatialQuery {
    /// Register a probe segment for the next [`query`](SpatialQuery::query).
    fn add_segment(&mut self, start: Vec3, end: Vec3) -> SegmentHandle;

    /// Run every pending segment. Returns whether any segment hit anything.
    fn query(&mut self) -> bool;

    /// All intersections along a segment from the last query, in no particular order.
    fn hit_list(&self, handle: SegmentHandle) -> &[Hit];

    /// Drop all segments and results.
    fn reset(&mut self);

    /// Whether there is any surface to query at all.
    fn has_surface(&self) -> bool;

    fn segment_count(&self) -> usize;
}

/// Reusable segment and hit storage shared by query backends.
#[derive(Clone, Debug, Default)]
pub struct SegmentBatch {
    segments: Vec<(Vec3, Vec3)>,
    hits: Vec<Vec<Hit>>,
}

impl SegmentBatch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            segments: Vec::with_capacity(capacity),
            hits: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, start: Vec3, end: Vec3) -> SegmentHandle {
        let index = self.segments.len();
        self.segments.push((start, end));
        if self.hits.len() <= index {
            self.hits.push(Vec::new());
        }
        self.hits[index].clear();
        SegmentHandle(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Keeps the per-segment hit buffers for reuse.
    pub fn clear(&mut self) {
        self.segments.clear();
        for hits in &mut self.hits {
            hits.clear();
        }
    }

    pub fn hits(&self, handle: SegmentHandle) -> &[Hit] {
        if handle.0 >= self.segments.len() {
            return &[];
        }
        self.hits.get(handle.0).map_or(&[][..], Vec::as_slice)
    }

    /// Fill every segment's hit list with `intersect` and report whether any hit was found.
    pub fn run(&mut self, mut intersect: impl FnMut(Vec3, Vec3, &mut Vec<Hit>)) -> bool {
        let mut any = false;
        for (i, &(start, end)) in self.segments.iter().enumerate() {
            let hits = &mut self.hits[i];
            hits.clear();
            intersect(start, end, hits);
            any |= !hits.is_empty();
        }
        any
    }
}

/// Query backend over an analytic surface.
///
/// The closure receives a world `(x, y)` column and pushes every surface crossing
/// in that column. Crossings outside the segment's Z span are discarded, so the
/// closure never needs to know the segment bounds. Segments are treated as
/// vertical and sampled at their start column.
#[derive(Clone)]
pub struct SurfaceFnIsector<F> {
    surface: F,
    batch: SegmentBatch,
    active: bool,
}

impl<F> SurfaceFnIsector<F>
where
    F: Fn(f32, f32, &mut Vec<Hit>),
{
    pub fn new(surface: F) -> Self {
        Self {
            surface,
            batch: SegmentBatch::with_capacity(DEFAULT_BATCH_CAPACITY),
            active: true,
        }
    }

    /// Enable or disable the surface without dropping the backend
    /// (e.g. terrain not loaded yet).
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

impl<F> SpatialQuery for SurfaceFnIsector<F>
where
    F: Fn(f32, f32, &mut Vec<Hit>),
{
    fn add_segment(&mut self, start: Vec3, end: Vec3) -> SegmentHandle {
        self.batch.push(start, end)
    }

    fn query(&mut self) -> bool {
        if !self.active || self.batch.is_empty() {
            return false;
        }
        let surface = &self.surface;
        self.batch.run(|start, end, hits| {
            let lo = start.z.min(end.z);
            let hi = start.z.max(end.z);
            surface(start.x, start.y, hits);
            hits.retain(|h| h.point.z >= lo && h.point.z <= hi);
        })
    }

    fn hit_list(&self, handle: SegmentHandle) -> &[Hit] {
        self.batch.hits(handle)
    }

    fn reset(&mut self) {
        self.batch.clear();
    }

    fn has_surface(&self) -> bool {
        self.active
    }

    fn segment_count(&self) -> usize {
        self.batch.len()
    }
}

/// Infinite horizontal plane at `height`.
pub fn flat_surface(height: f32) -> SurfaceFnIsector<impl Fn(f32, f32, &mut Vec<Hit>) + Clone> {
    SurfaceFnIsector::new(move |x: f32, y: f32, hits: &mut Vec<Hit>| {
        hits.push(Hit::new(Vec3::new(x, y, height), Vec3::z()));
    })
}
