use crate::{
    chunk::{Chunk, CHUNK_SIZE},
    range::RangeValue,
    set::{RangeSet, SetInner},
    FAR,
};
use std::sync::Arc;
use tracing::trace;

/// Incrementally builds a [`RangeSet`] from ranges supplied in
/// `(from, start_side)` order. Ranges that cannot be appended in-order into
/// the current layer spill into a nested builder for the next layer.
///
/// A builder is one-shot: [`finish`](RangeSetBuilder::finish) consumes it.
pub struct RangeSetBuilder<V: RangeValue> {
    chunks: Vec<Arc<Chunk<V>>>,
    chunk_pos: Vec<usize>,
    /// Absolute position of the open chunk, -1 when none is open.
    chunk_start: i64,
    last: Option<V>,
    last_from: i64,
    last_to: i64,
    from: Vec<usize>,
    to: Vec<usize>,
    value: Vec<V>,
    max_point: i64,
    set_max_point: i64,
    next_layer: Option<Box<RangeSetBuilder<V>>>,
}

impl<V: RangeValue> Default for RangeSetBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: RangeValue> RangeSetBuilder<V> {
    pub fn new() -> Self {
        RangeSetBuilder {
            chunks: Vec::new(),
            chunk_pos: Vec::new(),
            chunk_start: -1,
            last: None,
            last_from: -FAR,
            last_to: -FAR,
            from: Vec::new(),
            to: Vec::new(),
            value: Vec::new(),
            max_point: -1,
            set_max_point: -1,
            next_layer: None,
        }
    }

    /// Add a range. Ranges must arrive sorted by `(from, start_side)`;
    /// out-of-order input panics. A range that merely overlaps the previous
    /// one spills into the next layer.
    pub fn add(&mut self, from: usize, to: usize, value: V) {
        if !self.add_inner(from, to, value.clone()) {
            trace!(from, to, "range spills into next layer");
            self.next_layer
                .get_or_insert_with(|| Box::new(RangeSetBuilder::new()))
                .add(from, to, value);
        }
    }

    /// Try to append into this layer; false means the range belongs in a
    /// deeper layer.
    pub(crate) fn add_inner(&mut self, from: usize, to: usize, value: V) -> bool {
        let last_end_side = self.last.as_ref().map_or(0, V::end_side);
        let last_start_side = self.last.as_ref().map_or(0, V::start_side);
        let diff = if from as i64 != self.last_to {
            from as i64 - self.last_to
        } else {
            (value.start_side() - last_end_side) as i64
        };
        if diff <= 0 && (from as i64, value.start_side()) < (self.last_from, last_start_side) {
            panic!("ranges must be added sorted by `from` position and `start_side`");
        }
        if diff < 0 {
            return false;
        }
        if self.from.len() == CHUNK_SIZE {
            self.finish_chunk();
        }
        if self.chunk_start < 0 {
            self.chunk_start = from as i64;
        }
        let chunk_start = self.chunk_start as usize;
        self.from.push(from - chunk_start);
        self.to.push(to - chunk_start);
        self.last_from = from as i64;
        self.last_to = to as i64;
        if value.is_point() {
            self.max_point = self.max_point.max((to - from) as i64);
        }
        self.last = Some(value.clone());
        self.value.push(value);
        true
    }

    /// Append a whole prebuilt chunk by reference; false when it would be
    /// out of order for this layer.
    pub(crate) fn add_chunk(&mut self, from: usize, chunk: Arc<Chunk<V>>) -> bool {
        let last_end_side = self.last.as_ref().map_or(0, V::end_side);
        let diff = if from as i64 != self.last_to {
            from as i64 - self.last_to
        } else {
            (chunk.value[0].start_side() - last_end_side) as i64
        };
        if diff < 0 {
            return false;
        }
        if !self.from.is_empty() {
            self.finish_chunk();
        }
        self.set_max_point = self.set_max_point.max(chunk.max_point);
        let last = chunk.value.len() - 1;
        self.last = Some(chunk.value[last].clone());
        self.last_from = (chunk.from[last] + from) as i64;
        self.last_to = (chunk.to[last] + from) as i64;
        self.chunk_pos.push(from);
        self.chunks.push(chunk);
        true
    }

    fn finish_chunk(&mut self) {
        self.chunks.push(Arc::new(Chunk {
            from: std::mem::take(&mut self.from),
            to: std::mem::take(&mut self.to),
            value: std::mem::take(&mut self.value),
            max_point: self.max_point,
        }));
        self.chunk_pos.push(self.chunk_start as usize);
        self.chunk_start = -1;
        self.set_max_point = self.set_max_point.max(self.max_point);
        self.max_point = -1;
    }

    /// Finish the set, consuming the builder.
    pub fn finish(self) -> RangeSet<V> {
        self.finish_inner(RangeSet::empty())
    }

    pub(crate) fn finish_inner(mut self, next: RangeSet<V>) -> RangeSet<V> {
        if !self.from.is_empty() {
            self.finish_chunk();
        }
        if self.chunks.is_empty() {
            return next;
        }
        let next_layer = match self.next_layer {
            Some(builder) => builder.finish_inner(next),
            None => next,
        };
        RangeSet::from_inner(SetInner {
            chunk_pos: self.chunk_pos,
            chunks: self.chunks,
            next_layer: if next_layer.is_empty() {
                None
            } else {
                Some(next_layer)
            },
            max_point: self.set_max_point,
        })
    }
}
