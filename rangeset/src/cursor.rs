//! The cursor hierarchy: a layer cursor per set layer, a heap merging
//! layer cursors, and a span cursor translating the merged range stream
//! into covered spans and points.

use crate::{
    chunk::Chunk,
    range::RangeValue,
    set::{RangeSet, SetInner},
    FAR, FAR_SIDE,
};
use rustc_hash::FxHashSet;
use std::{cmp::Ordering, collections::BinaryHeap, sync::Arc};

/// Identity set of chunks both sides of a comparison share; skipped whole.
pub(crate) type SharedChunks = FxHashSet<usize>;

pub(crate) fn chunk_id<V>(chunk: &Arc<Chunk<V>>) -> usize {
    Arc::as_ptr(chunk) as *const () as usize
}

/// Walks the chunks of a single layer in order, skipping shared chunks,
/// chunks before the target, and chunks without big-enough points.
pub(crate) struct LayerCursor<'a, V: RangeValue> {
    layer: &'a SetInner<V>,
    skip: Option<&'a SharedChunks>,
    min_point: i64,
    pub(crate) rank: usize,
    pub(crate) chunk_index: usize,
    pub(crate) range_index: usize,
    pub(crate) from: i64,
    pub(crate) to: i64,
    pub(crate) value: Option<&'a V>,
}

impl<'a, V: RangeValue> LayerCursor<'a, V> {
    pub(crate) fn new(
        layer: &'a SetInner<V>,
        skip: Option<&'a SharedChunks>,
        min_point: i64,
        rank: usize,
    ) -> Self {
        LayerCursor {
            layer,
            skip,
            min_point,
            rank,
            chunk_index: 0,
            range_index: 0,
            from: FAR,
            to: FAR,
            value: None,
        }
    }

    pub(crate) fn start_side(&self) -> i32 {
        self.value.map_or(0, V::start_side)
    }

    pub(crate) fn end_side(&self) -> i32 {
        self.value.map_or(0, V::end_side)
    }

    fn chunk_end(&self, index: usize) -> i64 {
        (self.layer.chunk_pos[index] + self.layer.chunks[index].length()) as i64
    }

    fn is_skipped(&self, index: usize) -> bool {
        self.skip
            .is_some_and(|skip| skip.contains(&chunk_id(&self.layer.chunks[index])))
    }

    pub(crate) fn goto(&mut self, pos: i64, side: i32) -> &mut Self {
        self.chunk_index = 0;
        self.range_index = 0;
        self.goto_inner(pos, side, false);
        self
    }

    fn goto_inner(&mut self, pos: i64, side: i32, mut forward: bool) {
        while self.chunk_index < self.layer.chunks.len() {
            let chunk = &self.layer.chunks[self.chunk_index];
            if !(self.is_skipped(self.chunk_index)
                || self.chunk_end(self.chunk_index) < pos
                || chunk.max_point < self.min_point)
            {
                break;
            }
            self.chunk_index += 1;
            forward = false;
        }
        if self.chunk_index < self.layer.chunks.len() {
            let range_index = self.layer.chunks[self.chunk_index].find_index(
                pos - self.layer.chunk_pos[self.chunk_index] as i64,
                side,
                true,
                0,
            );
            if !forward || self.range_index < range_index {
                self.set_range_index(range_index);
            }
        }
        self.next();
    }

    pub(crate) fn forward(&mut self, pos: i64, side: i32) {
        if (self.to, self.end_side()) < (pos, side) {
            self.goto_inner(pos, side, true);
        }
    }

    pub(crate) fn next(&mut self) {
        loop {
            if self.chunk_index == self.layer.chunks.len() {
                self.from = FAR;
                self.to = FAR;
                self.value = None;
                break;
            }
            let chunk_pos = self.layer.chunk_pos[self.chunk_index] as i64;
            let chunk = &self.layer.chunks[self.chunk_index];
            let index = self.range_index;
            self.from = chunk_pos + chunk.from[index] as i64;
            self.to = chunk_pos + chunk.to[index] as i64;
            self.value = Some(&chunk.value[index]);
            self.set_range_index(index + 1);
            if self.min_point < 0
                || (chunk.value[index].is_point() && self.to - self.from >= self.min_point)
            {
                break;
            }
        }
    }

    fn set_range_index(&mut self, index: usize) {
        if index == self.layer.chunks[self.chunk_index].value.len() {
            self.chunk_index += 1;
            if self.skip.is_some() {
                while self.chunk_index < self.layer.chunks.len()
                    && self.is_skipped(self.chunk_index)
                {
                    self.chunk_index += 1;
                }
            }
            self.range_index = 0;
        } else {
            self.range_index = index;
        }
    }

    pub(crate) fn next_chunk(&mut self) {
        self.chunk_index += 1;
        self.range_index = 0;
        self.next();
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.from
            .cmp(&other.from)
            .then(self.start_side().cmp(&other.start_side()))
            .then(self.rank.cmp(&other.rank))
            .then(self.to.cmp(&other.to))
            .then(self.end_side().cmp(&other.end_side()))
    }
}

/// A layer cursor keyed for the merge heap. `BinaryHeap` pops its maximum,
/// so the ordering is flipped to surface the smallest
/// `(from, start_side, rank, to, end_side)` first.
struct HeapEntry<'a, V: RangeValue>(LayerCursor<'a, V>);

impl<V: RangeValue> Ord for HeapEntry<'_, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.compare(&self.0)
    }
}

impl<V: RangeValue> PartialOrd for HeapEntry<'_, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V: RangeValue> PartialEq for HeapEntry<'_, V> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<V: RangeValue> Eq for HeapEntry<'_, V> {}

/// Merges layer cursors from any number of sets in
/// `(from, start_side, rank, to, end_side)` order.
pub(crate) struct HeapCursor<'a, V: RangeValue> {
    /// Cursors that still have a range loaded.
    heap: BinaryHeap<HeapEntry<'a, V>>,
    /// Exhausted cursors, parked so a later `goto` can rewind them.
    parked: Vec<LayerCursor<'a, V>>,
    pub(crate) from: i64,
    pub(crate) to: i64,
    pub(crate) value: Option<&'a V>,
    /// Index of the set the current range came from; -1 when exhausted.
    pub(crate) rank: i64,
}

impl<'a, V: RangeValue> HeapCursor<'a, V> {
    pub(crate) fn from_sets(
        sets: impl IntoIterator<Item = &'a RangeSet<V>>,
        skip: Option<&'a SharedChunks>,
        min_point: i64,
    ) -> Self {
        let mut parked = Vec::new();
        for (rank, set) in sets.into_iter().enumerate() {
            let mut layer = set;
            while !layer.is_empty() {
                if layer.inner().max_point >= min_point {
                    parked.push(LayerCursor::new(layer.inner(), skip, min_point, rank));
                }
                match layer.inner().next_layer.as_ref() {
                    Some(next) => layer = next,
                    None => break,
                }
            }
        }
        HeapCursor {
            heap: BinaryHeap::new(),
            parked,
            from: FAR,
            to: FAR,
            value: None,
            rank: -1,
        }
    }

    pub(crate) fn start_side(&self) -> i32 {
        self.value.map_or(0, V::start_side)
    }

    /// Reposition every cursor, live or parked, then reload the smallest.
    pub(crate) fn goto(&mut self, pos: i64, side: i32) -> &mut Self {
        let mut cursors: Vec<LayerCursor<'a, V>> = std::mem::take(&mut self.heap)
            .into_iter()
            .map(|entry| entry.0)
            .collect();
        cursors.append(&mut self.parked);
        for mut cursor in cursors {
            cursor.goto(pos, side);
            self.place(cursor);
        }
        self.next();
        self
    }

    pub(crate) fn forward(&mut self, pos: i64, side: i32) {
        let cursors: Vec<LayerCursor<'a, V>> = std::mem::take(&mut self.heap)
            .into_iter()
            .map(|entry| entry.0)
            .collect();
        for mut cursor in cursors {
            cursor.forward(pos, side);
            self.place(cursor);
        }
        let end_side = self.value.map_or(0, V::end_side);
        if (self.to, end_side) < (pos, side) {
            self.next();
        }
    }

    /// Load the smallest cursor's range, then advance that cursor.
    pub(crate) fn next(&mut self) {
        match self.heap.pop() {
            None => {
                self.from = FAR;
                self.to = FAR;
                self.value = None;
                self.rank = -1;
            },
            Some(HeapEntry(mut top)) => {
                self.from = top.from;
                self.to = top.to;
                self.value = top.value;
                self.rank = top.rank as i64;
                top.next();
                self.place(top);
            },
        }
    }

    fn place(&mut self, cursor: LayerCursor<'a, V>) {
        if cursor.value.is_some() {
            self.heap.push(HeapEntry(cursor));
        } else {
            self.parked.push(cursor);
        }
    }
}

/// Converts the ordered range stream into alternating spans (regions
/// covered by a set of active non-point values) and points.
pub(crate) struct SpanCursor<'a, V: RangeValue> {
    cursor: HeapCursor<'a, V>,
    /// Open non-point values, sorted by `(rank, to)`.
    pub(crate) active: Vec<&'a V>,
    active_to: Vec<i64>,
    active_rank: Vec<i64>,
    /// Index into `active` of the entry ending first, or -1.
    min_active: i64,
    pub(crate) point: Option<&'a V>,
    pub(crate) point_from: i64,
    pub(crate) point_rank: i64,
    pub(crate) to: i64,
    pub(crate) end_side: i32,
    /// Number of active ranges already open when iteration began;
    /// computed on the first advance.
    pub(crate) open_start: i64,
}

impl<'a, V: RangeValue> SpanCursor<'a, V> {
    pub(crate) fn new(
        sets: impl IntoIterator<Item = &'a RangeSet<V>>,
        skip: Option<&'a SharedChunks>,
        min_point: i64,
    ) -> Self {
        SpanCursor {
            cursor: HeapCursor::from_sets(sets, skip, min_point),
            active: Vec::new(),
            active_to: Vec::new(),
            active_rank: Vec::new(),
            min_active: -1,
            point: None,
            point_from: 0,
            point_rank: 0,
            to: -FAR,
            end_side: 0,
            open_start: -1,
        }
    }

    pub(crate) fn goto(&mut self, pos: i64, side: i32) -> &mut Self {
        self.cursor.goto(pos, side);
        self.active.clear();
        self.active_to.clear();
        self.active_rank.clear();
        self.min_active = -1;
        self.to = pos;
        self.end_side = side;
        self.open_start = -1;
        self.next();
        self
    }

    fn forward(&mut self, pos: i64, side: i32) {
        while self.min_active > -1 {
            let a = self.min_active as usize;
            if (self.active_to[a], self.active[a].end_side()) >= (pos, side) {
                break;
            }
            self.remove_active(a);
        }
        self.cursor.forward(pos, side);
    }

    fn remove_active(&mut self, index: usize) {
        self.active.remove(index);
        self.active_to.remove(index);
        self.active_rank.remove(index);
        self.min_active = find_min_index(&self.active, &self.active_to);
    }

    fn add_active(&mut self, track_open: Option<&mut Vec<i64>>) {
        let value = self.cursor.value.expect("a range is loaded");
        let to = self.cursor.to;
        let rank = self.cursor.rank;
        let mut i = 0;
        while i < self.active_rank.len() && (rank, to) > (self.active_rank[i], self.active_to[i]) {
            i += 1;
        }
        self.active.insert(i, value);
        self.active_to.insert(i, to);
        self.active_rank.insert(i, rank);
        if let Some(open) = track_open {
            open.insert(i, self.cursor.from);
        }
        self.min_active = find_min_index(&self.active, &self.active_to);
    }

    /// Advance to the next span boundary. Afterwards, either `point` is set
    /// and the region up to `to` is that point, or the region up to `to` is
    /// covered by `active`.
    pub(crate) fn next(&mut self) {
        let from = self.to;
        let was_point = self.point;
        self.point = None;
        let mut track_open: Option<Vec<i64>> = if self.open_start < 0 {
            Some(Vec::new())
        } else {
            None
        };
        loop {
            let a = self.min_active;
            if a > -1
                && (self.active_to[a as usize], self.active[a as usize].end_side())
                    < (self.cursor.from, self.cursor.start_side())
            {
                if self.active_to[a as usize] > from {
                    self.to = self.active_to[a as usize];
                    self.end_side = self.active[a as usize].end_side();
                    break;
                }
                self.remove_active(a as usize);
                if let Some(open) = track_open.as_mut() {
                    open.remove(a as usize);
                }
            } else if self.cursor.value.is_none() {
                self.to = FAR;
                self.end_side = FAR_SIDE;
                break;
            } else if self.cursor.from > from {
                self.to = self.cursor.from;
                self.end_side = self.cursor.start_side();
                break;
            } else {
                let next_val = self.cursor.value.expect("a range is loaded");
                if !next_val.is_point() {
                    self.add_active(track_open.as_mut());
                    self.cursor.next();
                } else if was_point.is_some()
                    && self.cursor.to == self.to
                    && self.cursor.from < self.cursor.to
                {
                    // A non-empty point ending exactly where the previous
                    // point ended is shadowed.
                    self.cursor.next();
                } else {
                    self.point = Some(next_val);
                    self.point_from = self.cursor.from;
                    self.point_rank = self.cursor.rank;
                    self.to = self.cursor.to;
                    self.end_side = next_val.end_side();
                    self.cursor.next();
                    let (to, end_side) = (self.to, self.end_side);
                    self.forward(to, end_side);
                    break;
                }
            }
        }
        if let Some(open) = track_open {
            self.open_start = 0;
            for i in (0..open.len()).rev() {
                if open[i] < from {
                    self.open_start += 1;
                } else {
                    break;
                }
            }
        }
    }

    /// The active values that apply at a point ending at `to`: those with
    /// rank at least the point's, extending past it (or ending exactly at
    /// it with an end side no smaller than the point's).
    pub(crate) fn active_for_point(&self, to: i64) -> Vec<&'a V> {
        if self.active.is_empty() {
            return Vec::new();
        }
        let point_end_side = self.point.map_or(0, V::end_side);
        let mut active = Vec::new();
        for i in (0..self.active.len()).rev() {
            if self.active_rank[i] < self.point_rank {
                break;
            }
            if self.active_to[i] > to
                || (self.active_to[i] == to && self.active[i].end_side() >= point_end_side)
            {
                active.push(self.active[i]);
            }
        }
        active.reverse();
        active
    }

    /// How many active ranges extend past `to`.
    pub(crate) fn open_end(&self, to: i64) -> usize {
        let mut open = 0;
        for i in (0..self.active_to.len()).rev() {
            if self.active_to[i] > to {
                open += 1;
            } else {
                break;
            }
        }
        open
    }
}

fn find_min_index<V: RangeValue>(values: &[&V], tos: &[i64]) -> i64 {
    let mut found: i64 = -1;
    let mut found_pos = FAR;
    let mut found_side = FAR_SIDE;
    for i in 0..tos.len() {
        if (tos[i], values[i].end_side()) < (found_pos, found_side) {
            found = i as i64;
            found_pos = tos[i];
            found_side = values[i].end_side();
        }
    }
    found
}

/// Ordered cursor over the ranges of one or more sets, merged across
/// layers. Obtained from [`RangeSet::iter`] and [`RangeSet::iter_sets`].
pub struct RangeCursor<'a, V: RangeValue> {
    pub(crate) heap: HeapCursor<'a, V>,
}

impl<'a, V: RangeValue> RangeCursor<'a, V> {
    /// The current range's value, or None when the cursor is exhausted.
    pub fn value(&self) -> Option<&'a V> {
        self.heap.value
    }

    pub fn from(&self) -> usize {
        self.heap.from.max(0) as usize
    }

    pub fn to(&self) -> usize {
        self.heap.to.max(0) as usize
    }

    /// Move to the next range in `(from, start_side, rank)` order.
    pub fn advance(&mut self) {
        self.heap.next();
    }
}

impl<'a, V: RangeValue> Iterator for RangeCursor<'a, V> {
    type Item = (usize, usize, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.heap.value?;
        let item = (self.from(), self.to(), value);
        self.heap.next();
        Some(item)
    }
}
