//! Chunked range storage.
//!
//! A chunk holds up to 250 ranges in parallel arrays, positions relative to
//! the chunk's start so an unchanged chunk can be reused at a new absolute
//! position. `max_point` lets cursors skip whole chunks when a caller only
//! wants point ranges of a minimum size.

use crate::{range::RangeValue, FAR_SIDE};
use marten_change::ChangeDesc;

/// Ranges per chunk.
pub(crate) const CHUNK_SIZE: usize = 250;

#[derive(Debug)]
pub(crate) struct Chunk<V> {
    pub(crate) from: Vec<usize>,
    pub(crate) to: Vec<usize>,
    pub(crate) value: Vec<V>,
    /// Largest `to - from` among point values, or -1 when there are none.
    pub(crate) max_point: i64,
}

impl<V: RangeValue> Chunk<V> {
    /// Offset of the chunk's end relative to its start.
    pub(crate) fn length(&self) -> usize {
        self.to.last().copied().unwrap_or(0)
    }

    /// Binary search for the index of `pos`/`side` among the ranges'
    /// `from` ends (`end == false`) or `to` ends (`end == true`).
    pub(crate) fn find_index(&self, pos: i64, side: i32, end: bool, start_at: usize) -> usize {
        let arr = if end { &self.to } else { &self.from };
        let mut lo = start_at;
        let mut hi = arr.len();
        loop {
            if lo == hi {
                return lo;
            }
            let mid = (lo + hi) >> 1;
            let entry_side = if end {
                self.value[mid].end_side()
            } else {
                self.value[mid].start_side()
            };
            let diff = if arr[mid] as i64 != pos {
                arr[mid] as i64 - pos
            } else {
                (entry_side - side) as i64
            };
            if mid == lo {
                return if diff >= 0 { lo } else { hi };
            }
            if diff >= 0 {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
    }

    /// Call `f` for the ranges touching `from..=to` (chunk-relative).
    /// Returns false when the callback stopped the walk.
    pub(crate) fn between(
        &self,
        offset: usize,
        from: i64,
        to: i64,
        f: &mut dyn FnMut(usize, usize, &V) -> bool,
    ) -> bool {
        let start = self.find_index(from, -FAR_SIDE, true, 0);
        let end = self.find_index(to, FAR_SIDE, false, start);
        for i in start..end {
            if !f(self.from[i] + offset, self.to[i] + offset, &self.value[i]) {
                return false;
            }
        }
        true
    }

    /// Map every range through a change description. Ranges that the
    /// mapping deletes or collapses are dropped, as are ranges whose
    /// positions do not fit the description at all. Returns the rebuilt
    /// chunk (None when nothing survived) and its new absolute position.
    pub(crate) fn map(&self, offset: usize, changes: &ChangeDesc) -> (Option<Chunk<V>>, i64) {
        let changes_len = changes.len();
        let mut value = Vec::new();
        let mut from = Vec::new();
        let mut to = Vec::new();
        let mut new_pos: i64 = -1;
        let mut max_point: i64 = -1;
        for i in 0..self.value.len() {
            let val = &self.value[i];
            let cur_from = self.from[i] + offset;
            let cur_to = self.to[i] + offset;
            if cur_to > changes_len {
                continue;
            }
            let (new_from, new_to);
            if cur_from == cur_to {
                let Some(mapped) = changes.map_pos_mode(cur_from, val.start_side(), val.map_mode())
                else {
                    continue;
                };
                new_from = mapped;
                if val.start_side() != val.end_side() {
                    let end = changes.map_pos(cur_from, val.end_side());
                    if end < new_from {
                        continue;
                    }
                    new_to = end;
                } else {
                    new_to = mapped;
                }
            } else {
                new_from = changes.map_pos(cur_from, val.start_side());
                new_to = changes.map_pos(cur_to, val.end_side());
                if new_from > new_to
                    || (new_from == new_to && val.start_side() > 0 && val.end_side() <= 0)
                {
                    continue;
                }
            }
            if new_to == new_from && val.end_side() < val.start_side() {
                continue;
            }
            if new_pos < 0 {
                new_pos = new_from as i64;
            }
            if val.is_point() {
                max_point = max_point.max((new_to - new_from) as i64);
            }
            value.push(val.clone());
            from.push(new_from - new_pos as usize);
            to.push(new_to - new_pos as usize);
        }
        let mapped = if value.is_empty() {
            None
        } else {
            Some(Chunk {
                from,
                to,
                value,
                max_point,
            })
        };
        (mapped, new_pos)
    }
}
