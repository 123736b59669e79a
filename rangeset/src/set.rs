//! Layered, immutable sets of tagged ranges.
//!
//! A set stores its ranges in position-sorted chunks. Ranges that cannot be
//! stored in sorted order within one layer (because they start inside a
//! previous range) live in a next layer, recursively; cursors merge the
//! layers back into one ordered stream. Every "modifying" operation returns
//! a new set sharing chunks with the old one wherever possible.

use crate::{
    builder::RangeSetBuilder,
    chunk::Chunk,
    compare::{compare_spans, find_shared_chunks, RangeComparator, SpanIterator},
    cursor::{HeapCursor, LayerCursor, RangeCursor, SpanCursor},
    range::{cmp_range, Range, RangeValue},
    FAR, FAR_SIDE,
};
use marten_change::{ChangeDesc, Touches};
use std::sync::Arc;
use tracing::trace;

pub(crate) struct SetInner<V: RangeValue> {
    pub(crate) chunk_pos: Vec<usize>,
    pub(crate) chunks: Vec<Arc<Chunk<V>>>,
    pub(crate) next_layer: Option<RangeSet<V>>,
    /// Largest point size in this layer's chunks, -1 when there are none.
    pub(crate) max_point: i64,
}

/// An immutable collection of ranges. Cloning is reference-count only.
pub struct RangeSet<V: RangeValue>(Arc<SetInner<V>>);

impl<V: RangeValue> Clone for RangeSet<V> {
    fn clone(&self) -> Self {
        RangeSet(Arc::clone(&self.0))
    }
}

/// Arguments to [`RangeSet::update`].
pub struct UpdateSpec<'a, V> {
    /// Ranges to add, sorted by `(from, start_side)` unless `sort` is set.
    pub add: Vec<Range<V>>,
    pub sort: bool,
    /// When present, existing ranges within the filter window are kept only
    /// if the callback returns true.
    pub filter: Option<Box<dyn FnMut(usize, usize, &V) -> bool + 'a>>,
    pub filter_from: usize,
    /// Defaults to the set's length.
    pub filter_to: Option<usize>,
}

impl<V> Default for UpdateSpec<'_, V> {
    fn default() -> Self {
        UpdateSpec {
            add: Vec::new(),
            sort: false,
            filter: None,
            filter_from: 0,
            filter_to: None,
        }
    }
}

impl<V: RangeValue> RangeSet<V> {
    /// The empty set.
    pub fn empty() -> RangeSet<V> {
        RangeSet(Arc::new(SetInner {
            chunk_pos: Vec::new(),
            chunks: Vec::new(),
            next_layer: None,
            max_point: -1,
        }))
    }

    pub(crate) fn from_inner(inner: SetInner<V>) -> RangeSet<V> {
        RangeSet(Arc::new(inner))
    }

    pub(crate) fn inner(&self) -> &SetInner<V> {
        &self.0
    }

    /// Build a set from ranges, which must be sorted by `(from,
    /// start_side)` unless `sort` is set.
    pub fn of(ranges: impl IntoIterator<Item = Range<V>>, sort: bool) -> RangeSet<V> {
        let mut ranges: Vec<Range<V>> = ranges.into_iter().collect();
        if sort {
            ranges.sort_by(cmp_range);
        }
        let mut builder = RangeSetBuilder::new();
        for range in ranges {
            builder.add(range.from, range.to, range.value);
        }
        builder.finish()
    }

    /// Identity comparison; empty sets are only interchangeable through
    /// their structure, not their identity.
    pub fn same(&self, other: &RangeSet<V>) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.chunks.is_empty() && self.0.next_layer.is_none()
    }

    /// The end of the last range in the set.
    pub fn len(&self) -> usize {
        let own = match self.0.chunk_pos.last() {
            Some(&pos) => pos + self.0.chunks.last().expect("parallel arrays").length(),
            None => 0,
        };
        own.max(self.0.next_layer.as_ref().map_or(0, RangeSet::len))
    }

    /// Total number of ranges, across all layers.
    pub fn size(&self) -> usize {
        let mut size = self.0.next_layer.as_ref().map_or(0, RangeSet::size);
        for chunk in &self.0.chunks {
            size += chunk.value.len();
        }
        size
    }

    fn chunk_end(&self, index: usize) -> usize {
        self.0.chunk_pos[index] + self.0.chunks[index].length()
    }

    /// A new set with ranges filtered out and added. Chunks the update does
    /// not touch are reused by reference.
    pub fn update(&self, spec: UpdateSpec<'_, V>) -> RangeSet<V> {
        let UpdateSpec {
            mut add,
            sort,
            mut filter,
            filter_from,
            filter_to,
        } = spec;
        let filter_to = filter_to.unwrap_or_else(|| self.len());
        if add.is_empty() && filter.is_none() {
            return self.clone();
        }
        if sort {
            add.sort_by(cmp_range);
        }
        if self.is_empty() {
            return if add.is_empty() {
                self.clone()
            } else {
                RangeSet::of(add, false)
            };
        }
        let mut cur = LayerCursor::new(&self.0, None, -1, 0);
        cur.goto(0, -FAR_SIDE);
        let mut i = 0;
        let mut spill: Vec<Range<V>> = Vec::new();
        let mut builder = RangeSetBuilder::new();
        while cur.value.is_some() || i < add.len() {
            let take_add = i < add.len()
                && (cur.value.is_none()
                    || (cur.from, cur.start_side())
                        >= (add[i].from as i64, add[i].value.start_side()));
            if take_add {
                let range = add[i].clone();
                i += 1;
                if !builder.add_inner(range.from, range.to, range.value.clone()) {
                    spill.push(range);
                }
            } else if cur.range_index == 1
                && cur.chunk_index < self.0.chunks.len()
                && (i == add.len() || self.chunk_end(cur.chunk_index) < add[i].from)
                && (filter.is_none()
                    || filter_from > self.chunk_end(cur.chunk_index)
                    || filter_to < self.0.chunk_pos[cur.chunk_index])
                && builder.add_chunk(
                    self.0.chunk_pos[cur.chunk_index],
                    Arc::clone(&self.0.chunks[cur.chunk_index]),
                )
            {
                cur.next_chunk();
            } else {
                let (from, to) = (cur.from as usize, cur.to as usize);
                let value = cur.value.expect("loop condition guarantees a range");
                let keep = match filter.as_mut() {
                    None => true,
                    Some(f) => {
                        filter_from > to || filter_to < from || f(from, to, value)
                    },
                };
                if keep && !builder.add_inner(from, to, value.clone()) {
                    spill.push(Range {
                        from,
                        to,
                        value: value.clone(),
                    });
                }
                cur.next();
            }
        }
        let next_empty = self.0.next_layer.as_ref().map_or(true, RangeSet::is_empty);
        let next = if next_empty && spill.is_empty() {
            RangeSet::empty()
        } else {
            trace!(spilled = spill.len(), "updating next range set layer");
            let base = self
                .0
                .next_layer
                .clone()
                .unwrap_or_else(RangeSet::empty);
            base.update(UpdateSpec {
                add: spill,
                sort,
                filter,
                filter_from,
                filter_to: Some(filter_to),
            })
        };
        builder.finish_inner(next)
    }

    /// Map all range positions through a change description. Chunks the
    /// changes do not touch are reused; chunks a single replacement covers
    /// are dropped; the rest are rebuilt range by range. Ranges whose
    /// positions do not fit the description are dropped.
    pub fn map(&self, changes: &ChangeDesc) -> RangeSet<V> {
        if changes.is_empty() || self.is_empty() {
            return self.clone();
        }
        let changes_len = changes.len();
        let mut chunks = Vec::new();
        let mut chunk_pos = Vec::new();
        let mut max_point: i64 = -1;
        for i in 0..self.0.chunks.len() {
            let start = self.0.chunk_pos[i];
            let chunk = &self.0.chunks[i];
            match changes.touches_range(start, start + chunk.length()) {
                Touches::No if start <= changes_len => {
                    max_point = max_point.max(chunk.max_point);
                    chunks.push(Arc::clone(chunk));
                    chunk_pos.push(changes.map_pos(start, -1));
                },
                Touches::No | Touches::Cover => {},
                Touches::Yes => {
                    trace!(chunk = i, "rebuilding chunk touched by changes");
                    let (mapped, pos) = chunk.map(start, changes);
                    if let Some(mapped) = mapped {
                        max_point = max_point.max(mapped.max_point);
                        chunks.push(Arc::new(mapped));
                        chunk_pos.push(pos as usize);
                    }
                },
            }
        }
        let next = self
            .0
            .next_layer
            .as_ref()
            .map(|layer| layer.map(changes))
            .filter(|layer| !layer.is_empty());
        if chunks.is_empty() {
            next.unwrap_or_else(RangeSet::empty)
        } else {
            RangeSet(Arc::new(SetInner {
                chunk_pos,
                chunks,
                next_layer: next,
                max_point,
            }))
        }
    }

    /// Call `f` for every range touching `from..=to`, in no particular
    /// order. Returning false stops the walk.
    pub fn between(&self, from: usize, to: usize, mut f: impl FnMut(usize, usize, &V) -> bool) {
        self.between_inner(from, to, &mut f);
    }

    fn between_inner(
        &self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(usize, usize, &V) -> bool,
    ) -> bool {
        for i in 0..self.0.chunks.len() {
            let start = self.0.chunk_pos[i];
            let chunk = &self.0.chunks[i];
            if to >= start
                && from <= start + chunk.length()
                && !chunk.between(
                    start,
                    from as i64 - start as i64,
                    to as i64 - start as i64,
                    f,
                )
            {
                return false;
            }
        }
        match self.0.next_layer.as_ref() {
            Some(next) => next.between_inner(from, to, f),
            None => true,
        }
    }

    /// An ordered cursor over this set's ranges, starting at `from`.
    pub fn iter(&self, from: usize) -> RangeCursor<'_, V> {
        let mut heap = HeapCursor::from_sets([self], None, -1);
        heap.goto(from as i64, -FAR_SIDE);
        RangeCursor { heap }
    }

    /// An ordered cursor merging several sets; earlier sets win ordering
    /// ties (lower rank).
    pub fn iter_sets<'a>(sets: &'a [RangeSet<V>], from: usize) -> RangeCursor<'a, V> {
        let mut heap = HeapCursor::from_sets(sets.iter(), None, -1);
        heap.goto(from as i64, -FAR_SIDE);
        RangeCursor { heap }
    }

    /// Report the differences between an old and a new set configuration,
    /// through a document change described by `text_diff`, to `comparator`.
    /// With `min_point_size` zero or greater, only point ranges at least
    /// that large are considered.
    pub fn compare(
        old_sets: &[RangeSet<V>],
        new_sets: &[RangeSet<V>],
        text_diff: &ChangeDesc,
        comparator: &mut impl RangeComparator<V>,
        min_point_size: i64,
    ) {
        let relevant = |set: &&RangeSet<V>| {
            set.0.max_point > 0 || (!set.is_empty() && set.0.max_point >= min_point_size)
        };
        let a: Vec<&RangeSet<V>> = old_sets.iter().filter(relevant).collect();
        let b: Vec<&RangeSet<V>> = new_sets.iter().filter(relevant).collect();
        let shared = find_shared_chunks(&a, &b, Some(text_diff));
        let mut side_a = SpanCursor::new(a.iter().copied(), Some(&shared), min_point_size);
        let mut side_b = SpanCursor::new(b.iter().copied(), Some(&shared), min_point_size);
        text_diff.iter_gaps(|from_a, from_b, len| {
            compare_spans(&mut side_a, from_a, &mut side_b, from_b, len, comparator);
        });
        if text_diff.is_empty() && text_diff.len() == 0 {
            compare_spans(&mut side_a, 0, &mut side_b, 0, 0, comparator);
        }
    }

    /// Structural equality of two configurations over `from..=to`
    /// (defaulting to everything). Sets present in both configurations are
    /// skipped by identity.
    pub fn eq_sets(
        old_sets: &[RangeSet<V>],
        new_sets: &[RangeSet<V>],
        from: usize,
        to: Option<usize>,
    ) -> bool {
        let to = to.unwrap_or((FAR - 1) as usize) as i64;
        let a: Vec<&RangeSet<V>> = old_sets
            .iter()
            .filter(|set| !set.is_empty() && !new_sets.iter().any(|other| other.same(set)))
            .collect();
        let b: Vec<&RangeSet<V>> = new_sets
            .iter()
            .filter(|set| !set.is_empty() && !old_sets.iter().any(|other| other.same(set)))
            .collect();
        if a.len() != b.len() {
            return false;
        }
        if a.is_empty() {
            return true;
        }
        let shared = find_shared_chunks(&a, &b, None);
        let mut side_a = SpanCursor::new(a.iter().copied(), Some(&shared), -1);
        let mut side_b = SpanCursor::new(b.iter().copied(), Some(&shared), -1);
        side_a.goto(from as i64, -FAR_SIDE);
        side_b.goto(from as i64, -FAR_SIDE);
        loop {
            if side_a.to != side_b.to
                || !crate::compare::same_values(&side_a.active, &side_b.active)
                || (side_a.point.is_some()
                    && (side_b.point.is_none() || side_a.point != side_b.point))
            {
                return false;
            }
            if side_a.to > to {
                return true;
            }
            side_a.next();
            side_b.next();
        }
    }

    /// Enumerate the spans and points covering `from..to` across several
    /// sets, in order, reporting them to `iterator`. Returns the number of
    /// ranges still open at the end.
    pub fn spans(
        sets: &[RangeSet<V>],
        from: usize,
        to: usize,
        iterator: &mut impl SpanIterator<V>,
        min_point_size: i64,
    ) -> usize {
        let mut cursor = SpanCursor::new(sets.iter(), None, min_point_size);
        cursor.goto(from as i64, -FAR_SIDE);
        let mut pos = from as i64;
        let mut open_ranges = cursor.open_start;
        loop {
            let cur_to = cursor.to.min(to as i64);
            if let Some(point) = cursor.point {
                let active = cursor.active_for_point(cursor.to);
                let open_count = if cursor.point_from < from as i64 {
                    active.len() as i64 + 1
                } else {
                    (active.len() as i64).min(open_ranges)
                };
                iterator.point(
                    pos.max(0) as usize,
                    cur_to.max(0) as usize,
                    point,
                    &active,
                    open_count.max(0) as usize,
                    cursor.point_rank.max(0) as usize,
                );
                open_ranges = (active.len() as i64).min(open_ranges);
            } else if cur_to > pos {
                iterator.span(
                    pos.max(0) as usize,
                    cur_to.max(0) as usize,
                    &cursor.active,
                    open_ranges.max(0) as usize,
                );
                open_ranges = cursor.open_end(cur_to) as i64;
            }
            if cursor.to > to as i64 {
                break;
            }
            pos = cursor.to;
            cursor.next();
        }
        open_ranges.max(0) as usize
    }

    /// Layer several sets into one. Earlier sets end up in shallower
    /// layers, keeping their ranges ahead of later sets' at equal
    /// positions.
    pub fn join(sets: &[RangeSet<V>]) -> RangeSet<V> {
        let Some((last, rest)) = sets.split_last() else {
            return RangeSet::empty();
        };
        let mut result = last.clone();
        for set in rest.iter().rev() {
            let mut layer = set.clone();
            while !layer.is_empty() {
                let max_point = layer.0.max_point.max(result.0.max_point);
                let next = layer.0.next_layer.clone();
                result = RangeSet(Arc::new(SetInner {
                    chunk_pos: layer.0.chunk_pos.clone(),
                    chunks: layer.0.chunks.clone(),
                    next_layer: if result.is_empty() { None } else { Some(result) },
                    max_point,
                }));
                match next {
                    Some(deeper) => layer = deeper,
                    None => break,
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marten_change::{ChangeSet, ChangeSpec, MapMode};

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Mark {
        name: &'static str,
        start_side: i32,
        end_side: i32,
        point: bool,
    }

    impl Mark {
        fn new(name: &'static str) -> Mark {
            Mark {
                name,
                start_side: 0,
                end_side: 0,
                point: false,
            }
        }

        fn point(name: &'static str) -> Mark {
            Mark {
                point: true,
                ..Mark::new(name)
            }
        }
    }

    impl RangeValue for Mark {
        fn start_side(&self) -> i32 {
            self.start_side
        }

        fn end_side(&self) -> i32 {
            self.end_side
        }

        fn is_point(&self) -> bool {
            self.point
        }
    }

    fn desc_of(spec: ChangeSpec, len: usize) -> ChangeDesc {
        ChangeSet::of(spec, len, None).unwrap().desc()
    }

    fn names(set: &RangeSet<Mark>) -> Vec<(usize, usize, &'static str)> {
        set.iter(0).map(|(from, to, v)| (from, to, v.name)).collect()
    }

    #[test]
    fn iteration_is_ordered_by_from_and_start_side() {
        let mut early = Mark::new("early");
        early.start_side = -1;
        let set = RangeSet::of(
            vec![
                Mark::new("b").range(5, 8),
                early.range(5, 6),
                Mark::new("a").range(0, 5),
            ],
            true,
        );
        assert_eq!(names(&set), [(0, 5, "a"), (5, 6, "early"), (5, 8, "b")]);
    }

    #[test]
    fn iter_starts_at_the_given_position() {
        let set = RangeSet::of(
            vec![Mark::new("a").range(0, 5), Mark::new("b").range(10, 15)],
            false,
        );
        let rest: Vec<_> = set.iter(6).map(|(from, _, v)| (from, v.name)).collect();
        assert_eq!(rest, [(10, "b")]);
    }

    #[test]
    fn map_shifts_ranges_after_a_deletion() {
        let set = RangeSet::of(
            vec![Mark::new("v1").range(0, 5), Mark::new("v2").range(10, 15)],
            false,
        );
        let mapped = set.map(&desc_of(ChangeSpec::replace(2, 3, ""), 20));
        assert_eq!(names(&mapped), [(0, 4, "v1"), (9, 14, "v2")]);
    }

    #[test]
    fn map_reuses_untouched_chunks() {
        let set = RangeSet::of(
            vec![Mark::new("a").range(0, 3), Mark::new("b").range(5, 8)],
            false,
        );
        let mapped = set.map(&desc_of(ChangeSpec::insert(20, "xx"), 30));
        assert!(Arc::ptr_eq(&set.0.chunks[0], &mapped.0.chunks[0]));
        assert_eq!(names(&mapped), [(0, 3, "a"), (5, 8, "b")]);
    }

    #[test]
    fn map_drops_points_inside_deletions() {
        let set = RangeSet::of(vec![Mark::point("p").range(3, 3)], false);
        assert_eq!(Mark::point("p").map_mode(), MapMode::TrackDel);
        let mapped = set.map(&desc_of(ChangeSpec::delete(2, 5), 10));
        assert_eq!(mapped.size(), 0);
        let moved = set.map(&desc_of(ChangeSpec::delete(5, 7), 10));
        assert_eq!(names(&moved), [(3, 3, "p")]);
    }

    #[test]
    fn map_drops_ranges_covered_by_one_replacement() {
        let set = RangeSet::of(vec![Mark::new("gone").range(4, 6)], false);
        let mapped = set.map(&desc_of(ChangeSpec::replace(2, 9, "!"), 12));
        assert_eq!(mapped.size(), 0);
    }

    #[test]
    fn update_filters_out_a_point() {
        let set = RangeSet::of(vec![Mark::point("p").range(3, 3)], false);
        let updated = set.update(UpdateSpec {
            filter: Some(Box::new(|_, _, _| false)),
            ..UpdateSpec::default()
        });
        assert_eq!(updated.size(), 0);
    }

    #[test]
    fn update_merges_added_ranges_in_order() {
        let set = RangeSet::of(
            vec![Mark::new("a").range(0, 2), Mark::new("c").range(8, 9)],
            false,
        );
        let updated = set.update(UpdateSpec {
            add: vec![Mark::new("b").range(4, 6)],
            ..UpdateSpec::default()
        });
        assert_eq!(names(&updated), [(0, 2, "a"), (4, 6, "b"), (8, 9, "c")]);
    }

    #[test]
    fn update_without_changes_returns_the_same_set() {
        let set = RangeSet::of(vec![Mark::new("a").range(0, 2)], false);
        let updated = set.update(UpdateSpec::default());
        assert!(updated.same(&set));
    }

    #[test]
    fn update_reuses_whole_chunks() {
        let ranges: Vec<_> = (0..600)
            .map(|i| Mark::new("x").range(i * 2, i * 2 + 1))
            .collect();
        let set = RangeSet::of(ranges, false);
        let updated = set.update(UpdateSpec {
            add: vec![Mark::new("tail").range(5000, 5001)],
            ..UpdateSpec::default()
        });
        assert_eq!(updated.size(), 601);
        assert!(Arc::ptr_eq(&set.0.chunks[0], &updated.0.chunks[0]));
    }

    #[test]
    fn update_filter_window_limits_filtering() {
        let set = RangeSet::of(
            vec![Mark::new("a").range(0, 2), Mark::new("b").range(10, 12)],
            false,
        );
        let updated = set.update(UpdateSpec {
            filter: Some(Box::new(|_, _, _| false)),
            filter_from: 9,
            filter_to: Some(13),
            ..UpdateSpec::default()
        });
        assert_eq!(names(&updated), [(0, 2, "a")]);
    }

    #[test]
    fn between_visits_touching_ranges_and_can_stop() {
        let set = RangeSet::of(
            vec![
                Mark::new("a").range(0, 4),
                Mark::new("b").range(6, 9),
                Mark::new("c").range(12, 14),
            ],
            false,
        );
        let mut seen = Vec::new();
        set.between(3, 12, |from, _, v| {
            seen.push((from, v.name));
            true
        });
        seen.sort();
        assert_eq!(seen, [(0, "a"), (6, "b"), (12, "c")]);
        let mut count = 0;
        set.between(0, 14, |_, _, _| {
            count += 1;
            false
        });
        assert_eq!(count, 1);
    }

    #[test]
    fn overlapping_ranges_layer_and_merge_back_in_order() {
        let set = RangeSet::of(
            vec![
                Mark::new("outer").range(0, 10),
                Mark::new("inner").range(2, 4),
                Mark::new("late").range(3, 5),
            ],
            true,
        );
        assert_eq!(
            names(&set),
            [(0, 10, "outer"), (2, 4, "inner"), (3, 5, "late")]
        );
    }

    #[test]
    fn merged_iteration_breaks_ties_by_rank() {
        let first = RangeSet::of(vec![Mark::new("first").range(2, 4)], false);
        let second = RangeSet::of(vec![Mark::new("second").range(2, 4)], false);
        let sets = [first, second];
        let merged: Vec<_> = RangeSet::iter_sets(&sets, 0)
            .map(|(_, _, v)| v.name)
            .collect();
        assert_eq!(merged, ["first", "second"]);
    }

    #[test]
    fn join_collects_all_ranges() {
        let a = RangeSet::of(vec![Mark::new("a").range(0, 2)], false);
        let b = RangeSet::of(vec![Mark::new("b").range(1, 3)], false);
        let joined = RangeSet::join(&[a, b]);
        assert_eq!(joined.size(), 2);
        let mut seen = names(&joined);
        seen.sort();
        assert_eq!(seen, [(0, 2, "a"), (1, 3, "b")]);
    }

    #[test]
    fn eq_sets_compares_structurally() {
        let a = RangeSet::of(vec![Mark::new("m").range(2, 5)], false);
        let same = RangeSet::of(vec![Mark::new("m").range(2, 5)], false);
        let different = RangeSet::of(vec![Mark::new("m").range(2, 6)], false);
        assert!(RangeSet::eq_sets(&[a.clone()], &[a.clone()], 0, None));
        assert!(RangeSet::eq_sets(&[a.clone()], &[same], 0, None));
        assert!(!RangeSet::eq_sets(&[a.clone()], &[different.clone()], 0, None));
        assert!(RangeSet::eq_sets(&[a], &[different], 0, Some(4)));
    }

    struct Recorder {
        ranges: Vec<(usize, usize, Vec<&'static str>, Vec<&'static str>)>,
        points: Vec<(usize, usize, Option<&'static str>, Option<&'static str>)>,
    }

    impl RangeComparator<Mark> for Recorder {
        fn compare_range(&mut self, from: usize, to: usize, a: &[&Mark], b: &[&Mark]) {
            self.ranges.push((
                from,
                to,
                a.iter().map(|m| m.name).collect(),
                b.iter().map(|m| m.name).collect(),
            ));
        }

        fn compare_point(
            &mut self,
            from: usize,
            to: usize,
            a: Option<&Mark>,
            b: Option<&Mark>,
        ) {
            self.points
                .push((from, to, a.map(|m| m.name), b.map(|m| m.name)));
        }
    }

    #[test]
    fn compare_reports_the_differing_region() {
        let old = RangeSet::of(vec![Mark::new("m").range(2, 5)], false);
        let new = RangeSet::of(vec![Mark::new("m").range(2, 7)], false);
        let mut recorder = Recorder {
            ranges: Vec::new(),
            points: Vec::new(),
        };
        let diff = ChangeSet::empty(10).desc();
        RangeSet::compare(&[old], &[new], &diff, &mut recorder, -1);
        assert_eq!(recorder.ranges, [(5, 7, vec![], vec!["m"])]);
        assert!(recorder.points.is_empty());
    }

    #[test]
    fn compare_skips_shared_chunks() {
        let set = RangeSet::of(vec![Mark::new("m").range(2, 5)], false);
        let mut recorder = Recorder {
            ranges: Vec::new(),
            points: Vec::new(),
        };
        let diff = ChangeSet::empty(10).desc();
        RangeSet::compare(&[set.clone()], &[set], &diff, &mut recorder, -1);
        assert!(recorder.ranges.is_empty());
        assert!(recorder.points.is_empty());
    }

    #[test]
    fn compare_reports_point_differences() {
        let old = RangeSet::of(vec![Mark::point("p").range(4, 6)], false);
        let new: RangeSet<Mark> = RangeSet::empty();
        let mut recorder = Recorder {
            ranges: Vec::new(),
            points: Vec::new(),
        };
        let diff = ChangeSet::empty(10).desc();
        RangeSet::compare(&[old], &[new], &diff, &mut recorder, -1);
        assert_eq!(recorder.points, [(4, 6, Some("p"), None)]);
    }

    struct SpanRecorder {
        spans: Vec<(usize, usize, Vec<&'static str>, usize)>,
        points: Vec<(usize, usize, &'static str, Vec<&'static str>, usize)>,
    }

    impl SpanIterator<Mark> for SpanRecorder {
        fn span(&mut self, from: usize, to: usize, active: &[&Mark], open_start: usize) {
            self.spans.push((
                from,
                to,
                active.iter().map(|m| m.name).collect(),
                open_start,
            ));
        }

        fn point(
            &mut self,
            from: usize,
            to: usize,
            value: &Mark,
            active: &[&Mark],
            open_start: usize,
            _index: usize,
        ) {
            self.points.push((
                from,
                to,
                value.name,
                active.iter().map(|m| m.name).collect(),
                open_start,
            ));
        }
    }

    #[test]
    fn spans_alternate_covered_regions_and_points() {
        let set = RangeSet::of(
            vec![Mark::new("mark").range(0, 10), Mark::point("pt").range(4, 6)],
            true,
        );
        let mut recorder = SpanRecorder {
            spans: Vec::new(),
            points: Vec::new(),
        };
        let open = RangeSet::spans(&[set], 0, 10, &mut recorder, -1);
        assert_eq!(
            recorder.spans,
            [(0, 4, vec!["mark"], 0), (6, 10, vec!["mark"], 1)]
        );
        assert_eq!(recorder.points, [(4, 6, "pt", vec!["mark"], 1)]);
        assert_eq!(open, 0);
    }

    #[test]
    fn spans_flag_points_continuing_in_from_before_the_region() {
        let set = RangeSet::of(vec![Mark::point("pt").range(2, 8)], false);
        let mut recorder = SpanRecorder {
            spans: Vec::new(),
            points: Vec::new(),
        };
        RangeSet::spans(&[set], 4, 10, &mut recorder, -1);
        assert_eq!(recorder.points, [(4, 8, "pt", vec![], 1)]);
    }

    #[test]
    fn spans_respect_min_point_size() {
        let set = RangeSet::of(
            vec![Mark::point("small").range(1, 2), Mark::point("big").range(4, 9)],
            false,
        );
        let mut recorder = SpanRecorder {
            spans: Vec::new(),
            points: Vec::new(),
        };
        RangeSet::spans(&[set], 0, 10, &mut recorder, 3);
        let point_names: Vec<_> = recorder.points.iter().map(|p| p.2).collect();
        assert_eq!(point_names, ["big"]);
    }
}
