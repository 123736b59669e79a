//! Comparing range set configurations across a document change.

use crate::{
    cursor::{chunk_id, SharedChunks, SpanCursor},
    range::RangeValue,
    set::RangeSet,
};
use marten_change::{ChangeDesc, Touches};
use rustc_hash::FxHashMap;

/// Callbacks invoked by [`RangeSet::compare`] for regions where the old and
/// new configurations disagree. Positions are in new-document coordinates.
pub trait RangeComparator<V: RangeValue> {
    fn compare_range(&mut self, from: usize, to: usize, active_a: &[&V], active_b: &[&V]);

    fn compare_point(&mut self, from: usize, to: usize, point_a: Option<&V>, point_b: Option<&V>);

    /// Called at span boundaries that moved or changed their open count.
    fn bound_change(&mut self, _pos: usize) {}
}

/// Callbacks invoked by [`RangeSet::spans`]. `open_start` counts the active
/// values already open when the iterated region began; for a point it
/// equals `active.len() + 1` exactly when the point itself started before
/// the region.
pub trait SpanIterator<V: RangeValue> {
    fn span(&mut self, from: usize, to: usize, active: &[&V], open_start: usize);

    #[allow(clippy::too_many_arguments)]
    fn point(
        &mut self,
        from: usize,
        to: usize,
        value: &V,
        active: &[&V],
        open_start: usize,
        index: usize,
    );
}

pub(crate) fn same_values<V: RangeValue>(a: &[&V], b: &[&V]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

/// Chunks present by reference in both configurations, holding no points,
/// whose new position matches the mapped old position and whose region the
/// diff does not touch. Both comparison cursors skip them whole.
pub(crate) fn find_shared_chunks<V: RangeValue>(
    a: &[&RangeSet<V>],
    b: &[&RangeSet<V>],
    text_diff: Option<&ChangeDesc>,
) -> SharedChunks {
    let mut in_a: FxHashMap<usize, usize> = FxHashMap::default();
    for set in a {
        let inner = set.inner();
        for i in 0..inner.chunks.len() {
            if inner.chunks[i].max_point <= 0 {
                in_a.insert(chunk_id(&inner.chunks[i]), inner.chunk_pos[i]);
            }
        }
    }
    let mut shared = SharedChunks::default();
    for set in b {
        let inner = set.inner();
        for i in 0..inner.chunks.len() {
            let id = chunk_id(&inner.chunks[i]);
            let Some(&known) = in_a.get(&id) else { continue };
            let matches = match text_diff {
                Some(diff) => {
                    known <= diff.len()
                        && diff.map_pos(known, -1) == inner.chunk_pos[i]
                        && diff.touches_range(known, known + inner.chunks[i].length())
                            == Touches::No
                },
                None => known == inner.chunk_pos[i],
            };
            if matches {
                shared.insert(id);
            }
        }
    }
    shared
}

/// Walk two span cursors over one unchanged gap of the diff, reporting
/// differing points and differing active sets to the comparator. `start_a`
/// and `start_b` are the gap's positions on the two sides; reported
/// positions use side B's coordinates.
pub(crate) fn compare_spans<V: RangeValue>(
    a: &mut SpanCursor<'_, V>,
    start_a: usize,
    b: &mut SpanCursor<'_, V>,
    start_b: usize,
    length: usize,
    comparator: &mut impl RangeComparator<V>,
) {
    a.goto(start_a as i64, -crate::FAR_SIDE);
    b.goto(start_b as i64, -crate::FAR_SIDE);
    let end_b = start_b as i64 + length as i64;
    let d_pos = start_b as i64 - start_a as i64;
    let mut pos = start_b as i64;
    loop {
        let d_end = (a.to + d_pos) - b.to;
        let diff = if d_end != 0 {
            d_end
        } else {
            (a.end_side - b.end_side) as i64
        };
        let end = if diff < 0 { a.to + d_pos } else { b.to };
        let clip_end = end.min(end_b);
        if a.point.is_some() || b.point.is_some() {
            let same_points = match (a.point, b.point) {
                (Some(pa), Some(pb)) => {
                    pa == pb && same_values(&a.active_for_point(a.to), &b.active_for_point(b.to))
                },
                _ => false,
            };
            if !same_points {
                comparator.compare_point(
                    pos.max(0) as usize,
                    clip_end.max(0) as usize,
                    a.point,
                    b.point,
                );
            }
        } else if clip_end > pos && !same_values(&a.active, &b.active) {
            comparator.compare_range(pos as usize, clip_end as usize, &a.active, &b.active);
        }
        if end > end_b {
            break;
        }
        if d_end != 0 || a.open_end(clip_end) != b.open_end(clip_end) {
            comparator.bound_change(end.max(0) as usize);
        }
        pos = end;
        if diff <= 0 {
            a.next();
        }
        if diff >= 0 {
            b.next();
        }
    }
}
