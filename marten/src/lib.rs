//! The marten editor-state core: an immutable line-structured document, a
//! run-length change algebra with operational-transformation rebasing, and
//! layered tagged range sets.
//!
//! All values are immutable after construction; operations return new
//! values sharing structure with their inputs, so snapshots are cheap to
//! keep and safe to share.

pub use marten_change::{
    ChangeDesc, ChangeError, ChangeInsert, ChangeSet, ChangeSpec, FilterResult, MapMode, Touches,
};
pub use marten_rangeset::{
    Range, RangeComparator, RangeCursor, RangeSet, RangeSetBuilder, RangeValue, SpanIterator,
    UpdateSpec,
};
pub use marten_text::{Direction, Line, LineIter, PartialIter, Text, TextError, TextIter};
