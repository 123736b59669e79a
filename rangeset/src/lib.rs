mod builder;
mod chunk;
mod compare;
mod cursor;
mod range;
mod set;

pub use builder::RangeSetBuilder;
pub use compare::{RangeComparator, SpanIterator};
pub use cursor::RangeCursor;
pub use range::{Range, RangeValue};
pub use set::{RangeSet, UpdateSpec};

/// A sentinel position larger than any real document position.
pub(crate) const FAR: i64 = 1_000_000_000;
/// The matching sentinel for side values.
pub(crate) const FAR_SIDE: i32 = 1_000_000_000;
