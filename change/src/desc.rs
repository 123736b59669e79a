//! Length-only change descriptions.
//!
//! A description is a flat sequence of `(len, ins)` pairs, each covering
//! `len` code units of the old document: `ins == -1` leaves them untouched,
//! `ins == 0` deletes them, `ins > 0` replaces them with `ins` units of new
//! content. A pure insertion is `(0, ins)`. The encoding is compact enough to
//! keep for every transaction in an undo history, and rich enough to map
//! positions and rebase other changes.

use crate::{
    error::ChangeError,
    section::{compose_sets, iter_changes, map_set},
};
use smallvec::SmallVec;
use std::fmt;

pub(crate) type Sections = SmallVec<[i64; 8]>;

/// How to map a position at the edge of a deletion; see
/// [`ChangeDesc::map_pos_mode`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MapMode {
    /// Always map to a valid new position, even inside deleted content.
    #[default]
    Simple,
    /// Report the position as deleted when it falls strictly inside deleted
    /// content.
    TrackDel,
    /// Report the position as deleted when the character before it is
    /// deleted.
    TrackBefore,
    /// Report the position as deleted when the character after it is deleted.
    TrackAfter,
}

/// Result of [`ChangeDesc::touches_range`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Touches {
    No,
    Yes,
    /// A single replacement strictly contains the whole queried range.
    Cover,
}

/// The length-only form of a change set.
#[derive(Clone, PartialEq, Eq)]
pub struct ChangeDesc {
    pub(crate) sections: Sections,
}

impl ChangeDesc {
    /// Wrap a raw `[len, ins, len, ins, …]` section list. The caller is
    /// responsible for the encoding invariants.
    pub fn create(sections: impl IntoIterator<Item = i64>) -> ChangeDesc {
        ChangeDesc {
            sections: sections.into_iter().collect(),
        }
    }

    /// Length of the old document this description applies to.
    pub fn len(&self) -> usize {
        self.sections.chunks(2).map(|pair| pair[0] as usize).sum()
    }

    /// Length of the document produced by the change.
    pub fn new_len(&self) -> usize {
        self.sections
            .chunks(2)
            .map(|pair| {
                if pair[1] < 0 {
                    pair[0] as usize
                } else {
                    pair[1] as usize
                }
            })
            .sum()
    }

    /// True when the description changes nothing.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() || (self.sections.len() == 2 && self.sections[1] < 0)
    }

    /// Call `f(pos_a, pos_b, len)` for every unchanged section, where
    /// `pos_a` is its old-document position and `pos_b` its position in the
    /// new document.
    pub fn iter_gaps(&self, mut f: impl FnMut(usize, usize, usize)) {
        let mut pos_a = 0;
        let mut pos_b = 0;
        for pair in self.sections.chunks(2) {
            let (len, ins) = (pair[0], pair[1]);
            if ins < 0 {
                f(pos_a as usize, pos_b as usize, len as usize);
                pos_b += len;
            } else {
                pos_b += ins;
            }
            pos_a += len;
        }
    }

    /// Call `f(from_a, to_a, from_b, to_b)` for every changed region. With
    /// `individual` false, adjacent replacement sections are coalesced; with
    /// it true they are reported one by one, as position mapping sees them.
    pub fn iter_changed_ranges(
        &self,
        individual: bool,
        mut f: impl FnMut(usize, usize, usize, usize),
    ) {
        iter_changes(&self.sections, None, individual, &mut |from_a, to_a, from_b, to_b, _| {
            f(from_a, to_a, from_b, to_b)
        });
    }

    /// The description of the inverse change.
    pub fn inverted_desc(&self) -> ChangeDesc {
        let mut sections = Sections::new();
        for pair in self.sections.chunks(2) {
            let (len, ins) = (pair[0], pair[1]);
            if ins < 0 {
                sections.push(len);
                sections.push(ins);
            } else {
                sections.push(ins);
                sections.push(len);
            }
        }
        ChangeDesc { sections }
    }

    /// Description of applying this change and then `other`.
    pub fn compose_desc(&self, other: &ChangeDesc) -> Result<ChangeDesc, ChangeError> {
        if self.is_empty() {
            return Ok(other.clone());
        }
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.new_len() != other.len() {
            return Err(ChangeError::LengthMismatch {
                found: other.len(),
                expected: self.new_len(),
            });
        }
        let (sections, _) = compose_sets(&self.sections, None, &other.sections, None, false);
        Ok(ChangeDesc { sections })
    }

    /// Map this description over `other`, which starts from the same
    /// document, producing a description that applies after `other`. With
    /// `before` true, this change is treated as ordered before `other` where
    /// the two insert at the same position.
    pub fn map_desc(&self, other: &ChangeDesc, before: bool) -> Result<ChangeDesc, ChangeError> {
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.len() != other.len() {
            return Err(ChangeError::LengthMismatch {
                found: other.len(),
                expected: self.len(),
            });
        }
        let (sections, _) = map_set(&self.sections, None, &other.sections, before, false);
        Ok(ChangeDesc { sections })
    }

    /// Map a position through the change. `assoc < 0` associates the
    /// position with the content before it (the default stance), `assoc > 0`
    /// with the content after it, deciding which side of an insertion at the
    /// position the result lands on.
    ///
    /// Panics when `pos` is beyond the old document's length.
    pub fn map_pos(&self, pos: usize, assoc: i32) -> usize {
        self.map_pos_mode(pos, assoc, MapMode::Simple)
            .expect("simple mapping always produces a position")
    }

    /// Like [`map_pos`](ChangeDesc::map_pos), but `mode` selects when a
    /// position counts as deleted, in which case `None` is returned.
    pub fn map_pos_mode(&self, pos: usize, assoc: i32, mode: MapMode) -> Option<usize> {
        let pos = pos as i64;
        let mut pos_a = 0;
        let mut pos_b = 0;
        for pair in self.sections.chunks(2) {
            let (len, ins) = (pair[0], pair[1]);
            let end_a = pos_a + len;
            if ins < 0 {
                if end_a > pos {
                    return Some((pos_b + (pos - pos_a)) as usize);
                }
                pos_b += len;
            } else {
                if mode != MapMode::Simple
                    && end_a >= pos
                    && match mode {
                        MapMode::TrackDel => pos_a < pos && end_a > pos,
                        MapMode::TrackBefore => pos_a < pos,
                        MapMode::TrackAfter => end_a > pos,
                        MapMode::Simple => false,
                    }
                {
                    return None;
                }
                if end_a > pos || (end_a == pos && assoc < 0 && len == 0) {
                    let result = if pos == pos_a || assoc < 0 {
                        pos_b
                    } else {
                        pos_b + ins
                    };
                    return Some(result as usize);
                }
                pos_b += ins;
            }
            pos_a = end_a;
        }
        assert!(
            pos <= pos_a,
            "position {pos} is out of range for change set of length {pos_a}"
        );
        Some(pos_b as usize)
    }

    /// Whether any replacement intersects `from..=to`, and whether a single
    /// replacement strictly contains it.
    pub fn touches_range(&self, from: usize, to: usize) -> Touches {
        let (from, to) = (from as i64, to as i64);
        let mut pos = 0;
        for pair in self.sections.chunks(2) {
            if pos > to {
                break;
            }
            let (len, ins) = (pair[0], pair[1]);
            let end = pos + len;
            if ins >= 0 && pos <= to && end >= from {
                return if pos < from && end > to {
                    Touches::Cover
                } else {
                    Touches::Yes
                };
            }
            pos = end;
        }
        Touches::No
    }

    /// The flat `[len, ins, len, ins, …]` array.
    pub fn to_json(&self) -> Vec<i64> {
        self.sections.to_vec()
    }

    /// Rebuild a description from its [`to_json`](ChangeDesc::to_json) form.
    pub fn from_json(json: &[i64]) -> Result<ChangeDesc, ChangeError> {
        if json.len() % 2 != 0 {
            return Err(ChangeError::InvalidJson {
                reason: "section list must have even length".into(),
            });
        }
        for pair in json.chunks(2) {
            if pair[0] < 0 || pair[1] < -1 {
                return Err(ChangeError::InvalidJson {
                    reason: format!("invalid section ({}, {})", pair[0], pair[1]),
                });
            }
        }
        Ok(ChangeDesc {
            sections: json.iter().copied().collect(),
        })
    }
}

impl fmt::Display for ChangeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pair) in self.sections.chunks(2).enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if pair[1] < 0 {
                write!(f, "{}", pair[0])?;
            } else {
                write!(f, "{}:{}", pair[0], pair[1])?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ChangeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChangeDesc({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_sum_sections() {
        let desc = ChangeDesc::create([3, -1, 2, 5, 4, 0]);
        assert_eq!(desc.len(), 9);
        assert_eq!(desc.new_len(), 12);
        assert!(!desc.is_empty());
        assert!(ChangeDesc::create([7, -1]).is_empty());
        assert!(ChangeDesc::create([]).is_empty());
    }

    #[test]
    fn map_pos_through_insertion() {
        let desc = ChangeDesc::create([0, 1, 5, -1]);
        assert_eq!(desc.map_pos(0, -1), 0);
        assert_eq!(desc.map_pos(0, 1), 1);
        assert_eq!(desc.map_pos(3, -1), 4);
        assert_eq!(desc.map_pos(5, -1), 6);
    }

    #[test]
    fn map_pos_through_deletion() {
        let desc = ChangeDesc::create([2, -1, 3, 0, 2, -1]);
        assert_eq!(desc.map_pos(1, -1), 1);
        assert_eq!(desc.map_pos(2, -1), 2);
        assert_eq!(desc.map_pos(4, -1), 2);
        assert_eq!(desc.map_pos(5, 1), 2);
        assert_eq!(desc.map_pos(7, -1), 4);
    }

    #[test]
    fn map_pos_modes_detect_deletion() {
        let desc = ChangeDesc::create([2, -1, 3, 0, 2, -1]);
        assert_eq!(desc.map_pos_mode(3, -1, MapMode::TrackDel), None);
        assert_eq!(desc.map_pos_mode(2, -1, MapMode::TrackDel), Some(2));
        assert_eq!(desc.map_pos_mode(5, -1, MapMode::TrackDel), Some(2));
        assert_eq!(desc.map_pos_mode(5, -1, MapMode::TrackBefore), None);
        assert_eq!(desc.map_pos_mode(2, -1, MapMode::TrackBefore), Some(2));
        assert_eq!(desc.map_pos_mode(2, -1, MapMode::TrackAfter), None);
        assert_eq!(desc.map_pos_mode(5, -1, MapMode::TrackAfter), Some(2));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn map_pos_rejects_positions_past_the_end() {
        ChangeDesc::create([5, -1]).map_pos(6, -1);
    }

    #[test]
    fn touches_range_reports_cover() {
        let desc = ChangeDesc::create([2, -1, 6, 1, 2, -1]);
        assert_eq!(desc.touches_range(0, 1), Touches::No);
        assert_eq!(desc.touches_range(0, 2), Touches::Yes);
        assert_eq!(desc.touches_range(3, 6), Touches::Cover);
        assert_eq!(desc.touches_range(2, 6), Touches::Yes);
        assert_eq!(desc.touches_range(9, 10), Touches::No);
    }

    #[test]
    fn inverted_desc_swaps_pairs() {
        let desc = ChangeDesc::create([2, -1, 3, 1]);
        let inverted = desc.inverted_desc();
        assert_eq!(inverted.to_json(), vec![2, -1, 1, 3]);
        assert_eq!(inverted.len(), desc.new_len());
        assert_eq!(inverted.new_len(), desc.len());
    }

    #[test]
    fn iter_gaps_walks_untouched_sections() {
        let desc = ChangeDesc::create([2, -1, 3, 1, 4, -1]);
        let mut gaps = Vec::new();
        desc.iter_gaps(|a, b, len| gaps.push((a, b, len)));
        assert_eq!(gaps, [(0, 0, 2), (5, 3, 4)]);
    }

    #[test]
    fn changed_ranges_coalesce_unless_individual() {
        let desc = ChangeDesc::create([2, -1, 3, 1, 0, 2, 4, -1]);
        let mut merged = Vec::new();
        desc.iter_changed_ranges(false, |a, b, c, d| merged.push((a, b, c, d)));
        assert_eq!(merged, [(2, 5, 2, 5)]);
        let mut individual = Vec::new();
        desc.iter_changed_ranges(true, |a, b, c, d| individual.push((a, b, c, d)));
        assert_eq!(individual, [(2, 5, 2, 3), (5, 5, 3, 5)]);
    }

    #[test]
    fn json_round_trip_rejects_odd_shapes() {
        let desc = ChangeDesc::create([2, -1, 3, 0]);
        assert_eq!(ChangeDesc::from_json(&desc.to_json()).unwrap(), desc);
        assert!(ChangeDesc::from_json(&[1, -1, 2]).is_err());
        assert!(ChangeDesc::from_json(&[-1, 2]).is_err());
    }

    #[test]
    fn display_shows_sections() {
        let desc = ChangeDesc::create([2, -1, 3, 1]);
        assert_eq!(desc.to_string(), "2 3:1");
    }
}
