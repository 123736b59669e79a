//! Parallel walks over section lists.
//!
//! Composition and rebasing both walk two section streams at once, splitting
//! sections where they overlap. [`SectionIter`] tracks one stream: `forward`
//! advances in old-document units, `forward2` in "effective" units where a
//! replacement counts its inserted length. `add_section` canonicalizes the
//! output as it is produced.

use crate::desc::Sections;
use marten_text::Text;

/// Sentinel `ins` value marking an exhausted iterator. Never a valid section
/// value, which is at least -1.
const DONE: i64 = -2;

pub(crate) struct SectionIter<'a> {
    sections: &'a [i64],
    inserted: Option<&'a [Text]>,
    /// Read index; points past the pair currently loaded.
    i: usize,
    pub(crate) len: i64,
    pub(crate) ins: i64,
    pub(crate) off: i64,
}

impl<'a> SectionIter<'a> {
    pub(crate) fn new(sections: &'a [i64], inserted: Option<&'a [Text]>) -> Self {
        let mut iter = SectionIter {
            sections,
            inserted,
            i: 0,
            len: 0,
            ins: 0,
            off: 0,
        };
        iter.next_section();
        iter
    }

    pub(crate) fn next_section(&mut self) {
        if self.i < self.sections.len() {
            self.len = self.sections[self.i];
            self.ins = self.sections[self.i + 1];
            self.i += 2;
        } else {
            self.len = 0;
            self.ins = DONE;
        }
        self.off = 0;
    }

    pub(crate) fn done(&self) -> bool {
        self.ins == DONE
    }

    /// Index of the currently loaded section pair; used to remember whether
    /// a section's insertion has been emitted.
    pub(crate) fn index(&self) -> i64 {
        self.i as i64
    }

    /// Remaining length in effective units: inserted length for
    /// replacements, old length for untouched sections.
    pub(crate) fn len2(&self) -> i64 {
        if self.ins < 0 {
            self.len
        } else {
            self.ins
        }
    }

    /// The full inserted text of the current section.
    pub(crate) fn text(&self) -> Text {
        match self.inserted {
            Some(inserted) => {
                let index = (self.i - 2) >> 1;
                if index >= inserted.len() {
                    Text::empty()
                } else {
                    inserted[index].clone()
                }
            },
            None => Text::empty(),
        }
    }

    /// The next `len` units of the current section's inserted text, starting
    /// at the part already consumed by `forward2`.
    pub(crate) fn text_bit(&self, len: i64) -> Text {
        match self.inserted {
            Some(inserted) => {
                let index = (self.i - 2) >> 1;
                if index >= inserted.len() {
                    Text::empty()
                } else {
                    inserted[index].slice(self.off as usize, (self.off + len) as usize)
                }
            },
            None => Text::empty(),
        }
    }

    /// Advance `len` old-document units.
    pub(crate) fn forward(&mut self, len: i64) {
        if len == self.len {
            self.next_section();
        } else {
            self.len -= len;
            self.off += len;
        }
    }

    /// Advance `len` effective units.
    pub(crate) fn forward2(&mut self, len: i64) {
        if self.ins == -1 {
            self.forward(len);
        } else if len == self.ins {
            self.next_section();
        } else {
            self.ins -= len;
            self.off += len;
        }
    }
}

/// Append a section, canonicalizing as we go: no-op sections are dropped,
/// runs of equal non-positive `ins` merge, pure insertions at the same point
/// merge, and `force_join` merges unconditionally (used while compose is
/// still inside a single original change).
pub(crate) fn add_section(sections: &mut Sections, len: i64, ins: i64, force_join: bool) {
    if len == 0 && ins <= 0 {
        return;
    }
    if sections.is_empty() {
        sections.push(len);
        sections.push(ins);
        return;
    }
    let last = sections.len() - 2;
    if ins <= 0 && ins == sections[last + 1] {
        sections[last] += len;
    } else if len == 0 && sections[last] == 0 {
        sections[last + 1] += ins;
    } else if force_join {
        sections[last] += len;
        sections[last + 1] += ins;
    } else {
        sections.push(len);
        sections.push(ins);
    }
}

/// Record inserted text for the section most recently added. When
/// `add_section` merged into the previous pair, the text is appended to that
/// pair's existing insertion.
pub(crate) fn add_insert(values: &mut Vec<Text>, sections: &Sections, value: Text) {
    if value.len() == 0 {
        return;
    }
    let index = (sections.len() - 2) >> 1;
    if index < values.len() {
        let last = values.last_mut().expect("insert index within values");
        *last = last.append(&value);
    } else {
        while values.len() < index {
            values.push(Text::empty());
        }
        values.push(value);
    }
}

/// Walk the changed regions of a section list, calling
/// `f(from_a, to_a, from_b, to_b, inserted)`. With `individual` false,
/// adjacent replacement sections are reported as one region.
pub(crate) fn iter_changes(
    sections: &[i64],
    inserted: Option<&[Text]>,
    individual: bool,
    f: &mut dyn FnMut(usize, usize, usize, usize, &Text),
) {
    let mut pos_a = 0i64;
    let mut pos_b = 0i64;
    let mut i = 0;
    while i < sections.len() {
        let mut len = sections[i];
        let mut ins = sections[i + 1];
        i += 2;
        if ins < 0 {
            pos_a += len;
            pos_b += len;
            continue;
        }
        let mut end_a = pos_a;
        let mut end_b = pos_b;
        let mut text = Text::empty();
        loop {
            end_a += len;
            end_b += ins;
            if ins > 0 {
                if let Some(inserted) = inserted {
                    let index = (i - 2) >> 1;
                    if index < inserted.len() {
                        text = text.append(&inserted[index]);
                    }
                }
            }
            if individual || i == sections.len() || sections[i + 1] < 0 {
                break;
            }
            len = sections[i];
            ins = sections[i + 1];
            i += 2;
        }
        f(
            pos_a as usize,
            end_a as usize,
            pos_b as usize,
            end_b as usize,
            &text,
        );
        pos_a = end_a;
        pos_b = end_b;
    }
}

/// Merge two section streams where the second applies to the output of the
/// first. Callers validate that `a`'s new length equals `b`'s old length.
pub(crate) fn compose_sets(
    sections_a: &[i64],
    inserted_a: Option<&[Text]>,
    sections_b: &[i64],
    inserted_b: Option<&[Text]>,
    mk_set: bool,
) -> (Sections, Vec<Text>) {
    let mut sections = Sections::new();
    let mut insert: Option<Vec<Text>> = if mk_set { Some(Vec::new()) } else { None };
    let mut a = SectionIter::new(sections_a, inserted_a);
    let mut b = SectionIter::new(sections_b, inserted_b);
    let mut open = false;
    loop {
        if a.done() && b.done() {
            break;
        } else if a.ins == 0 {
            // Deletion in A: nothing in B can touch the deleted content.
            add_section(&mut sections, a.len, 0, open);
            a.next_section();
        } else if b.len == 0 && !b.done() {
            // Insertion in B.
            add_section(&mut sections, 0, b.ins, open);
            if let Some(insert) = insert.as_mut() {
                add_insert(insert, &sections, b.text());
            }
            b.next_section();
        } else if a.done() || b.done() {
            unreachable!("change sets of matching length cannot exhaust unevenly")
        } else {
            let len = a.len2().min(b.len);
            let section_len = sections.len();
            if a.ins == -1 {
                let ins_b = if b.ins == -1 {
                    -1
                } else if b.off > 0 {
                    0
                } else {
                    b.ins
                };
                add_section(&mut sections, len, ins_b, open);
                if ins_b > 0 {
                    if let Some(insert) = insert.as_mut() {
                        add_insert(insert, &sections, b.text());
                    }
                }
            } else if b.ins == -1 {
                // B keeps part of A's insertion.
                add_section(&mut sections, if a.off > 0 { 0 } else { a.len }, len, open);
                if let Some(insert) = insert.as_mut() {
                    add_insert(insert, &sections, a.text_bit(len));
                }
            } else {
                // B replaces part of A's insertion.
                add_section(
                    &mut sections,
                    if a.off > 0 { 0 } else { a.len },
                    if b.off > 0 { 0 } else { b.ins },
                    open,
                );
                if b.off == 0 {
                    if let Some(insert) = insert.as_mut() {
                        add_insert(insert, &sections, b.text());
                    }
                }
            }
            // Stay joined while either side is still inside one original
            // replacement.
            open = (a.ins > len || (b.ins >= 0 && b.len > len))
                && (open || sections.len() > section_len);
            a.forward2(len);
            b.forward(len);
        }
    }
    (sections, insert.unwrap_or_default())
}

/// Rebase section stream `a` over `b`, both starting from the same document.
/// The result applies to the document produced by `b`. Callers validate that
/// the two streams cover the same old length.
pub(crate) fn map_set(
    sections_a: &[i64],
    inserted_a: Option<&[Text]>,
    sections_b: &[i64],
    before: bool,
    mk_set: bool,
) -> (Sections, Vec<Text>) {
    let mut sections = Sections::new();
    let mut insert: Option<Vec<Text>> = if mk_set { Some(Vec::new()) } else { None };
    let mut a = SectionIter::new(sections_a, inserted_a);
    let mut b = SectionIter::new(sections_b, None);
    // For changes in A that get chopped up by B, `emitted` remembers the
    // section (by iterator index) whose inserted content is already in the
    // output, so it is only written once.
    let mut emitted: i64 = -1;
    loop {
        if (a.done() && b.len > 0) || (b.done() && a.len > 0) {
            unreachable!("change sets starting from the same document cannot exhaust unevenly")
        } else if a.ins == -1 && b.ins == -1 {
            // Move across a stretch skipped by both sets.
            let len = a.len.min(b.len);
            add_section(&mut sections, len, -1, false);
            a.forward(len);
            b.forward(len);
        } else if b.ins >= 0
            && (a.ins < 0
                || emitted == a.index()
                || (a.off == 0 && (b.len < a.len || (b.len == a.len && !before))))
        {
            // A change in B that comes before the next change in A. Its
            // insertion survives into the mapped document; A-content fully
            // inside its deleted stretch is emitted at this point.
            let mut len = b.len;
            add_section(&mut sections, b.ins, -1, false);
            while len > 0 {
                if a.done() {
                    unreachable!("B cannot cover content A has already exhausted")
                }
                let piece = a.len.min(len);
                if a.ins >= 0 && a.index() > emitted && a.len <= piece {
                    add_section(&mut sections, 0, a.ins, false);
                    if let Some(insert) = insert.as_mut() {
                        add_insert(insert, &sections, a.text());
                    }
                    emitted = a.index();
                }
                a.forward(piece);
                len -= piece;
            }
            b.next_section();
        } else if a.ins >= 0 {
            // A change in A: collect the part of its old range that B leaves
            // in place, skipping B-deletions inside it.
            let mut len = 0;
            let mut left = a.len;
            while left > 0 {
                if b.ins == -1 {
                    let piece = left.min(b.len);
                    len += piece;
                    left -= piece;
                    b.forward(piece);
                } else if b.ins == 0 && b.len < left {
                    left -= b.len;
                    b.next_section();
                } else {
                    break;
                }
            }
            let first = a.index() > emitted;
            add_section(&mut sections, len, if first { a.ins } else { 0 }, false);
            if first {
                if let Some(insert) = insert.as_mut() {
                    add_insert(insert, &sections, a.text());
                }
            }
            emitted = a.index();
            a.forward(a.len - left);
        } else if a.done() && b.done() {
            break;
        } else {
            unreachable!("change sets starting from the same document cannot exhaust unevenly")
        }
    }
    (sections, insert.unwrap_or_default())
}
