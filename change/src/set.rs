//! Change sets: descriptions plus the inserted text.

use crate::{
    desc::{ChangeDesc, Sections},
    error::ChangeError,
    section::{add_insert, add_section, compose_sets, iter_changes, map_set, SectionIter},
    spec::{ChangeInsert, ChangeSpec},
};
use marten_text::{split_lines, Text};
use serde_json::{json, Value};
use std::ops::Deref;
use tracing::trace;

/// A sentinel position larger than any real document position.
const FAR: i64 = 1_000_000_000;

/// A set of changes to a document: a [`ChangeDesc`] plus the replacement
/// text for each changed section. Values are immutable; every operation
/// returns a new set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub(crate) desc: ChangeDesc,
    /// Aligned with the description's section pairs; empty for sections
    /// that keep or only delete.
    pub(crate) inserted: Vec<Text>,
}

/// Result of [`ChangeSet::filter`].
#[derive(Debug, Clone)]
pub struct FilterResult {
    /// The changes that fall outside the suppressed ranges.
    pub changes: ChangeSet,
    /// A description of the suppressed changes, relative to the same
    /// starting document.
    pub filtered: ChangeDesc,
}

impl Deref for ChangeSet {
    type Target = ChangeDesc;

    fn deref(&self) -> &ChangeDesc {
        &self.desc
    }
}

impl ChangeSet {
    /// The change set that leaves a document of the given length unchanged.
    pub fn empty(length: usize) -> ChangeSet {
        let mut sections = Sections::new();
        if length > 0 {
            sections.push(length as i64);
            sections.push(-1);
        }
        ChangeSet {
            desc: ChangeDesc { sections },
            inserted: Vec::new(),
        }
    }

    /// Build a change set from a spec, for a document of length `length`.
    /// String insertions are split on `line_sep` when given, otherwise on
    /// `\r\n`, `\r`, or `\n`.
    ///
    /// Sub-changes may be given out of order; each non-monotonic batch is
    /// flushed into a partial set and composed with the accumulated result,
    /// so input order does not affect the outcome. The result of overlapping
    /// sub-changes within one batch is unspecified.
    pub fn of(
        spec: impl Into<ChangeSpec>,
        length: usize,
        line_sep: Option<&str>,
    ) -> Result<ChangeSet, ChangeError> {
        let mut builder = SpecBuilder {
            length,
            line_sep,
            sections: Sections::new(),
            inserted: Vec::new(),
            pos: 0,
            total: None,
        };
        builder.process(spec.into())?;
        let force = builder.total.is_none();
        builder.flush(force)?;
        Ok(builder.total.expect("a forced flush always produces a set"))
    }

    /// Apply the changes to a document of the right length.
    pub fn apply(&self, doc: &Text) -> Result<Text, ChangeError> {
        if self.desc.len() != doc.len() {
            return Err(ChangeError::LengthMismatch {
                found: doc.len(),
                expected: self.desc.len(),
            });
        }
        let mut doc = doc.clone();
        iter_changes(
            &self.desc.sections,
            Some(&self.inserted),
            false,
            &mut |from_a, to_a, from_b, _to_b, text| {
                doc = doc
                    .replace(from_b, from_b + (to_a - from_a), text)
                    .expect("change positions are validated against the document length");
            },
        );
        Ok(doc)
    }

    /// The change set that undoes this one, capturing the deleted text from
    /// the document the changes apply to.
    pub fn invert(&self, doc: &Text) -> Result<ChangeSet, ChangeError> {
        if self.desc.len() != doc.len() {
            return Err(ChangeError::LengthMismatch {
                found: doc.len(),
                expected: self.desc.len(),
            });
        }
        let mut sections = self.desc.sections.clone();
        let mut inserted = Vec::new();
        let mut pos = 0usize;
        let mut i = 0;
        while i < sections.len() {
            let len = sections[i];
            let ins = sections[i + 1];
            if ins >= 0 {
                sections[i] = ins;
                sections[i + 1] = len;
                let index = i >> 1;
                while inserted.len() < index {
                    inserted.push(Text::empty());
                }
                inserted.push(if len > 0 {
                    doc.slice(pos, pos + len as usize)
                } else {
                    Text::empty()
                });
            }
            pos += len as usize;
            i += 2;
        }
        Ok(ChangeSet {
            desc: ChangeDesc { sections },
            inserted,
        })
    }

    /// Combine with a set that applies to this set's output document,
    /// producing a single equivalent set.
    pub fn compose(&self, other: &ChangeSet) -> Result<ChangeSet, ChangeError> {
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
        let (sections, inserted) = compose_sets(
            &self.desc.sections,
            Some(&self.inserted),
            &other.desc.sections,
            Some(&other.inserted),
            true,
        );
        Ok(ChangeSet {
            desc: ChangeDesc { sections },
            inserted,
        })
    }

    /// Rebase over `other`, which starts from the same document, so the
    /// result can be applied after it. With `before` true this change is
    /// ordered before `other` at coincident insertion points.
    /// `a.compose(&b.map(&a, false)?)` and `b.compose(&a.map(&b, true)?)`
    /// produce the same document.
    pub fn map(&self, other: &ChangeDesc, before: bool) -> Result<ChangeSet, ChangeError> {
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.desc.len() != other.len() {
            return Err(ChangeError::LengthMismatch {
                found: other.len(),
                expected: self.desc.len(),
            });
        }
        let (sections, inserted) = map_set(
            &self.desc.sections,
            Some(&self.inserted),
            &other.sections,
            before,
            true,
        );
        Ok(ChangeSet {
            desc: ChangeDesc { sections },
            inserted,
        })
    }

    /// Walk the changed regions with their replacement text. See
    /// [`ChangeDesc::iter_changed_ranges`] for the `individual` flag.
    pub fn iter_changes(
        &self,
        individual: bool,
        mut f: impl FnMut(usize, usize, usize, usize, &Text),
    ) {
        iter_changes(&self.desc.sections, Some(&self.inserted), individual, &mut f);
    }

    /// The length-only form of this set.
    pub fn desc(&self) -> ChangeDesc {
        self.desc.clone()
    }

    /// Split the set around the suppression ranges
    /// `[from0, to0, from1, to1, …]` (sorted): changes inside them are moved
    /// to `filtered`, everything else is kept in `changes`. Both results
    /// apply to the same starting document as this set.
    pub fn filter(&self, ranges: &[usize]) -> FilterResult {
        let mut result_sections = Sections::new();
        let mut result_inserted = Vec::new();
        let mut filtered_sections = Sections::new();
        let mut iter = SectionIter::new(&self.desc.sections, Some(&self.inserted));
        let mut i = 0;
        let mut pos: i64 = 0;
        'done: loop {
            let next = if i < ranges.len() { ranges[i] as i64 } else { FAR };
            i += 1;
            while pos < next || (pos == next && iter.len == 0) {
                if iter.done() {
                    break 'done;
                }
                let len = iter.len.min(next - pos);
                add_section(&mut filtered_sections, len, -1, false);
                let ins = if iter.ins == -1 {
                    -1
                } else if iter.off == 0 {
                    iter.ins
                } else {
                    0
                };
                add_section(&mut result_sections, len, ins, false);
                if ins > 0 {
                    add_insert(&mut result_inserted, &result_sections, iter.text());
                }
                iter.forward(len);
                pos += len;
            }
            let end = if i < ranges.len() { ranges[i] as i64 } else { FAR };
            i += 1;
            while pos < end {
                if iter.done() {
                    break 'done;
                }
                let len = iter.len.min(end - pos);
                add_section(&mut result_sections, len, -1, false);
                let ins = if iter.ins == -1 {
                    -1
                } else if iter.off == 0 {
                    iter.ins
                } else {
                    0
                };
                add_section(&mut filtered_sections, len, ins, false);
                iter.forward(len);
                pos += len;
            }
        }
        FilterResult {
            changes: ChangeSet {
                desc: ChangeDesc {
                    sections: result_sections,
                },
                inserted: result_inserted,
            },
            filtered: ChangeDesc {
                sections: filtered_sections,
            },
        }
    }

    /// The set's JSON form: an array where a plain number is an unchanged
    /// length, `[len]` a deletion, and `[len, line0, line1, …]` a
    /// replacement by the document built from those lines.
    pub fn to_json(&self) -> Value {
        let mut parts = Vec::new();
        for (index, pair) in self.desc.sections.chunks(2).enumerate() {
            let (len, ins) = (pair[0], pair[1]);
            if ins < 0 {
                parts.push(json!(len));
            } else if ins == 0 {
                parts.push(json!([len]));
            } else {
                let mut entry = vec![json!(len)];
                entry.extend(self.inserted[index].to_json().into_iter().map(Value::String));
                parts.push(Value::Array(entry));
            }
        }
        Value::Array(parts)
    }

    /// Rebuild a set from its [`to_json`](ChangeSet::to_json) form.
    pub fn from_json(json: &Value) -> Result<ChangeSet, ChangeError> {
        let parts = json.as_array().ok_or_else(|| ChangeError::InvalidJson {
            reason: "expected an array".into(),
        })?;
        let mut sections = Sections::new();
        let mut inserted = Vec::new();
        for (i, part) in parts.iter().enumerate() {
            if let Some(len) = part.as_i64() {
                if len < 0 {
                    return Err(ChangeError::InvalidJson {
                        reason: format!("negative section length {len}"),
                    });
                }
                sections.push(len);
                sections.push(-1);
            } else if let Some(entry) = part.as_array() {
                let len = entry
                    .first()
                    .and_then(Value::as_i64)
                    .filter(|len| *len >= 0)
                    .ok_or_else(|| ChangeError::InvalidJson {
                        reason: "section array must start with a length".into(),
                    })?;
                if entry.len() == 1 {
                    sections.push(len);
                    sections.push(0);
                } else {
                    let lines = entry[1..]
                        .iter()
                        .map(|line| {
                            line.as_str().map(String::from).ok_or_else(|| {
                                ChangeError::InvalidJson {
                                    reason: "inserted lines must be strings".into(),
                                }
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    let text = Text::of(lines);
                    sections.push(len);
                    sections.push(text.len() as i64);
                    while inserted.len() < i {
                        inserted.push(Text::empty());
                    }
                    inserted.push(text);
                }
            } else {
                return Err(ChangeError::InvalidJson {
                    reason: "sections must be numbers or arrays".into(),
                });
            }
        }
        Ok(ChangeSet {
            desc: ChangeDesc { sections },
            inserted,
        })
    }
}

struct SpecBuilder<'a> {
    length: usize,
    line_sep: Option<&'a str>,
    sections: Sections,
    inserted: Vec<Text>,
    pos: usize,
    total: Option<ChangeSet>,
}

impl SpecBuilder<'_> {
    fn process(&mut self, spec: ChangeSpec) -> Result<(), ChangeError> {
        match spec {
            ChangeSpec::List(specs) => {
                for sub in specs {
                    self.process(sub)?;
                }
            },
            ChangeSpec::Set(set) => {
                if set.len() != self.length {
                    return Err(ChangeError::LengthMismatch {
                        found: set.len(),
                        expected: self.length,
                    });
                }
                self.flush(false)?;
                self.total = Some(match self.total.take() {
                    Some(total) => total.compose(&set.map(&total, false)?)?,
                    None => set,
                });
            },
            ChangeSpec::Change { from, to, insert } => {
                if from > to || to > self.length {
                    return Err(ChangeError::InvalidRange {
                        from,
                        to,
                        len: self.length,
                    });
                }
                let text = match insert {
                    None => Text::empty(),
                    Some(ChangeInsert::Text(text)) => text,
                    Some(ChangeInsert::Str(s)) => Text::of(match self.line_sep {
                        Some(sep) => s.split(sep).map(String::from).collect::<Vec<_>>(),
                        None => split_lines(&s),
                    }),
                };
                let ins_len = text.len();
                if from == to && ins_len == 0 {
                    return Ok(());
                }
                if from < self.pos {
                    self.flush(false)?;
                }
                if from > self.pos {
                    add_section(&mut self.sections, (from - self.pos) as i64, -1, false);
                }
                add_section(&mut self.sections, (to - from) as i64, ins_len as i64, false);
                add_insert(&mut self.inserted, &self.sections, text);
                self.pos = to;
            },
        }
        Ok(())
    }

    /// Close the current batch into a partial set and fold it into the
    /// accumulated total.
    fn flush(&mut self, force: bool) -> Result<(), ChangeError> {
        if !force && self.sections.is_empty() {
            return Ok(());
        }
        if self.pos < self.length {
            add_section(
                &mut self.sections,
                (self.length - self.pos) as i64,
                -1,
                false,
            );
        }
        let set = ChangeSet {
            desc: ChangeDesc {
                sections: std::mem::take(&mut self.sections),
            },
            inserted: std::mem::take(&mut self.inserted),
        };
        self.total = Some(match self.total.take() {
            Some(total) => {
                trace!(batch = %set.desc, "composing out-of-order change batch");
                total.compose(&set.map(&total, false)?)?
            },
            None => set,
        });
        self.pos = 0;
        Ok(())
    }
}
