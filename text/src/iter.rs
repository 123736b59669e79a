//! Cursors over document content.
//!
//! The raw cursor walks the tree with an explicit stack; each stack entry
//! packs a child offset and a "break bit" into one value, the bit recording
//! whether the next step crosses the implicit line break between two
//! siblings or enters the next sibling. Iterators yield line chunks
//! alternating with `"\n"` break chunks; empty lines show up as adjacent
//! breaks. All cursors are finite and cannot be restarted.

use crate::{code_unit, text::Node, Text};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    pub(crate) fn delta(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

fn node_size(node: &Node) -> usize {
    match node {
        Node::Leaf { lines, .. } => lines.len(),
        Node::Branch { children, .. } => children.len(),
    }
}

/// Stack-based cursor over a whole document.
pub struct TextIter<'a> {
    dir: i64,
    nodes: Vec<&'a Node>,
    offsets: Vec<usize>,
    value: &'a str,
    line_break: bool,
    done: bool,
}

impl<'a> TextIter<'a> {
    pub(crate) fn new(text: &'a Text, dir: i64) -> Self {
        let root = text.0.as_ref();
        TextIter {
            dir,
            nodes: vec![root],
            offsets: vec![if dir > 0 { 1 } else { node_size(root) << 1 }],
            value: "",
            line_break: false,
            done: false,
        }
    }

    pub(crate) fn direction(&self) -> i64 {
        self.dir
    }

    /// The chunk produced by the last advance: a line (or part of one), or
    /// `"\n"` for a line break.
    pub fn value(&self) -> &'a str {
        self.value
    }

    pub fn is_line_break(&self) -> bool {
        self.line_break
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Advance past `skip` code units, then yield the next chunk.
    pub fn next_skip(&mut self, mut skip: usize) -> &mut Self {
        self.done = false;
        self.line_break = false;
        loop {
            let last = self.nodes.len() - 1;
            let top = self.nodes[last];
            let offset_value = self.offsets[last];
            let offset = offset_value >> 1;
            let size = node_size(top);
            let exhausted_at = if self.dir > 0 { size } else { 0 };
            let break_bit = if self.dir > 0 { 0 } else { 1 };
            if offset == exhausted_at {
                if last == 0 {
                    self.done = true;
                    self.value = "";
                    return self;
                }
                if self.dir > 0 {
                    self.offsets[last - 1] += 1;
                }
                self.nodes.pop();
                self.offsets.pop();
            } else if (offset_value & 1) == break_bit {
                // The next step crosses an implicit line break.
                if self.dir > 0 {
                    self.offsets[last] += 1;
                } else {
                    self.offsets[last] -= 1;
                }
                if skip == 0 {
                    self.line_break = true;
                    self.value = "\n";
                    return self;
                }
                skip -= 1;
            } else {
                match top {
                    Node::Leaf { lines, .. } => {
                        let ix = if self.dir < 0 { offset - 1 } else { offset };
                        let next = lines[ix].as_str();
                        if self.dir > 0 {
                            self.offsets[last] += 1;
                        } else {
                            self.offsets[last] -= 1;
                        }
                        let next_len = code_unit::len(next);
                        if next_len > skip {
                            self.value = if skip == 0 {
                                next
                            } else if self.dir > 0 {
                                code_unit::slice(next, skip, next_len)
                            } else {
                                code_unit::slice(next, 0, next_len - skip)
                            };
                            return self;
                        }
                        skip -= next_len;
                    },
                    Node::Branch { children, .. } => {
                        let ix = if self.dir < 0 { offset - 1 } else { offset };
                        let next = &children[ix];
                        if skip > next.len() {
                            skip -= next.len();
                            if self.dir > 0 {
                                self.offsets[last] += 1;
                            } else {
                                self.offsets[last] -= 1;
                            }
                        } else {
                            if self.dir < 0 {
                                self.offsets[last] -= 1;
                            }
                            let child = next.0.as_ref();
                            self.nodes.push(child);
                            self.offsets
                                .push(if self.dir > 0 { 1 } else { node_size(child) << 1 });
                        }
                    },
                }
            }
        }
    }
}

impl<'a> Iterator for TextIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.next_skip(0);
        if self.done {
            None
        } else {
            Some(self.value)
        }
    }
}

/// Cursor bounded to a position range. Built with `from > to`, it runs
/// backward.
pub struct PartialIter<'a> {
    cursor: TextIter<'a>,
    pos: i64,
    from: i64,
    to: i64,
    value: &'a str,
    done: bool,
}

impl<'a> PartialIter<'a> {
    pub(crate) fn new(text: &'a Text, start: usize, end: usize) -> Self {
        let dir = if start > end { -1 } else { 1 };
        PartialIter {
            cursor: TextIter::new(text, dir),
            pos: if start > end { text.len() as i64 } else { 0 },
            from: start.min(end) as i64,
            to: start.max(end) as i64,
            value: "",
            done: false,
        }
    }

    pub fn value(&self) -> &'a str {
        self.value
    }

    pub fn is_line_break(&self) -> bool {
        self.cursor.is_line_break() && !self.value.is_empty()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn next_skip(&mut self, skip: usize) -> &mut Self {
        let dir = self.cursor.direction();
        let past_bound = if dir < 0 {
            self.pos <= self.from
        } else {
            self.pos >= self.to
        };
        if past_bound {
            self.value = "";
            self.done = true;
            return self;
        }
        let mut skip = skip as i64
            + (if dir < 0 { self.pos - self.to } else { self.from - self.pos }).max(0);
        let mut limit = if dir < 0 { self.pos - self.from } else { self.to - self.pos };
        if skip > limit {
            skip = limit;
        }
        limit -= skip;
        self.cursor.next_skip(skip as usize);
        let value = self.cursor.value();
        let value_len = code_unit::len(value) as i64;
        self.pos += (value_len + skip) * dir;
        self.value = if value_len <= limit {
            value
        } else if dir < 0 {
            code_unit::slice(value, (value_len - limit) as usize, value_len as usize)
        } else {
            code_unit::slice(value, 0, limit as usize)
        };
        self.done = self.value.is_empty();
        self
    }
}

impl<'a> Iterator for PartialIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.done {
            return None;
        }
        self.next_skip(0);
        if self.done {
            None
        } else {
            Some(self.value)
        }
    }
}

enum LineInner<'a> {
    Raw(TextIter<'a>),
    Partial(PartialIter<'a>),
}

/// Cursor yielding whole lines, with empty strings for empty lines.
pub struct LineIter<'a> {
    inner: LineInner<'a>,
    after_break: bool,
    value: &'a str,
    done: bool,
}

impl<'a> LineIter<'a> {
    pub(crate) fn over(text: &'a Text) -> Self {
        LineIter {
            inner: LineInner::Raw(TextIter::new(text, 1)),
            after_break: true,
            value: "",
            done: false,
        }
    }

    pub(crate) fn over_range(text: &'a Text, from: usize, to: usize) -> Self {
        LineIter {
            inner: LineInner::Partial(PartialIter::new(text, from, to)),
            after_break: true,
            value: "",
            done: false,
        }
    }

    pub fn value(&self) -> &'a str {
        self.value
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    fn advance(&mut self) {
        loop {
            let (done, line_break, value) = match &mut self.inner {
                LineInner::Raw(cursor) => {
                    cursor.next_skip(0);
                    (cursor.is_done(), cursor.is_line_break(), cursor.value())
                },
                LineInner::Partial(cursor) => {
                    cursor.next_skip(0);
                    (cursor.is_done(), cursor.is_line_break(), cursor.value())
                },
            };
            if done && self.after_break {
                // A final empty line after a trailing break.
                self.value = "";
                self.after_break = false;
            } else if done {
                self.done = true;
                self.value = "";
            } else if line_break {
                if self.after_break {
                    self.value = "";
                } else {
                    self.after_break = true;
                    continue;
                }
            } else {
                self.value = value;
                self.after_break = false;
            }
            return;
        }
    }
}

impl<'a> Iterator for LineIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.done {
            return None;
        }
        self.advance();
        if self.done {
            None
        } else {
            Some(self.value)
        }
    }
}
