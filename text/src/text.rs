//! The document tree: an immutable, structure-sharing rope of lines.
//!
//! A document is a tree of [`Node`]s. Leaves store runs of line strings,
//! branches store child trees; the line break between two adjacent leaf
//! strings (or two adjacent children) is implicit and counts one code unit.
//! Every operation that "modifies" a document builds a new tree that shares
//! as many nodes as possible with the old one.

use crate::{
    code_unit,
    error::TextError,
    iter::{Direction, LineIter, PartialIter, TextIter},
    line::Line,
};
use std::{
    fmt,
    sync::{Arc, OnceLock},
};

/// Target branching factor: maximum lines per leaf and children per branch.
const BRANCH: usize = 32;
const BRANCH_SHIFT: usize = 5;

/// Left edge of a decomposed piece is interior and must merge into the
/// previous target entry.
const OPEN_FROM: u8 = 1;
/// Right edge is interior; the piece must end in a leaf a later open-from
/// piece can merge into.
const OPEN_TO: u8 = 2;

pub(crate) enum Node {
    Leaf {
        lines: Vec<String>,
        /// Code units, counting one per implicit break between lines.
        len: usize,
    },
    Branch {
        children: Vec<Text>,
        len: usize,
        lines: usize,
    },
}

/// An immutable document. Cloning is reference-count only.
#[derive(Clone)]
pub struct Text(pub(crate) Arc<Node>);

impl Text {
    /// The shared empty document: a single empty line, length 0.
    pub fn empty() -> Text {
        static EMPTY: OnceLock<Text> = OnceLock::new();
        EMPTY
            .get_or_init(|| {
                Text(Arc::new(Node::Leaf {
                    lines: vec![String::new()],
                    len: 0,
                }))
            })
            .clone()
    }

    /// Build a document from line strings. The line breaks between entries
    /// are implicit; no entry may contain a line break.
    ///
    /// Panics when given no lines at all.
    pub fn of<I>(lines: I) -> Text
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        assert!(!lines.is_empty(), "a document must have at least one line");
        if lines.len() == 1 && lines[0].is_empty() {
            return Text::empty();
        }
        if lines.len() <= BRANCH {
            return leaf(lines);
        }
        let mut leaves = Vec::new();
        split_into_leaves(lines, &mut leaves);
        let len = total_len(&leaves);
        from_children(leaves, len)
    }

    /// Length of the document in UTF-16 code units, counting one unit per
    /// line break.
    pub fn len(&self) -> usize {
        match self.0.as_ref() {
            Node::Leaf { len, .. } => *len,
            Node::Branch { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of lines. At least 1: the empty document is one empty line.
    pub fn lines(&self) -> usize {
        match self.0.as_ref() {
            Node::Leaf { lines, .. } => lines.len(),
            Node::Branch { lines, .. } => *lines,
        }
    }

    /// The line around the given position.
    pub fn line_at(&self, pos: usize) -> Result<Line<'_>, TextError> {
        if pos > self.len() {
            return Err(TextError::PositionOutOfRange {
                pos,
                len: self.len(),
            });
        }
        Ok(self.line_inner(pos, false))
    }

    /// The 1-based `number`th line.
    pub fn line(&self, number: usize) -> Result<Line<'_>, TextError> {
        if number < 1 || number > self.lines() {
            return Err(TextError::LineOutOfRange {
                line: number,
                lines: self.lines(),
            });
        }
        Ok(self.line_inner(number, true))
    }

    fn line_inner(&self, target: usize, is_line: bool) -> Line<'_> {
        let mut node = self;
        let mut line = 1;
        let mut offset = 0;
        loop {
            match node.0.as_ref() {
                Node::Leaf { lines, .. } => {
                    for string in lines {
                        let end = offset + code_unit::len(string);
                        if (if is_line { line } else { end }) >= target {
                            return Line {
                                from: offset,
                                to: end,
                                number: line,
                                text: string,
                            };
                        }
                        offset = end + 1;
                        line += 1;
                    }
                    unreachable!("line target is validated against document bounds")
                },
                Node::Branch { children, .. } => {
                    let mut found = None;
                    for child in children {
                        let end = offset + child.len();
                        let end_line = line + child.lines() - 1;
                        if (if is_line { end_line } else { end }) >= target {
                            found = Some(child);
                            break;
                        }
                        offset = end + 1;
                        line = end_line + 1;
                    }
                    node = found.expect("line target is validated against document bounds");
                },
            }
        }
    }

    /// Replace the range `from..to` with another document, producing a new
    /// document that shares structure with both inputs.
    pub fn replace(&self, from: usize, to: usize, text: &Text) -> Result<Text, TextError> {
        if from > to || to > self.len() {
            return Err(TextError::RangeOutOfRange {
                from,
                to,
                len: self.len(),
            });
        }
        Ok(self.replace_inner(from, to, text))
    }

    fn replace_inner(&self, from: usize, to: usize, text: &Text) -> Text {
        if let Some(updated) = self.replace_local(from, to, text) {
            return updated;
        }
        let mut parts = Vec::new();
        self.decompose(0, from as i64, &mut parts, OPEN_TO);
        if text.len() > 0 {
            text.decompose(0, text.len() as i64, &mut parts, OPEN_FROM | OPEN_TO);
        }
        self.decompose(to as i64, self.len() as i64, &mut parts, OPEN_FROM);
        from_children(parts, self.len() - (to - from) + text.len())
    }

    /// When a change falls inside a single child and leaves that child's
    /// share of the tree roughly stable, only that child is rebuilt.
    fn replace_local(&self, from: usize, to: usize, text: &Text) -> Option<Text> {
        let Node::Branch { children, len, lines } = self.0.as_ref() else {
            return None;
        };
        if text.lines() >= *lines {
            return None;
        }
        let mut pos = 0;
        for (i, child) in children.iter().enumerate() {
            let end = pos + child.len();
            if from >= pos && to <= end {
                let updated = child.replace_inner(from - pos, to - pos, text);
                let total_lines = lines - child.lines() + updated.lines();
                if updated.lines() < (total_lines >> (BRANCH_SHIFT - 1))
                    && updated.lines() > (total_lines >> (BRANCH_SHIFT + 1))
                {
                    let mut copy = children.clone();
                    copy[i] = updated;
                    return Some(Text(Arc::new(Node::Branch {
                        children: copy,
                        len: len - (to - from) + text.len(),
                        lines: total_lines,
                    })));
                }
                return None;
            }
            pos = end + 1;
        }
        None
    }

    /// The sub-document covering `from..to`. Bounds are clamped.
    pub fn slice(&self, from: usize, to: usize) -> Text {
        let to = to.min(self.len());
        let from = from.min(to);
        let mut parts = Vec::new();
        self.decompose(from as i64, to as i64, &mut parts, 0);
        from_children(parts, to - from)
    }

    /// Concatenate another document onto this one, with a line break between
    /// the last line of `self` and the first line of `other` only if both
    /// came from separate lines (the join merges the boundary lines).
    pub fn append(&self, other: &Text) -> Text {
        self.replace_inner(self.len(), self.len(), other)
    }

    /// Render `from..to` as a string, joining lines with `line_sep`.
    /// Bounds are clamped.
    pub fn slice_string(&self, from: usize, to: usize, line_sep: &str) -> String {
        let to = to.min(self.len());
        let from = from.min(to);
        let mut out = String::new();
        self.slice_string_into(from as i64, to as i64, line_sep, &mut out);
        out
    }

    fn slice_string_into(&self, from: i64, to: i64, line_sep: &str, out: &mut String) {
        match self.0.as_ref() {
            Node::Leaf { lines, .. } => {
                let mut pos: i64 = 0;
                for (i, line) in lines.iter().enumerate() {
                    if pos > to {
                        break;
                    }
                    let line_len = code_unit::len(line) as i64;
                    let end = pos + line_len;
                    if pos > from && i > 0 {
                        out.push_str(line_sep);
                    }
                    if from < end && to > pos {
                        out.push_str(code_unit::slice(
                            line,
                            (from - pos).max(0) as usize,
                            (to - pos).min(line_len) as usize,
                        ));
                    }
                    pos = end + 1;
                }
            },
            Node::Branch { children, .. } => {
                let mut pos: i64 = 0;
                for (i, child) in children.iter().enumerate() {
                    if pos > to {
                        break;
                    }
                    let end = pos + child.len() as i64;
                    if pos > from && i > 0 {
                        out.push_str(line_sep);
                    }
                    if from <= end && to >= pos {
                        child.slice_string_into(from - pos, to - pos, line_sep, out);
                    }
                    pos = end + 1;
                }
            },
        }
    }

    /// Append every line of the document to `target`.
    pub fn flatten(&self, target: &mut Vec<String>) {
        match self.0.as_ref() {
            Node::Leaf { lines, .. } => target.extend(lines.iter().cloned()),
            Node::Branch { children, .. } => {
                for child in children {
                    child.flatten(target);
                }
            },
        }
    }

    /// The document as an array of line strings.
    pub fn to_json(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.lines());
        self.flatten(&mut lines);
        lines
    }

    /// Rebuild a document from its [`to_json`](Text::to_json) form.
    ///
    /// Panics when given no lines, like [`Text::of`].
    pub fn from_json(lines: Vec<String>) -> Text {
        Text::of(lines)
    }

    /// Iterate the document's content: line chunks alternating with `"\n"`
    /// line break chunks.
    pub fn iter(&self) -> TextIter<'_> {
        TextIter::new(self, 1)
    }

    /// Like [`iter`](Text::iter), in the given direction.
    pub fn iter_dir(&self, dir: Direction) -> TextIter<'_> {
        TextIter::new(self, dir.delta())
    }

    /// Iterate the content between two positions. When `from > to` the
    /// iteration runs backward.
    pub fn iter_range(&self, from: usize, to: usize) -> PartialIter<'_> {
        PartialIter::new(self, from, to)
    }

    /// Iterate whole lines, including empty ones.
    pub fn iter_lines(&self) -> LineIter<'_> {
        LineIter::over(self)
    }

    /// Iterate the lines numbered `from..to` (1-based, `to` exclusive).
    pub fn iter_lines_range(&self, from: usize, to: usize) -> Result<LineIter<'_>, TextError> {
        let start = self.line(from)?.from;
        let end = if to == self.lines() + 1 {
            self.len()
        } else if to <= 1 {
            0
        } else {
            self.line(to - 1)?.to
        };
        Ok(LineIter::over_range(self, start, start.max(end)))
    }

    /// Append nodes covering `from..to` to `target`. The open flags mark
    /// interior boundaries: an open edge must end in (or merge with) a plain
    /// leaf so adjacent pieces can be joined without a line break.
    fn decompose(&self, from: i64, to: i64, target: &mut Vec<Text>, open: u8) {
        match self.0.as_ref() {
            Node::Leaf { lines, len } => {
                let piece = if from <= 0 && to >= *len as i64 {
                    self.clone()
                } else {
                    let piece_len = (to.min(*len as i64) - from.max(0)) as usize;
                    Text(Arc::new(Node::Leaf {
                        lines: slice_lines(lines, from.max(0) as usize, to.min(*len as i64) as usize),
                        len: piece_len,
                    }))
                };
                if open & OPEN_FROM != 0 {
                    let prev = target
                        .pop()
                        .expect("an open-from piece always follows a prefix");
                    let (prev_lines, prev_len) = match prev.0.as_ref() {
                        Node::Leaf { lines, len } => (lines, *len),
                        Node::Branch { .. } => {
                            unreachable!("open-to decomposition always ends in a leaf")
                        },
                    };
                    let piece_len = piece.len();
                    let piece_lines = match piece.0.as_ref() {
                        Node::Leaf { lines, .. } => lines,
                        Node::Branch { .. } => unreachable!("leaf decomposition yields leaves"),
                    };
                    let mut joined = prev_lines.clone();
                    append_lines(piece_lines, &mut joined, 0, usize::MAX);
                    if joined.len() <= BRANCH {
                        target.push(Text(Arc::new(Node::Leaf {
                            lines: joined,
                            len: prev_len + piece_len,
                        })));
                    } else {
                        let mid = joined.len() >> 1;
                        let right = joined.split_off(mid);
                        target.push(leaf(joined));
                        target.push(leaf(right));
                    }
                } else {
                    target.push(piece);
                }
            },
            Node::Branch { children, .. } => {
                let mut pos: i64 = 0;
                for child in children {
                    if pos > to {
                        break;
                    }
                    let end = pos + child.len() as i64;
                    if from <= end && to >= pos {
                        let mut edges = 0;
                        if pos <= from {
                            edges |= OPEN_FROM;
                        }
                        if end >= to {
                            edges |= OPEN_TO;
                        }
                        let child_open = open & edges;
                        if pos >= from && end <= to && child_open == 0 {
                            target.push(child.clone());
                        } else {
                            child.decompose(from - pos, to - pos, target, child_open);
                        }
                    }
                    pos = end + 1;
                }
            },
        }
    }

    /// Length of the identical prefix (`dir > 0`) or suffix (`dir < 0`)
    /// shared by reference with `other`.
    fn scan_identical(&self, other: &Text, dir: i64) -> usize {
        match (self.0.as_ref(), other.0.as_ref()) {
            (Node::Branch { children: ca, .. }, Node::Branch { children: cb, .. }) => {
                let mut length = 0;
                let (mut ia, ea) = if dir > 0 {
                    (0i64, ca.len() as i64)
                } else {
                    (ca.len() as i64 - 1, -1)
                };
                let (mut ib, eb) = if dir > 0 {
                    (0i64, cb.len() as i64)
                } else {
                    (cb.len() as i64 - 1, -1)
                };
                loop {
                    if ia == ea || ib == eb {
                        return length;
                    }
                    let cha = &ca[ia as usize];
                    let chb = &cb[ib as usize];
                    if !Arc::ptr_eq(&cha.0, &chb.0) {
                        return length + cha.scan_identical(chb, dir);
                    }
                    length += cha.len() + 1;
                    ia += dir;
                    ib += dir;
                }
            },
            _ => 0,
        }
    }
}

impl PartialEq for Text {
    /// Content equality. Shared subtrees at either end are skipped by
    /// reference comparison; only the differing interior is scanned.
    fn eq(&self, other: &Text) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        if self.len() != other.len() || self.lines() != other.lines() {
            return false;
        }
        let start = self.scan_identical(other, 1);
        let end = self.len() - self.scan_identical(other, -1);
        let mut a = TextIter::new(self, 1);
        let mut b = TextIter::new(other, 1);
        let mut skip = start;
        let mut pos = start;
        loop {
            a.next_skip(skip);
            b.next_skip(skip);
            skip = 0;
            if a.is_line_break() != b.is_line_break()
                || a.is_done() != b.is_done()
                || a.value() != b.value()
            {
                return false;
            }
            pos += code_unit::len(a.value());
            if a.is_done() || pos >= end {
                return true;
            }
        }
    }
}

impl Eq for Text {}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.iter() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Text({:?})", self.to_string())
    }
}

impl From<&str> for Text {
    fn from(text: &str) -> Self {
        Text::of(split_lines(text))
    }
}

/// Split a string into lines on `"\r\n"`, `"\r"`, or `"\n"`, the default
/// separator set used when building change insertions from plain strings.
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\n' => lines.push(std::mem::take(&mut current)),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                lines.push(std::mem::take(&mut current));
            },
            _ => current.push(ch),
        }
    }
    lines.push(current);
    lines
}

fn leaf(lines: Vec<String>) -> Text {
    let len = lines.iter().map(|l| code_unit::len(l)).sum::<usize>() + lines.len() - 1;
    Text(Arc::new(Node::Leaf { lines, len }))
}

fn total_len(children: &[Text]) -> usize {
    children.iter().map(Text::len).sum::<usize>() + children.len() - 1
}

/// Pack line strings into leaves of at most [`BRANCH`] lines.
fn split_into_leaves(lines: Vec<String>, target: &mut Vec<Text>) {
    let mut part = Vec::new();
    for line in lines {
        part.push(line);
        if part.len() == BRANCH {
            target.push(leaf(std::mem::take(&mut part)));
        }
    }
    if !part.is_empty() {
        target.push(leaf(part));
    }
}

/// Assemble children into a balanced tree: small leaves are concatenated,
/// oversized branches are flattened, and the rest is grouped into chunks of
/// roughly `lines / 32` lines each.
fn from_children(children: Vec<Text>, len: usize) -> Text {
    let lines: usize = children.iter().map(Text::lines).sum();
    if lines < BRANCH {
        let mut flat = Vec::with_capacity(lines);
        for child in &children {
            child.flatten(&mut flat);
        }
        return Text(Arc::new(Node::Leaf { lines: flat, len }));
    }
    let chunk = BRANCH.max(lines >> BRANCH_SHIFT);
    let mut chunker = Chunker {
        chunk,
        max_chunk: chunk << 1,
        min_chunk: chunk >> 1,
        chunked: Vec::new(),
        current: Vec::new(),
        current_lines: 0,
    };
    for child in children {
        chunker.add(child);
    }
    chunker.flush();
    let mut chunked = chunker.chunked;
    if chunked.len() == 1 {
        chunked.pop().expect("flush emits at least one chunk")
    } else {
        Text(Arc::new(Node::Branch {
            children: chunked,
            len,
            lines,
        }))
    }
}

struct Chunker {
    chunk: usize,
    max_chunk: usize,
    min_chunk: usize,
    chunked: Vec<Text>,
    current: Vec<Text>,
    current_lines: usize,
}

impl Chunker {
    fn add(&mut self, child: Text) {
        if child.lines() > self.max_chunk {
            if let Node::Branch { children, .. } = child.0.as_ref() {
                for sub in children {
                    self.add(sub.clone());
                }
                return;
            }
        }
        if child.lines() > self.min_chunk && (self.current_lines > self.min_chunk || self.current_lines == 0)
        {
            self.flush();
            self.chunked.push(child);
            return;
        }
        let merged = match (child.0.as_ref(), self.current.last().map(|t| t.0.as_ref())) {
            (
                Node::Leaf { lines: child_lines, len: child_len },
                Some(Node::Leaf { lines: last_lines, len: last_len }),
            ) if self.current_lines > 0 && last_lines.len() + child_lines.len() <= BRANCH => {
                let mut joined = last_lines.clone();
                joined.extend(child_lines.iter().cloned());
                Some(Text(Arc::new(Node::Leaf {
                    lines: joined,
                    len: last_len + 1 + child_len,
                })))
            },
            _ => None,
        };
        if let Some(merged) = merged {
            self.current_lines += child.lines();
            *self.current.last_mut().expect("merge requires a previous leaf") = merged;
            return;
        }
        if self.current_lines + child.lines() > self.chunk {
            self.flush();
        }
        self.current_lines += child.lines();
        self.current.push(child);
    }

    fn flush(&mut self) {
        if self.current_lines == 0 {
            return;
        }
        let node = if self.current.len() == 1 {
            self.current.pop().expect("one entry")
        } else {
            let children = std::mem::take(&mut self.current);
            let len = total_len(&children);
            from_children(children, len)
        };
        self.chunked.push(node);
        self.current.clear();
        self.current_lines = 0;
    }
}

/// Append the UTF-16 window `from..to` of `lines` onto `target`, joining the
/// first emitted piece onto `target`'s last line (the boundary between them
/// is not a line break).
fn append_lines(lines: &[String], target: &mut Vec<String>, from: usize, to: usize) {
    let mut pos = 0;
    let mut first = true;
    for line in lines {
        if pos > to {
            break;
        }
        let line_len = code_unit::len(line);
        let end = pos + line_len;
        if end >= from {
            let start16 = from.saturating_sub(pos);
            let end16 = if end > to { to - pos } else { line_len };
            let piece = code_unit::slice(line, start16, end16);
            if first {
                target
                    .last_mut()
                    .expect("append target starts with one line")
                    .push_str(piece);
                first = false;
            } else {
                target.push(piece.to_string());
            }
        }
        pos = end + 1;
    }
}

fn slice_lines(lines: &[String], from: usize, to: usize) -> Vec<String> {
    let mut target = vec![String::new()];
    append_lines(lines, &mut target, from, to);
    target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(lines: usize) -> Text {
        Text::of((0..lines).map(|i| format!("line {i}")))
    }

    #[test]
    fn length_counts_content_and_breaks() {
        let text = Text::of(["one", "two", "three"]);
        assert_eq!(text.len(), 3 + 1 + 3 + 1 + 5);
        assert_eq!(text.lines(), 3);
    }

    #[test]
    fn empty_document_is_one_empty_line() {
        let empty = Text::empty();
        assert_eq!(empty.len(), 0);
        assert_eq!(empty.lines(), 1);
        assert_eq!(Text::of([""]), empty);
    }

    #[test]
    fn astral_characters_count_two_units() {
        let text = Text::of(["a\u{1F600}b"]);
        assert_eq!(text.len(), 4);
    }

    #[test]
    fn line_lookup_by_position() {
        let text = Text::of(["one", "two", "three"]);
        let line = text.line_at(5).unwrap();
        assert_eq!(line.number, 2);
        assert_eq!(line.text, "two");
        assert_eq!(line.from, 4);
        assert_eq!(line.to, 7);
    }

    #[test]
    fn line_lookup_at_break_belongs_to_previous_line() {
        let text = Text::of(["ab", "cd"]);
        let line = text.line_at(2).unwrap();
        assert_eq!(line.number, 1);
        assert_eq!(text.line_at(3).unwrap().number, 2);
    }

    #[test]
    fn line_lookup_by_number() {
        let text = doc(100);
        let line = text.line(40).unwrap();
        assert_eq!(line.number, 40);
        assert_eq!(line.text, "line 39");
    }

    #[test]
    fn line_lookup_out_of_range() {
        let text = Text::of(["ab"]);
        assert!(text.line_at(3).is_err());
        assert!(text.line(0).is_err());
        assert!(text.line(2).is_err());
    }

    #[test]
    fn replace_within_line() {
        let text = Text::of(["hello world"]);
        let updated = text.replace(6, 11, &Text::of(["editor"])).unwrap();
        assert_eq!(updated.to_string(), "hello editor");
    }

    #[test]
    fn replace_across_lines() {
        let text = Text::of(["one", "two", "three"]);
        let updated = text.replace(2, 9, &Text::of(["X"])).unwrap();
        assert_eq!(updated.to_string(), "onXhree");
        assert_eq!(updated.lines(), 1);
    }

    #[test]
    fn replace_inserting_lines() {
        let text = Text::of(["ab"]);
        let updated = text.replace(1, 1, &Text::of(["x", "y"])).unwrap();
        assert_eq!(updated.to_string(), "ax\nyb");
        assert_eq!(updated.lines(), 2);
    }

    #[test]
    fn replace_out_of_range() {
        let text = Text::of(["ab"]);
        assert!(text.replace(1, 0, &Text::empty()).is_err());
        assert!(text.replace(0, 3, &Text::empty()).is_err());
    }

    #[test]
    fn replace_equals_delete_then_insert() {
        let text = doc(80);
        let insert = Text::of(["first", "second"]);
        let (a, b) = (57, 123);
        let replaced = text.replace(a, b, &insert).unwrap();
        let spliced = text
            .replace(a, b, &Text::empty())
            .unwrap()
            .replace(a, a, &insert)
            .unwrap();
        assert_eq!(replaced, spliced);
    }

    #[test]
    fn slice_round_trips() {
        let text = doc(150);
        assert_eq!(text.slice(0, text.len()), text);
        let slice = text.slice(10, 300);
        assert_eq!(slice.len(), 290);
        assert_eq!(slice.to_string(), text.to_string()[10..300].to_string());
    }

    #[test]
    fn append_joins_boundary_lines() {
        let a = Text::of(["one", "two"]);
        let b = Text::of(["three", "four"]);
        let joined = a.append(&b);
        assert_eq!(joined.to_string(), "one\ntwothree\nfour");
        assert_eq!(joined.lines(), 3);
    }

    #[test]
    fn large_documents_stay_balanced() {
        let text = doc(5000);
        assert_eq!(text.lines(), 5000);
        fn depth(text: &Text) -> usize {
            match text.0.as_ref() {
                Node::Leaf { .. } => 1,
                Node::Branch { children, .. } => {
                    1 + children.iter().map(depth).max().unwrap_or(0)
                },
            }
        }
        fn check(text: &Text) {
            match text.0.as_ref() {
                Node::Leaf { lines, .. } => {
                    assert!(!lines.is_empty() && lines.len() <= BRANCH)
                },
                Node::Branch { children, len, lines } => {
                    assert!(children.len() >= 2);
                    assert_eq!(*len, total_len(children));
                    assert_eq!(*lines, children.iter().map(Text::lines).sum::<usize>());
                    for child in children {
                        check(child);
                    }
                },
            }
        }
        check(&text);
        assert!(depth(&text) <= 4, "depth {} too deep", depth(&text));
    }

    #[test]
    fn repeated_edits_share_structure() {
        let mut text = doc(3000);
        for i in 0..50 {
            let pos = (i * 211) % text.len();
            text = text.replace(pos, pos, &Text::of(["!"])).unwrap();
        }
        assert_eq!(text.len(), doc(3000).len() + 50);
        assert_eq!(text.lines(), 3000);
    }

    #[test]
    fn equality_ignores_tree_shape() {
        let flat = Text::of(["a", "b", "c"]);
        let built = Text::of(["a"])
            .append(&Text::of(["", "b"]))
            .append(&Text::of(["", "c"]));
        assert_eq!(built.to_string(), "a\nb\nc");
        assert_eq!(flat, built);
        assert_ne!(flat, Text::of(["a", "b", "d"]));
    }

    #[test]
    fn slice_string_joins_with_separator() {
        let text = Text::of(["one", "two", "three"]);
        assert_eq!(text.slice_string(0, text.len(), "|"), "one|two|three");
        assert_eq!(text.slice_string(2, 5, "\n"), "e\nt");
        assert_eq!(text.slice_string(3, 4, "\n"), "\n");
    }

    #[test]
    fn json_round_trip() {
        let lines = vec!["a".to_string(), String::new(), "c".to_string()];
        let text = Text::from_json(lines.clone());
        assert_eq!(text.to_json(), lines);
    }

    #[test]
    fn split_lines_handles_all_separators() {
        assert_eq!(split_lines("a\nb\r\nc\rd"), ["a", "b", "c", "d"]);
        assert_eq!(split_lines(""), [""]);
        assert_eq!(split_lines("a\n"), ["a", ""]);
    }
}
