/// A single document line, produced on demand by [`Text::line_at`] and
/// [`Text::line`].
///
/// Lines are atomic within the tree's leaves, so the line content is borrowed
/// straight from the document.
///
/// [`Text::line_at`]: crate::Text::line_at
/// [`Text::line`]: crate::Text::line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// Position of the start of the line, in UTF-16 code units.
    pub from: usize,
    /// Position of the end of the line, before the line break.
    pub to: usize,
    /// 1-based line number.
    pub number: usize,
    /// The line's content, without the line break.
    pub text: &'a str,
}

impl Line<'_> {
    /// Length of the line in UTF-16 code units. Always `to - from`.
    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }
}
