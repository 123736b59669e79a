use snafu::Snafu;

/// Errors from position- or line-addressed document operations.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum TextError {
    #[snafu(display("invalid position {pos} in document of length {len}"))]
    PositionOutOfRange { pos: usize, len: usize },

    #[snafu(display("invalid line number {line} in {lines}-line document"))]
    LineOutOfRange { line: usize, lines: usize },

    #[snafu(display("invalid range {from}..{to} in document of length {len}"))]
    RangeOutOfRange { from: usize, to: usize, len: usize },
}
