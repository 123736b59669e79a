use snafu::Snafu;

/// Errors from building, combining, and applying change sets.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum ChangeError {
    #[snafu(display("mismatched change set length (got {found}, expected {expected})"))]
    LengthMismatch { found: usize, expected: usize },

    #[snafu(display("invalid change range {from} to {to} (in doc of length {len})"))]
    InvalidRange { from: usize, to: usize, len: usize },

    #[snafu(display("invalid JSON representation of a change set: {reason}"))]
    InvalidJson { reason: String },
}
