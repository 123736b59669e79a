//! UTF-16 code unit accounting over UTF-8 strings.
//!
//! All document positions and lengths in this library count UTF-16 code
//! units, while line content is stored as Rust strings. These helpers map
//! between the two domains.

/// Length of `s` in UTF-16 code units.
pub fn len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

/// Byte index of the UTF-16 offset `offset` in `s`.
///
/// Offsets past the end of the string resolve to `s.len()`. An offset that
/// falls between the two units of a surrogate pair resolves to the start of
/// the containing character; Rust strings cannot hold lone surrogates.
pub fn to_byte_index(s: &str, offset: usize) -> usize {
    let mut units = 0;
    for (bytes, ch) in s.char_indices() {
        if units >= offset {
            return bytes;
        }
        let width = ch.len_utf16();
        if units + width > offset {
            return bytes;
        }
        units += width;
    }
    s.len()
}

/// Slice `s` by a UTF-16 code unit range.
pub fn slice(s: &str, from: usize, to: usize) -> &str {
    let start = to_byte_index(s, from);
    let end = to_byte_index(s, to.max(from));
    &s[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_lengths_match_bytes() {
        assert_eq!(len("hello"), 5);
        assert_eq!(to_byte_index("hello", 3), 3);
        assert_eq!(slice("hello", 1, 4), "ell");
    }

    #[test]
    fn astral_characters_count_two_units() {
        let s = "a\u{1F600}b";
        assert_eq!(len(s), 4);
        assert_eq!(slice(s, 0, 1), "a");
        assert_eq!(slice(s, 1, 3), "\u{1F600}");
        assert_eq!(slice(s, 3, 4), "b");
    }

    #[test]
    fn offset_inside_surrogate_pair_resolves_to_char_start() {
        let s = "\u{1F600}x";
        assert_eq!(to_byte_index(s, 1), 0);
        assert_eq!(to_byte_index(s, 2), 4);
    }

    #[test]
    fn offsets_past_end_clamp() {
        assert_eq!(to_byte_index("ab", 10), 2);
        assert_eq!(slice("ab", 1, 10), "b");
    }
}
