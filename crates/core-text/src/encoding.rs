//! Byte-level character access for the three supported encodings.

use core_terminal::{output_width, utf8};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Ascii,
    EightBit,
    Utf8,
}

impl Encoding {
    pub fn is_utf8(self) -> bool {
        matches!(self, Encoding::Utf8)
    }
}

/// Byte position of the character after the one at `pos`.
pub fn next_pos(s: &[u8], pos: usize, encoding: Encoding) -> usize {
    if encoding.is_utf8() {
        pos + utf8::seq_len(s[pos])
    } else {
        pos + 1
    }
}

/// Code point of the character at byte `pos`.
pub fn char_at(s: &[u8], pos: usize, encoding: Encoding) -> u32 {
    if encoding.is_utf8() {
        utf8::decode(&s[pos..])
    } else {
        u32::from(s[pos])
    }
}

/// Display width of the character at byte `pos`.
pub fn char_width_at(s: &[u8], pos: usize, encoding: Encoding) -> usize {
    output_width(char_at(s, pos, encoding))
}

/// Number of logical characters in `s`.
pub fn char_len(s: &[u8], encoding: Encoding) -> usize {
    if encoding.is_utf8() {
        utf8::str_len(s)
    } else {
        s.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_steps_whole_sequences() {
        let s = "aé€".as_bytes();
        assert_eq!(next_pos(s, 0, Encoding::Utf8), 1);
        assert_eq!(next_pos(s, 1, Encoding::Utf8), 3);
        assert_eq!(char_at(s, 1, Encoding::Utf8), u32::from('é'));
        assert_eq!(char_len(s, Encoding::Utf8), 3);
        assert_eq!(char_len(s, Encoding::EightBit), 6);
    }
}
