//! Tab-expanded line geometry.
//!
//! The width function is the single source of truth for how many columns a
//! prefix of a line occupies: tabs expand to the next stop, every other
//! character contributes its display width, and positions past the end of
//! the line follow the convention of an infinite tail of spaces.

use crate::encoding::{char_width_at, next_pos, Encoding};
use crate::Line;

/// Columns occupied by the first `n` logical characters of `line`.
pub fn calc_width(line: &Line, n: usize, tab_size: usize, encoding: Encoding) -> usize {
    let s = line.as_bytes();
    let mut width = 0;
    let mut pos = 0;
    for _ in 0..n {
        if pos >= s.len() {
            width += 1;
            pos += 1;
        } else if s[pos] != b'\t' {
            width += char_width_at(s, pos, encoding);
            pos = next_pos(s, pos, encoding);
        } else {
            width += tab_size - width % tab_size;
            pos = next_pos(s, pos, encoding);
        }
    }
    width
}

/// Byte position of the character containing column `col`: the smallest
/// index whose cumulative width exceeds `col`, or the line length when the
/// line is narrower than the column.
pub fn calc_pos(line: &Line, col: usize, tab_size: usize, encoding: Encoding) -> usize {
    let s = line.as_bytes();
    let mut width = 0;
    let mut pos = 0;
    while pos < s.len() {
        let c_width = if s[pos] == b'\t' {
            tab_size - width % tab_size
        } else {
            char_width_at(s, pos, encoding)
        };
        if width + c_width > col {
            break;
        }
        width += c_width;
        pos = next_pos(s, pos, encoding);
    }
    pos
}

/// Logical character count of the line.
pub fn calc_char_len(line: &Line, encoding: Encoding) -> usize {
    crate::encoding::char_len(line.as_bytes(), encoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(s: &str) -> Line {
        Line::from_bytes(s.as_bytes().to_vec())
    }

    #[test]
    fn tabs_expand_to_the_next_stop() {
        let l = line("ab\tc\td");
        assert_eq!(calc_width(&l, 2, 4, Encoding::Utf8), 2);
        assert_eq!(calc_width(&l, 3, 4, Encoding::Utf8), 4);
        assert_eq!(calc_width(&l, 4, 4, Encoding::Utf8), 5);
        assert_eq!(calc_width(&l, 5, 4, Encoding::Utf8), 8);
        assert_eq!(calc_width(&l, 6, 4, Encoding::Utf8), 9);
    }

    #[test]
    fn positions_past_the_end_are_spaces() {
        let l = line("ab");
        assert_eq!(calc_width(&l, 5, 8, Encoding::Utf8), 5);
    }

    #[test]
    fn wide_characters_count_their_width() {
        let l = line("a宽b");
        assert_eq!(calc_width(&l, 2, 8, Encoding::Utf8), 3);
        assert_eq!(calc_width(&l, 3, 8, Encoding::Utf8), 4);
    }

    #[test]
    fn calc_pos_inverts_calc_width() {
        let l = line("ab\tcd");
        assert_eq!(calc_pos(&l, 0, 4, Encoding::Utf8), 0);
        assert_eq!(calc_pos(&l, 2, 4, Encoding::Utf8), 2);
        // Columns inside the tab's span still belong to the tab.
        assert_eq!(calc_pos(&l, 3, 4, Encoding::Utf8), 2);
        assert_eq!(calc_pos(&l, 4, 4, Encoding::Utf8), 3);
        assert_eq!(calc_pos(&l, 100, 4, Encoding::Utf8), 5);
    }
}
