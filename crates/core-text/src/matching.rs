//! Bracket matching within a line range.
//!
//! The search runs only over the lines the caller names (in practice the
//! visible window): matching is a display affordance here, not a motion
//! command, and scanning a multi-megabyte buffer for an unbalanced brace
//! would stall the redraw.

use crate::encoding::{char_at, next_pos};
use crate::Buffer;

const OPENING: &[u8] = b"([{<";
const CLOSING: &[u8] = b")]}>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketMatch {
    pub line: usize,
    pub byte_pos: usize,
    /// Logical character index of the match within its line.
    pub char_pos: usize,
    pub c: u32,
}

fn char_positions(line: &[u8], enc: crate::Encoding) -> Vec<usize> {
    let mut v = Vec::new();
    let mut pos = 0;
    while pos < line.len() {
        v.push(pos);
        pos = next_pos(line, pos, enc);
    }
    v
}

/// Finds the bracket balancing the one under the cursor, looking only at
/// lines `first_line..=last_line`. Nesting counts brackets of the same
/// kind only.
pub fn find_matching_bracket(
    b: &Buffer,
    first_line: usize,
    last_line: usize,
) -> Option<BracketMatch> {
    let enc = b.encoding;
    let cur = b.line(b.cur_line)?;
    if b.cur_pos >= cur.len() {
        return None;
    }
    let under = cur.as_bytes()[b.cur_pos];

    let (kind, forward) = if let Some(k) = OPENING.iter().position(|&o| o == under) {
        (k, true)
    } else if let Some(k) = CLOSING.iter().position(|&c| c == under) {
        (k, false)
    } else {
        return None;
    };
    let (own, other) = if forward {
        (OPENING[kind], CLOSING[kind])
    } else {
        (CLOSING[kind], OPENING[kind])
    };

    let mut depth = 1usize;

    if forward {
        for idx in b.cur_line..=last_line.min(b.line_count().saturating_sub(1)) {
            let line = b.line(idx)?;
            let positions = char_positions(line.as_bytes(), enc);
            for (char_pos, &pos) in positions.iter().enumerate() {
                if idx == b.cur_line && pos <= b.cur_pos {
                    continue;
                }
                let byte = line.as_bytes()[pos];
                if byte == own {
                    depth += 1;
                } else if byte == other {
                    depth -= 1;
                    if depth == 0 {
                        return Some(BracketMatch {
                            line: idx,
                            byte_pos: pos,
                            char_pos,
                            c: char_at(line.as_bytes(), pos, enc),
                        });
                    }
                }
            }
        }
    } else {
        for idx in (first_line..=b.cur_line).rev() {
            let line = b.line(idx)?;
            let positions = char_positions(line.as_bytes(), enc);
            for (char_pos, &pos) in positions.iter().enumerate().rev() {
                if idx == b.cur_line && pos >= b.cur_pos {
                    continue;
                }
                let byte = line.as_bytes()[pos];
                if byte == own {
                    depth += 1;
                } else if byte == other {
                    depth -= 1;
                    if depth == 0 {
                        return Some(BracketMatch {
                            line: idx,
                            byte_pos: pos,
                            char_pos,
                            c: char_at(line.as_bytes(), pos, enc),
                        });
                    }
                }
            }
        }
    }
    None
}
