//! Rendering one line slice onto one screen row.
//!
//! The renderer walks the line's characters tracking `curr_col`, the
//! logical column after tab expansion, and writes whatever lands inside
//! the visible column window `[from_col, from_col + num_cols)`. Every
//! logical character advances the attribute index by one, whatever its
//! width; tabs spend their attribute on each space they expand to.
//!
//! With both an attribute vector and a differential snapshot supplied,
//! only cells whose attribute changed are written; cells past the end of
//! the snapshot are written unconditionally (a line that grew must paint
//! its tail). The line is conceptually followed by infinite spaces, so a
//! short line ends with a clear-to-eol unless the caller vouches the row
//! is already clean.

use std::io::Write;

use anyhow::Result;
use core_terminal::{output_width, Attr, Screen};
use core_text::encoding::{char_at, next_pos};
use core_text::{Encoding, Line};

#[allow(clippy::too_many_arguments)]
pub fn output_line_slice<W: Write>(
    screen: &mut Screen<W>,
    row: usize,
    col: usize,
    line: &Line,
    from_col: usize,
    num_cols: usize,
    tab_size: usize,
    cleared_at_end: bool,
    encoding: Encoding,
    attrs: Option<&[Attr]>,
    diff: Option<&[Attr]>,
) -> Result<()> {
    debug_assert!(row < screen.rows() - 1 && col < screen.cols());

    let s = line.as_bytes();
    let cols = screen.cols() as isize;
    let col = col as isize;
    let from_col = from_col as isize;
    let num_cols = num_cols as isize;
    let utf8 = encoding.is_utf8();

    let mut curr_col: isize = 0;
    let mut pos = 0usize;
    let mut attr_pos = 0usize;

    while curr_col - from_col < num_cols && pos < s.len() {
        // Actual screen column of this character's first cell.
        let output_col = col + curr_col - from_col;
        let attr_of = |ap: usize| attrs.map_or(Attr::default(), |a| a[ap]);

        if s[pos] == b'\t' {
            let tab_width = tab_size - (curr_col.rem_euclid(tab_size as isize)) as usize;
            for i in 0..tab_width as isize {
                if curr_col + i >= from_col && curr_col + i < from_col + num_cols {
                    screen.move_cursor(row, (output_col + i) as usize)?;
                    screen.output_char(u32::from(b' '), Some(attr_of(attr_pos)), false)?;
                }
            }
            curr_col += tab_width as isize;
        } else {
            let c = char_at(s, pos, encoding);
            let c_width = output_width(c) as isize;

            // A character is drawn when it starts inside the window, or
            // straddles its left edge while still starting on screen.
            if output_col >= col || output_col + c_width > col && output_col >= 0 {
                if output_col + c_width <= cols {
                    let changed = match (attrs, diff) {
                        (Some(a), Some(d)) => {
                            attr_pos >= d.len() || d[attr_pos] != a[attr_pos]
                        }
                        _ => true,
                    };
                    if changed {
                        screen.move_cursor(row, output_col as usize)?;
                        screen.output_char(c, Some(attr_of(attr_pos)), utf8)?;
                    }
                } else {
                    // Too wide to fit: spaces stand in for the visible part.
                    screen.move_cursor(row, output_col as usize)?;
                    let attr = attrs.map(|a| a[attr_pos]);
                    screen.output_spaces((cols - output_col) as usize, attr.as_ref())?;
                }
            }
            curr_col += c_width;
        }
        pos = next_pos(s, pos, encoding);
        attr_pos += 1;
    }

    // The infinite tail of spaces: clear whatever of the window the line
    // did not reach.
    if curr_col < from_col + num_cols && !cleared_at_end {
        let rest = if curr_col - from_col <= 0 {
            0
        } else {
            curr_col - from_col
        };
        screen.move_cursor(row, (col + rest) as usize)?;
        screen.clear_to_eol()?;
    }
    Ok(())
}
