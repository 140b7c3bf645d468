//! The status line on the bottom row.
//!
//! The bottom row is outside the text window and is the one piece of
//! chrome this engine draws: buffer name, position, a modified marker. It
//! repaints only when flagged, in standout.

use std::io::Write;

use anyhow::Result;
use core_terminal::Screen;
use core_text::{calc_width, Buffer};

#[derive(Debug, Default)]
pub struct StatusBar {
    needs_update: bool,
}

impl StatusBar {
    pub fn reset(&mut self) {
        self.needs_update = true;
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    pub fn draw<W: Write>(&mut self, screen: &mut Screen<W>, b: &Buffer) -> Result<()> {
        if !self.needs_update {
            return Ok(());
        }

        let col = b
            .line(b.cur_line)
            .map_or(0, |l| calc_width(l, b.cur_pos, b.tab_size, b.encoding));
        let mut text = format!(
            " L:{:<6} C:{:<5} {}{}",
            b.cur_line + 1,
            col + 1,
            if b.modified { "*" } else { " " },
            b.name,
        );
        // Pad into the row, leaving the last cell alone (autowrap).
        let max = screen.cols() - 1;
        let len = text.chars().count();
        if len > max {
            text = text.chars().take(max).collect();
        } else {
            text.extend(std::iter::repeat(' ').take(max - len));
        }

        let last = screen.rows() - 1;
        screen.move_cursor(last, 0)?;
        screen.standout_on();
        screen.output_string(&text, true)?;
        screen.standout_off();
        self.needs_update = false;
        Ok(())
    }
}
