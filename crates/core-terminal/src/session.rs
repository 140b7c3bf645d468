//! Raw-mode session guard and window-size discovery.
//!
//! The guard guarantees the tty is returned to cooked mode on every exit
//! path, panics included; the screen-level farewell (reset modes, park the
//! cursor on the last row, clear it) is [`Screen::finalize`], which callers
//! run before the guard drops.

use std::io::Write;

use anyhow::Result;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

use crate::screen::Screen;

pub struct RawModeGuard {
    active: bool,
}

impl RawModeGuard {
    pub fn enter() -> Result<RawModeGuard> {
        enable_raw_mode()?;
        Ok(RawModeGuard { active: true })
    }

    pub fn leave(&mut self) -> Result<()> {
        if self.active {
            disable_raw_mode()?;
            self.active = false;
        }
        Ok(())
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.active {
            let _ = disable_raw_mode();
        }
    }
}

impl<W: Write> Screen<W> {
    /// The orderly farewell: known attribute state, cursor parked on the
    /// last row, that row cleared, everything flushed.
    pub fn finalize(&mut self) -> Result<()> {
        self.reset_terminal_modes()?;
        let last = self.rows() - 1;
        self.move_cursor(last, 0)?;
        self.clear_to_eol()?;
        self.flush()
    }
}

/// Window size as `(lines, columns)`: the kernel's answer when available,
/// the `LINES`/`COLUMNS` environment as a last resort.
pub fn window_size() -> Option<(usize, usize)> {
    if let Ok((cols, rows)) = crossterm::terminal::size() {
        if rows > 0 && cols > 0 {
            return Some((rows as usize, cols as usize));
        }
    }
    let lines: usize = std::env::var("LINES").ok()?.parse().ok()?;
    let columns: usize = std::env::var("COLUMNS").ok()?.parse().ok()?;
    (lines > 0 && columns > 0).then_some((lines, columns))
}
