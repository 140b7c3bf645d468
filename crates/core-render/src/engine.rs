//! The incremental update layer.
//!
//! Everything the editor does to the screen goes through here, and the
//! basic deal is simple: updates are applied cell-by-cell while they stay
//! cheap, and wholesale once they stop being cheap. Each call bumps a
//! per-refresh counter; past the TURBO threshold the engine flips to
//! deferred mode, where updates only widen the dirty row range and the
//! actual painting waits for `refresh_window`. Short bursts of edits stay
//! perfectly incremental, long operations coalesce into one pass.
//!
//! The single-character updates (insert, delete, overwrite) are called
//! immediately after the buffer mutation, assume the screen still shows
//! the pre-mutation state, and keep the buffer's attribute cache in step.
//! Their hard part is the first tab to the right of the edit: a tab can
//! absorb a width change by growing or shrinking its expansion, which
//! beats shifting the whole tail of the line.

use std::io::Write;

use anyhow::Result;
use core_syntax::HighlightState;
use core_terminal::{Attr, Screen};
use core_text::encoding::{char_width_at, next_pos};
use core_text::{calc_char_len, calc_width, find_matching_bracket, Buffer, Encoding};
use tracing::trace;

use crate::dirty::DirtyRange;
use crate::line::output_line_slice;
use crate::status::StatusBar;

/// Saved cell for the bracket-match highlight, so hiding restores exactly
/// what showing replaced.
#[derive(Debug, Clone, Copy, Default)]
struct SavedMatch {
    c: u32,
    attr: Attr,
}

pub struct RenderEngine {
    /// Configured threshold; zero means "twice the screen height".
    turbo: usize,
    window_needs_refresh: bool,
    dirty: DirtyRange,
    updated_lines: usize,
    /// Set by the editor when the current line's edit may have changed the
    /// highlight states of the lines below it.
    pub need_attr_update: bool,
    /// The shared parse buffer. Any parse of a line other than the current
    /// one invalidates the buffer's own attribute cache.
    parse_buf: Vec<Attr>,
    pub status: StatusBar,
    saved_match: SavedMatch,
    /// Suppresses `delay_update` so tests observe every incremental path.
    test_mode: bool,
}

impl Default for RenderEngine {
    fn default() -> Self {
        RenderEngine::new(0)
    }
}

impl RenderEngine {
    pub fn new(turbo: usize) -> RenderEngine {
        RenderEngine {
            turbo,
            window_needs_refresh: false,
            dirty: DirtyRange::empty(),
            updated_lines: 0,
            need_attr_update: false,
            parse_buf: Vec::new(),
            status: StatusBar::default(),
            saved_match: SavedMatch::default(),
            test_mode: false,
        }
    }

    pub fn set_test_mode(&mut self, on: bool) {
        self.test_mode = on;
    }

    pub fn window_needs_refresh(&self) -> bool {
        self.window_needs_refresh
    }

    pub fn updated_lines(&self) -> usize {
        self.updated_lines
    }

    pub fn dirty_range(&self) -> Option<(usize, usize)> {
        (!self.dirty.is_empty()).then(|| (self.dirty.first(), self.dirty.last()))
    }

    fn turbo_limit(&self, rows: usize) -> usize {
        if self.turbo != 0 {
            self.turbo
        } else {
            rows * 2
        }
    }

    /// Rows available to text: everything above the status line.
    fn text_rows<W: Write>(screen: &Screen<W>) -> usize {
        screen.rows() - 1
    }

    fn bump_updated<W: Write>(&mut self, screen: &Screen<W>) {
        self.updated_lines += 1;
        if self.updated_lines > self.turbo_limit(screen.rows()) {
            self.window_needs_refresh = true;
        }
    }

    /// Parses line `idx` into the shared buffer, returning its end state.
    /// The caller owns the cache-invalidation consequences.
    fn parse_into_shared(&mut self, b: &mut Buffer, idx: usize) -> Option<HighlightState> {
        b.parse_line(idx, &mut self.parse_buf)
    }

    /// Re-parses the current line into the shared buffer so the
    /// single-character updates can read the fresh attributes. Call after
    /// the buffer mutation, before the update call.
    pub fn parse_current(&mut self, b: &mut Buffer) {
        let idx = b.cur_line;
        self.parse_into_shared(b, idx);
    }

    /// Parses line `idx` and freezes the result into the buffer's own
    /// attribute cache, recording the next-line state. Freezing a line
    /// other than the current one requires invalidating afterwards.
    fn freeze_attributes(&mut self, b: &mut Buffer, idx: usize) -> Option<HighlightState> {
        let state = self.parse_into_shared(b, idx)?;
        b.attr_cache = Some(self.parse_buf.clone());
        b.next_state = state.clone();
        Some(state)
    }

    // ---- whole-line updates ----------------------------------------------

    /// Draws the part of screen row `row` from `from_col` rightwards, or
    /// clears it when the text ends above it. Subject to TURBO. Returns
    /// the index of the drawn line, `None` past the end of text.
    pub fn update_partial_line<W: Write>(
        &mut self,
        screen: &mut Screen<W>,
        b: &mut Buffer,
        row: usize,
        from_col: usize,
        cleared_at_end: bool,
        differential: bool,
    ) -> Result<Option<usize>> {
        debug_assert!(row < Self::text_rows(screen));

        self.bump_updated(screen);
        if self.window_needs_refresh {
            self.dirty.extend(row);
        }

        let idx = b.win_y + row;
        if idx >= b.line_count() {
            // Rows past the end of text are cleared outright, turbo or not.
            screen.move_cursor(row, from_col)?;
            screen.clear_to_eol()?;
            return Ok(None);
        }

        let has_syntax = b.has_syntax();
        if has_syntax {
            self.parse_into_shared(b, idx);
        }

        if !self.window_needs_refresh {
            debug_assert!(has_syntax || !differential);
            debug_assert!(b.attr_cache.is_some() || !differential);
            let cols = screen.cols();
            let line = b.line(idx).unwrap();
            output_line_slice(
                screen,
                row,
                from_col,
                line,
                from_col + b.win_x,
                cols - from_col,
                b.tab_size,
                cleared_at_end,
                b.encoding,
                has_syntax.then_some(self.parse_buf.as_slice()),
                if differential {
                    b.attr_cache.as_deref()
                } else {
                    None
                },
            )?;
        }
        Ok(Some(idx))
    }

    /// Like [`Self::update_partial_line`] for the whole row. Updating the
    /// current line also refreshes the buffer's attribute cache and
    /// next-line state.
    pub fn update_line<W: Write>(
        &mut self,
        screen: &mut Screen<W>,
        b: &mut Buffer,
        row: usize,
        cleared_at_end: bool,
        differential: bool,
    ) -> Result<()> {
        let idx = self.update_partial_line(screen, b, row, 0, cleared_at_end, differential)?;
        if b.has_syntax() && idx == Some(b.cur_line) {
            self.freeze_attributes(b, b.cur_line);
        }
        Ok(())
    }

    /// Draws rows `start..=end`. With `doit` the TURBO gate is bypassed;
    /// without it, a throttled call only records the need. The draw covers
    /// the merged dirty range and resets it.
    pub fn update_window_lines<W: Write>(
        &mut self,
        screen: &mut Screen<W>,
        b: &mut Buffer,
        start: usize,
        end: usize,
        doit: bool,
    ) -> Result<()> {
        self.updated_lines += end - start + 1;
        if self.updated_lines > self.turbo_limit(screen.rows()) && !doit {
            self.window_needs_refresh = true;
        }
        self.dirty.extend_range(start, end);

        if self.window_needs_refresh && !doit {
            return Ok(());
        }

        trace!(first = self.dirty.first(), last = self.dirty.last(), "window redraw");

        let first = self.dirty.first();
        let last = self.dirty.last();
        let cols = screen.cols();
        let mut i = first;
        while i <= last && b.win_y + i < b.line_count() {
            let idx = b.win_y + i;
            let has_syntax = b.has_syntax();
            if has_syntax {
                self.parse_into_shared(b, idx);
            }
            let line = b.line(idx).unwrap();
            output_line_slice(
                screen,
                i,
                0,
                line,
                b.win_x,
                cols,
                b.tab_size,
                false,
                b.encoding,
                has_syntax.then_some(self.parse_buf.as_slice()),
                None,
            )?;
            i += 1;
        }
        for row in i..=last {
            screen.move_cursor(row, 0)?;
            screen.clear_to_eol()?;
        }

        self.window_needs_refresh = false;
        self.dirty.clear();
        Ok(())
    }

    /// Redraws the whole text window, honoring TURBO.
    pub fn update_window<W: Write>(&mut self, screen: &mut Screen<W>, b: &mut Buffer) -> Result<()> {
        let end = Self::text_rows(screen) - 1;
        self.update_window_lines(screen, b, 0, end, false)
    }

    // ---- deferral and refresh --------------------------------------------

    /// Pushes the engine straight into deferred mode; used ahead of
    /// operations known to touch far more than TURBO lines.
    pub fn delay_update<W: Write>(&mut self, screen: &Screen<W>) {
        if self.test_mode {
            return;
        }
        self.updated_lines = self.turbo_limit(screen.rows()) + 1;
        self.window_needs_refresh = true;
    }

    /// Marks the whole window and the status line for redraw, drawing
    /// nothing.
    pub fn reset_window<W: Write>(&mut self, screen: &Screen<W>) {
        self.window_needs_refresh = true;
        self.dirty.extend_range(0, Self::text_rows(screen) - 1);
        self.status.reset();
    }

    /// Performs whatever deferred work accumulated, and re-arms the TURBO
    /// counter. Call whenever the user is about to get control back.
    pub fn refresh_window<W: Write>(&mut self, screen: &mut Screen<W>, b: &mut Buffer) -> Result<()> {
        if self.window_needs_refresh {
            if self.dirty.is_empty() {
                self.window_needs_refresh = false;
            } else {
                let (first, last) = (self.dirty.first(), self.dirty.last());
                self.update_window_lines(screen, b, first, last, true)?;
            }
        }
        self.updated_lines = 0;
        Ok(())
    }

    // ---- scrolling -------------------------------------------------------

    /// Scrolls the rows from `line` down by one (`n == 1`) or up by one
    /// (`n == -1`), redrawing the newly exposed row. Subject to TURBO.
    pub fn scroll_window<W: Write>(
        &mut self,
        screen: &mut Screen<W>,
        b: &mut Buffer,
        line: usize,
        n: isize,
    ) -> Result<()> {
        debug_assert!(n == -1 || n == 1);
        debug_assert!(line < screen.rows());

        let text_last = Self::text_rows(screen) - 1;

        if screen.line_ins_del_ok() {
            self.bump_updated(screen);
            if self.window_needs_refresh {
                self.dirty.extend_range(line, text_last);
                return Ok(());
            }
        } else {
            // No line insert/delete on this terminal: rewrite everything
            // from the scroll point down.
            return self.update_window_lines(screen, b, line, text_last, false);
        }

        if n > 0 {
            let moved = screen.ins_del_lines(line, 1)?;
            self.update_line(screen, b, line, moved, false)
        } else {
            let moved = screen.ins_del_lines(line, -1)?;
            self.update_line(screen, b, text_last, moved, false)
        }
    }

    // ---- single-character updates ----------------------------------------

    /// Screen update for a character just inserted into the current line
    /// at byte `pos` (attribute index `attr_pos`), displayed at screen row
    /// `row`, column `x`. The shared parse buffer must hold the line's
    /// post-insert attributes when syntax is enabled.
    #[allow(clippy::too_many_arguments)]
    pub fn update_inserted_char<W: Write>(
        &mut self,
        screen: &mut Screen<W>,
        b: &mut Buffer,
        c: u32,
        row: usize,
        x: usize,
        pos: usize,
        attr_pos: usize,
    ) -> Result<()> {
        let idx = b.cur_line;
        let utf8 = b.encoding.is_utf8();
        let tab_size = b.tab_size;
        let attr = b
            .has_syntax()
            .then(|| self.parse_buf.get(attr_pos).copied().unwrap_or_default());

        if b.has_syntax() {
            debug_assert!(b.attr_cache.as_ref().zip(b.line(idx)).map_or(
                true,
                |(cache, line)| cache.len() + 1 == calc_char_len(line, b.encoding)
            ));
            if let (Some(cache), Some(a)) = (b.attr_cache.as_mut(), attr) {
                let at = attr_pos.min(cache.len());
                cache.insert(at, a);
            }
        }

        self.bump_updated(screen);
        if self.window_needs_refresh {
            self.dirty.extend(row);
            return Ok(());
        }

        screen.move_cursor(row, x)?;

        let c_len = if utf8 {
            core_terminal::utf8::code_len(c)
        } else {
            1
        };
        let is_tab = c == u32::from(b'\t');
        let c_width = if is_tab {
            tab_size - x % tab_size
        } else {
            core_terminal::output_width(c)
        };

        let line_len = b.line(idx).map_or(0, |l| l.len());
        debug_assert!(pos < line_len);

        if pos + c_len == line_len {
            // Last character on the line: nothing to shift.
            if is_tab {
                screen.output_spaces(c_width, attr.as_ref())?;
            } else {
                screen.output_char(c, attr, utf8)?;
            }
            return Ok(());
        }

        if !screen.char_ins_del_ok() {
            self.update_partial_line(screen, b, row, x, false, false)?;
            return Ok(());
        }

        let bytes = b.line(idx).unwrap().as_bytes().to_vec();
        let enc = b.encoding;
        let cols = screen.cols();

        // First tab right of the insertion, within the visible columns.
        let mut i = x + c_width;
        let mut j = pos + c_len;
        while i < cols && j < bytes.len() {
            if bytes[j] == b'\t' {
                let tab_width = tab_size - (i - c_width) % tab_size;

                if tab_width > c_width {
                    // The tab absorbs the inserted width: rewrite the span
                    // between the insertion and the tab, shifted.
                    if is_tab {
                        screen.output_spaces(c_width, attr.as_ref())?;
                    } else {
                        screen.output_char(c, attr, utf8)?;
                    }
                    let span = &bytes[pos + c_len..j];
                    let span_attrs = self.span_attrs(b, attr_pos + 1, span, enc);
                    screen.output_chars(Some(span), span_attrs.as_deref(), span.len(), utf8)?;
                } else {
                    // The tab cannot absorb: insert the new columns, then
                    // re-widen the tab with extra blanks.
                    if is_tab {
                        screen.insert_chars(None, attr.as_ref().map(std::slice::from_ref), c_width, false)?;
                    } else {
                        screen.insert_char(c, attr, utf8)?;
                    }
                    screen.move_cursor(row, i)?;
                    screen.insert_chars(
                        None,
                        attr.as_ref().map(std::slice::from_ref),
                        tab_size - c_width,
                        false,
                    )?;
                }
                return Ok(());
            }
            i += char_width_at(&bytes, j, enc);
            j = next_pos(&bytes, j, enc);
        }

        // No tab in sight: plain terminal character insertion.
        if is_tab {
            screen.insert_chars(None, attr.as_ref().map(std::slice::from_ref), c_width, false)?;
        } else {
            screen.insert_char(c, attr, utf8)?;
        }
        Ok(())
    }

    /// Screen update for a character just deleted from the current line.
    /// `c` is the removed character, `a` the attribute it was shown with.
    #[allow(clippy::too_many_arguments)]
    pub fn update_deleted_char<W: Write>(
        &mut self,
        screen: &mut Screen<W>,
        b: &mut Buffer,
        c: u32,
        a: Attr,
        row: usize,
        x: usize,
        pos: usize,
        attr_pos: usize,
    ) -> Result<()> {
        let idx = b.cur_line;
        let utf8 = b.encoding.is_utf8();
        let tab_size = b.tab_size;

        if b.has_syntax() {
            debug_assert!(b.attr_cache.as_ref().zip(b.line(idx)).map_or(
                true,
                |(cache, line)| cache.len() == calc_char_len(line, b.encoding) + 1
            ));
            if let Some(cache) = b.attr_cache.as_mut() {
                if attr_pos < cache.len() {
                    cache.remove(attr_pos);
                }
            }
        }

        self.bump_updated(screen);
        if self.window_needs_refresh {
            self.dirty.extend(row);
            return Ok(());
        }

        let line_len = b.line(idx).map_or(0, |l| l.len());
        let is_blank = c == u32::from(b'\t') || c == u32::from(b' ');
        if pos > line_len || (pos == line_len && is_blank && a == Attr::default()) {
            // Deleting unattributed trailing whitespace changes nothing
            // visible.
            return Ok(());
        }

        screen.move_cursor(row, x)?;

        let c_width = if c == u32::from(b'\t') {
            tab_size - x % tab_size
        } else {
            core_terminal::output_width(c)
        };

        if !screen.char_ins_del_ok() {
            if b.has_syntax() {
                self.update_line(screen, b, row, false, false)?;
            } else {
                self.update_partial_line(screen, b, row, x, false, false)?;
            }
            return Ok(());
        }

        let bytes = b.line(idx).unwrap().as_bytes().to_vec();
        let enc = b.encoding;
        let cols = screen.cols();

        let mut i = x + c_width;
        let mut j = pos;
        let mut curr_attr_pos = attr_pos;
        while i < cols && j < bytes.len() {
            if bytes[j] == b'\t' {
                let tab_width = tab_size - i % tab_size;

                if c_width + tab_width > tab_size {
                    // The tab cannot grow enough: shrink the row by the
                    // deleted width, then trim the tab's blanks and repaint
                    // the uncovered right edge.
                    screen.delete_chars(c_width)?;
                    screen.move_cursor(row, i - c_width)?;
                    screen.delete_chars(tab_size - c_width)?;
                    self.update_partial_line(screen, b, row, cols - tab_size, true, false)?;
                } else {
                    // The tab absorbs the loss: shift the span between the
                    // deletion and the tab, widening its expansion.
                    let span = &bytes[pos..j];
                    let span_attrs = self.cache_attrs(b, attr_pos, span, enc);
                    screen.output_chars(Some(span), span_attrs.as_deref(), span.len(), utf8)?;
                    let fill_attr = b
                        .attr_cache
                        .as_ref()
                        .and_then(|cache| cache.get(curr_attr_pos).copied());
                    screen.output_spaces(c_width, fill_attr.as_ref())?;
                }
                return Ok(());
            }
            i += char_width_at(&bytes, j, enc);
            j = next_pos(&bytes, j, enc);
            curr_attr_pos += 1;
        }

        // No tab: shrink the row and repaint what slid in from the right.
        screen.delete_chars(c_width)?;
        self.update_partial_line(screen, b, row, cols - c_width, true, false)?;
        Ok(())
    }

    /// Screen update for a character just overwritten in the current line:
    /// `old` was replaced by `new` at byte `pos`.
    #[allow(clippy::too_many_arguments)]
    pub fn update_overwritten_char<W: Write>(
        &mut self,
        screen: &mut Screen<W>,
        b: &mut Buffer,
        old: u32,
        new: u32,
        row: usize,
        x: usize,
        pos: usize,
        attr_pos: usize,
    ) -> Result<()> {
        let idx = b.cur_line;
        let utf8 = b.encoding.is_utf8();
        let tab_size = b.tab_size;
        let attr = b
            .has_syntax()
            .then(|| self.parse_buf.get(attr_pos).copied().unwrap_or_default());

        if b.has_syntax() {
            if let (Some(cache), Some(a)) = (b.attr_cache.as_mut(), attr) {
                if attr_pos < cache.len() {
                    cache[attr_pos] = a;
                } else {
                    cache.push(a);
                }
            }
        }

        self.bump_updated(screen);
        if self.window_needs_refresh {
            self.dirty.extend(row);
            return Ok(());
        }

        let tab = u32::from(b'\t');
        let old_width = if old == tab {
            tab_size - x % tab_size
        } else {
            core_terminal::output_width(old)
        };
        let new_width = if new == tab {
            tab_size - x % tab_size
        } else {
            core_terminal::output_width(new)
        };

        screen.move_cursor(row, x)?;

        if old_width == new_width {
            if old != new {
                if new == tab {
                    screen.output_spaces(old_width, attr.as_ref())?;
                } else {
                    screen.output_char(new, attr, utf8)?;
                }
            }
            return Ok(());
        }

        if !screen.char_ins_del_ok() {
            self.update_partial_line(screen, b, row, x, false, false)?;
            return Ok(());
        }

        let bytes = b.line(idx).unwrap().as_bytes().to_vec();
        let enc = b.encoding;
        let cols = screen.cols();
        let after = next_pos(&bytes, pos, enc);

        if new_width < old_width {
            let width_delta = old_width - new_width;

            let mut i = x + old_width;
            let mut j = after;
            let mut curr_attr_pos = attr_pos;
            while i < cols && j < bytes.len() {
                if bytes[j] == b'\t' {
                    let tab_width = tab_size - i % tab_size;

                    if width_delta + tab_width <= tab_size {
                        // The tab grows over the freed columns.
                        if new == tab {
                            screen.output_spaces(new_width, attr.as_ref())?;
                        } else {
                            screen.output_char(new, attr, utf8)?;
                        }
                        let span = &bytes[after..j];
                        let span_attrs = self.span_attrs(b, attr_pos + 1, span, enc);
                        screen.output_chars(Some(span), span_attrs.as_deref(), span.len(), utf8)?;
                        let fill_attr = b
                            .attr_cache
                            .as_ref()
                            .and_then(|cache| cache.get(curr_attr_pos).copied());
                        screen.output_spaces(width_delta, fill_attr.as_ref())?;
                    } else {
                        if new == tab {
                            screen.output_spaces(new_width, attr.as_ref())?;
                        } else {
                            screen.output_char(new, attr, utf8)?;
                        }
                        screen.delete_chars(width_delta)?;
                        if width_delta != tab_size {
                            screen.move_cursor(row, i - width_delta)?;
                            screen.delete_chars(tab_size - width_delta)?;
                        }
                        self.update_partial_line(screen, b, row, cols - tab_size, true, false)?;
                    }
                    return Ok(());
                }
                i += char_width_at(&bytes, j, enc);
                j = next_pos(&bytes, j, enc);
                curr_attr_pos += 1;
            }

            screen.delete_chars(width_delta)?;
            if new == tab {
                screen.output_spaces(new_width, attr.as_ref())?;
            } else {
                screen.output_char(new, attr, utf8)?;
            }
            self.update_partial_line(screen, b, row, cols - width_delta, true, false)?;
        } else {
            let width_delta = new_width - old_width;

            let mut i = x + old_width;
            let mut j = after;
            while i < cols && j < bytes.len() {
                if bytes[j] == b'\t' {
                    let tab_width = tab_size - i % tab_size;

                    if width_delta < tab_width {
                        // The tab shrinks to absorb the growth.
                        if new == tab {
                            screen.output_spaces(new_width, attr.as_ref())?;
                        } else {
                            screen.output_char(new, attr, utf8)?;
                        }
                        let span = &bytes[after..j];
                        let span_attrs = self.span_attrs(b, attr_pos + 1, span, enc);
                        screen.output_chars(Some(span), span_attrs.as_deref(), span.len(), utf8)?;
                    } else {
                        screen.insert_chars(
                            None,
                            attr.as_ref().map(std::slice::from_ref),
                            width_delta,
                            false,
                        )?;
                        if new == tab {
                            screen.output_spaces(new_width, attr.as_ref())?;
                        } else {
                            screen.output_char(new, attr, utf8)?;
                        }
                        screen.move_cursor(row, i + width_delta)?;
                        let refill = tab_size - (i + width_delta) % tab_size;
                        let refill = refill.saturating_sub(tab_width);
                        screen.insert_chars(
                            None,
                            attr.as_ref().map(std::slice::from_ref),
                            refill,
                            false,
                        )?;
                    }
                    return Ok(());
                }
                i += char_width_at(&bytes, j, enc);
                j = next_pos(&bytes, j, enc);
            }

            screen.insert_chars(None, attr.as_ref().map(std::slice::from_ref), width_delta, false)?;
            if new == tab {
                screen.output_spaces(new_width, attr.as_ref())?;
            } else {
                screen.output_char(new, attr, utf8)?;
            }
        }
        Ok(())
    }

    /// Attributes for a span of shifted text, taken from the shared parse
    /// buffer starting at `from`.
    fn span_attrs(
        &self,
        b: &Buffer,
        from: usize,
        span: &[u8],
        enc: Encoding,
    ) -> Option<Vec<Attr>> {
        if !b.has_syntax() {
            return None;
        }
        let n = core_text::encoding::char_len(span, enc);
        Some(
            (0..n)
                .map(|k| self.parse_buf.get(from + k).copied().unwrap_or_default())
                .collect(),
        )
    }

    /// Attributes for a span of shifted text, taken from the buffer's own
    /// (already shifted) cache starting at `from`.
    fn cache_attrs(
        &self,
        b: &Buffer,
        from: usize,
        span: &[u8],
        enc: Encoding,
    ) -> Option<Vec<Attr>> {
        let cache = b.attr_cache.as_ref()?;
        let n = core_text::encoding::char_len(span, enc);
        Some(
            (0..n)
                .map(|k| cache.get(from + k).copied().unwrap_or_default())
                .collect(),
        )
    }

    // ---- syntax state propagation ----------------------------------------

    /// After an edit to the line at index `start_idx` (already displayed
    /// correctly), pushes highlight states down the buffer until a line's
    /// stored state equals the state flowing into it, or `end_idx` when
    /// given, or the end of the buffer. With `row` tracking the start
    /// line's screen row, visible lines are redrawn differentially along
    /// the way, subject to TURBO. Invalidate-on-exit: the shared parse
    /// buffer no longer matches the current line.
    pub fn update_syntax_states<W: Write>(
        &mut self,
        screen: &mut Screen<W>,
        b: &mut Buffer,
        row: Option<usize>,
        start_idx: usize,
        end_idx: Option<usize>,
    ) -> Result<()> {
        if !b.has_syntax() || !self.need_attr_update {
            return Ok(());
        }

        let mut got_end = end_idx.is_none();
        let mut invalidate_attr_cache = false;
        let mut next_state = if b.attr_cache.is_some() {
            b.next_state.clone()
        } else {
            self.parse_into_shared(b, start_idx)
                .expect("syntax engine present")
        };

        let text_rows = Self::text_rows(screen);
        let mut idx = start_idx;
        let mut row = row;
        let mut updated = 0usize;

        loop {
            idx += 1;
            if idx >= b.line_count() {
                break;
            }
            if b.line(idx).unwrap().highlight == next_state && got_end {
                break;
            }
            if end_idx == Some(idx) {
                got_end = true;
            }

            let mut draw_row = None;
            if let Some(r) = row.as_mut() {
                *r += 1;
                if *r < text_rows {
                    self.bump_updated(screen);
                    if self.window_needs_refresh {
                        self.dirty.extend(*r);
                    } else {
                        // Freeze the attributes this line is *currently*
                        // shown with (old state), to diff against below.
                        self.freeze_attributes(b, idx);
                        invalidate_attr_cache = true;
                        draw_row = Some(*r);
                    }
                }
            }

            b.line_mut(idx).unwrap().highlight = next_state.clone();
            next_state = self
                .parse_into_shared(b, idx)
                .expect("syntax engine present");
            updated += 1;

            if let Some(r) = draw_row {
                if !self.window_needs_refresh {
                    let cols = screen.cols();
                    let line = b.line(idx).unwrap();
                    output_line_slice(
                        screen,
                        r,
                        0,
                        line,
                        b.win_x,
                        cols,
                        b.tab_size,
                        true,
                        b.encoding,
                        Some(self.parse_buf.as_slice()),
                        b.attr_cache.as_deref(),
                    )?;
                }
            }
        }

        trace!(updated, "syntax states propagated");
        if invalidate_attr_cache {
            b.attr_cache = None;
        }
        self.need_attr_update = false;
        Ok(())
    }

    /// Fixes the screen after a block operation: everything is deferred,
    /// the cache is dropped, and states propagate from `start_idx`.
    pub fn update_syntax_and_lines<W: Write>(
        &mut self,
        screen: &mut Screen<W>,
        b: &mut Buffer,
        start_idx: usize,
        end_idx: Option<usize>,
    ) -> Result<()> {
        self.delay_update(screen);
        if b.has_syntax() {
            b.attr_cache = None;
            self.need_attr_update = true;
            self.update_syntax_states(screen, b, None, start_idx, end_idx)?;
        }
        Ok(())
    }

    // ---- bracket matching ------------------------------------------------

    /// Highlights (or, with `show == false`, restores) the bracket
    /// matching the character under the cursor, when it lies inside the
    /// visible window. The highlight applies the buffer's configured
    /// transforms to the cell's own attribute.
    pub fn automatch_bracket<W: Write>(
        &mut self,
        screen: &mut Screen<W>,
        b: &mut Buffer,
        show: bool,
    ) -> Result<()> {
        let utf8 = b.encoding.is_utf8();
        if !show {
            if b.automatch.shown {
                screen.move_cursor(b.automatch.row, b.automatch.col)?;
                screen.output_char(self.saved_match.c, Some(self.saved_match.attr), utf8)?;
                b.automatch.shown = false;
            }
            return Ok(());
        }

        let text_rows = Self::text_rows(screen);
        let last_visible = (b.win_y + text_rows - 1).min(b.line_count().saturating_sub(1));
        let Some(m) = find_matching_bracket(b, b.win_y, last_visible) else {
            return Ok(());
        };

        // The search was limited to visible lines, not visible columns.
        let row = m.line - b.win_y;
        let line = b.line(m.line).unwrap();
        let col_abs = calc_width(line, m.char_pos, b.tab_size, b.encoding);
        if col_abs < b.win_x || col_abs - b.win_x >= screen.cols() {
            return Ok(());
        }
        let col = col_abs - b.win_x;
        b.automatch.row = row;
        b.automatch.col = col;

        screen.move_cursor(row, col)?;
        let orig_attr = if b.has_syntax() {
            self.parse_into_shared(b, m.line);
            if m.line != b.cur_line {
                // The shared buffer now holds another line's parse.
                b.attr_cache = None;
            }
            self.parse_buf.get(m.char_pos).copied().unwrap_or_default()
        } else {
            Attr::default()
        };

        let mut attr = orig_attr;
        if b.automatch_opts & 1 != 0 {
            attr = attr.invert_brightness();
        }
        if b.automatch_opts & 2 != 0 {
            attr = attr.toggle(core_terminal::Style::INVERSE);
        }
        if b.automatch_opts & 4 != 0 {
            attr = attr.toggle(core_terminal::Style::BOLD);
        }
        if b.automatch_opts & 8 != 0 {
            attr = attr.toggle(core_terminal::Style::UNDERLINE);
        }

        screen.output_char(m.c, Some(attr), utf8)?;
        self.saved_match = SavedMatch {
            c: m.c,
            attr: orig_attr,
        };
        b.automatch.shown = true;
        Ok(())
    }
}
