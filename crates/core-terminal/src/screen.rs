//! Terminal control over a capability table.
//!
//! `Screen` owns the byte sink and every piece of state that must advance in
//! lockstep with the bytes written to it: the believed cursor position, the
//! active SGR attributes, insert/standout/delete modes, and the scroll
//! window. All output funnels through here; reordering anything would
//! desynchronize the terminal's state machine from ours.
//!
//! The cursor is an explicit `Option`: `None` means "lost", which forces
//! absolute addressing on the next motion. A stored column equal to `cols`
//! is the magic-wrap phantom position and is only reachable on terminals
//! with the eat-newline glitch.

use std::io::Write;

use anyhow::Result;
use unicode_width::UnicodeWidthChar;

use crate::attr::{
    palette_index, Attr, NoColorVideo, Style, AT_MASK, BG_MASK, BG_NOT_DEFAULT, FG_MASK,
    FG_NOT_DEFAULT,
};
use crate::caps::{Capabilities, TermSetupError};
use crate::motion::MotionCosts;
use crate::{param, utf8};

/// Display width of a code point as the encoder will render it: wcwidth
/// maximized with 1, since unprintables come out as one-column substitutes.
pub fn output_width(c: u32) -> usize {
    char::from_u32(c)
        .and_then(UnicodeWidthChar::width)
        .filter(|&w| w > 0)
        .unwrap_or(1)
}

fn raw_width(c: u32) -> usize {
    char::from_u32(c)
        .and_then(UnicodeWidthChar::width)
        .unwrap_or(0)
}

pub struct Screen<W: Write> {
    caps: Capabilities,
    costs: MotionCosts,
    out: W,
    baud: u32,

    rows: usize,
    cols: usize,
    cursor: Option<(usize, usize)>,
    curr_attr: Attr,

    insert_mode: bool,
    standout_mode: bool,
    standout_wanted: bool,
    /// Rows participating in line insert/delete; rows below are excluded.
    specified_window: usize,
    io_utf8: bool,
    pub(crate) use_tabs: bool,

    // Characteristics derived once from the capability table.
    line_ins_del_ok: bool,
    char_ins_del_ok: bool,
    scroll_region_ok: bool,
    standout_ok: bool,
    cursor_on_off_ok: bool,
    color_ok: bool,
    delete_in_insert_mode: bool,
    /// Leaving standout mode resets every attribute.
    esm_is_eam: bool,
}

impl<W: Write> Screen<W> {
    pub fn new(mut caps: Capabilities, baud: u32, io_utf8: bool, out: W) -> Result<Screen<W>, TermSetupError> {
        caps.apply_fallbacks();
        caps.validate()?;

        let costs = MotionCosts::compute(&caps, baud);

        // String identities the original detected by pointer comparison;
        // byte equality is the honest version.
        let delete_in_insert_mode =
            caps.enter_delete_mode.is_some() && caps.enter_delete_mode == caps.enter_insert_mode;
        let se_is_so =
            caps.enter_standout_mode.is_some() && caps.enter_standout_mode == caps.exit_standout_mode;
        let esm_is_eam =
            caps.exit_standout_mode.is_some() && caps.exit_standout_mode == caps.exit_attribute_mode;

        let scroll_region_ok = caps.change_scroll_region.is_some() || caps.set_window.is_some();
        let line_ins_del_ok = ((caps.insert_line.is_some() || caps.parm_insert_line.is_some())
            && (caps.delete_line.is_some() || caps.parm_delete_line.is_some()))
            || (scroll_region_ok && caps.scroll_forward.is_some() && caps.scroll_reverse.is_some());
        let char_ins_del_ok = (caps.insert_character.is_some()
            || caps.enter_insert_mode.is_some()
            || caps.insert_padding.is_some()
            || caps.parm_ich.is_some())
            && (caps.delete_character.is_some() || caps.parm_dch.is_some());
        let standout_ok = caps.enter_standout_mode.is_some()
            && caps.exit_standout_mode.is_some()
            && caps.magic_cookie_glitch < 0
            && !se_is_so;
        let cursor_on_off_ok = caps.cursor_invisible.is_some() && caps.cursor_normal.is_some();
        let color_ok = caps.set_foreground.is_some() && caps.set_background.is_some();
        let use_tabs = caps.tab.is_some() && caps.init_tabs == Some(8);

        let rows = caps.lines;
        let cols = caps.columns;

        tracing::debug!(
            rows,
            cols,
            line_ins_del_ok,
            char_ins_del_ok,
            scroll_region_ok,
            color_ok,
            "terminal characteristics"
        );

        Ok(Screen {
            caps,
            costs,
            out,
            baud,
            rows,
            cols,
            cursor: None,
            curr_attr: Attr::default(),
            insert_mode: false,
            standout_mode: false,
            standout_wanted: false,
            specified_window: rows,
            io_utf8,
            use_tabs,
            line_ins_del_ok,
            char_ins_del_ok,
            scroll_region_ok,
            standout_ok,
            cursor_on_off_ok,
            color_ok,
            delete_in_insert_mode,
            esm_is_eam,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cursor(&self) -> Option<(usize, usize)> {
        self.cursor
    }

    pub fn io_utf8(&self) -> bool {
        self.io_utf8
    }

    pub fn current_attr(&self) -> Attr {
        self.curr_attr
    }

    pub fn line_ins_del_ok(&self) -> bool {
        self.line_ins_del_ok
    }

    pub fn char_ins_del_ok(&self) -> bool {
        self.char_ins_del_ok
    }

    pub fn color_ok(&self) -> bool {
        self.color_ok
    }

    pub fn caps(&self) -> &Capabilities {
        &self.caps
    }

    pub(crate) fn costs(&self) -> &MotionCosts {
        &self.costs
    }

    pub(crate) fn baud(&self) -> u32 {
        self.baud
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    // ---- low-level emission ----------------------------------------------

    pub(crate) fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.out.write_all(bytes)?;
        Ok(())
    }

    /// `tputs` counterpart: interprets padding against the configured baud
    /// rate, scaled by `affcnt` affected lines.
    pub(crate) fn emit(&mut self, cap: &[u8], affcnt: usize) -> Result<()> {
        let mut buf = Vec::with_capacity(cap.len());
        param::emit(cap, affcnt, self.baud, &mut |b| buf.push(b));
        self.write_raw(&buf)
    }

    pub(crate) fn emit_if(&mut self, cap: Option<Vec<u8>>, affcnt: usize) -> Result<()> {
        if let Some(cap) = cap {
            self.emit(&cap, affcnt)?;
        }
        Ok(())
    }

    fn affcnt_below(&self) -> usize {
        self.rows - self.cursor.map_or(0, |(r, _)| r)
    }

    // ---- cursor bookkeeping ----------------------------------------------

    pub(crate) fn at(&mut self, row: usize, col: usize) {
        self.cursor = Some((row, col));
    }

    pub fn lose_cursor(&mut self) {
        self.cursor = None;
    }

    /// Accounts for `n` columns just written. Wrapping at the right margin
    /// follows the terminal's flags; with the eat-newline glitch the column
    /// may come to rest at `cols`, the phantom position.
    pub(crate) fn advance(&mut self, n: usize) {
        if let Some((mut row, mut col)) = self.cursor {
            col += n;
            if col >= self.cols && !self.caps.eat_newline_glitch {
                if self.caps.auto_right_margin {
                    col = 0;
                    row += 1;
                } else {
                    col = self.cols - 1;
                }
            }
            self.cursor = Some((row, col));
        }
    }

    /// From the phantom column the only safe exit is an explicit CRLF; the
    /// terminal may or may not have wrapped already, and absolute
    /// addressing from limbo is buggy on enough firmware to matter.
    pub(crate) fn check_magic_wrap(&mut self) -> Result<()> {
        if let Some((row, col)) = self.cursor {
            if col == self.cols {
                debug_assert!(self.caps.eat_newline_glitch && row < self.rows - 1);
                self.write_raw(b"\r\n")?;
                self.cursor = Some((row + 1, 0));
            }
        }
        Ok(())
    }

    // ---- modes -----------------------------------------------------------

    fn turn_on_insert(&mut self) -> Result<()> {
        if !self.insert_mode {
            self.emit_if(self.caps.enter_insert_mode.clone(), 1)?;
        }
        self.insert_mode = true;
        Ok(())
    }

    pub(crate) fn turn_off_insert(&mut self) -> Result<()> {
        if self.insert_mode {
            self.emit_if(self.caps.exit_insert_mode.clone(), 1)?;
        }
        self.insert_mode = false;
        Ok(())
    }

    pub(crate) fn turn_off_standout(&mut self) -> Result<()> {
        if self.standout_mode {
            self.force_standout_off()?;
        }
        Ok(())
    }

    /// Emits the exit string even when we believe standout is already off;
    /// used while the terminal's state is not yet known.
    fn force_standout_off(&mut self) -> Result<()> {
        self.emit_if(self.caps.exit_standout_mode.clone(), 1)?;
        if self.esm_is_eam {
            self.curr_attr = Attr::default();
        }
        self.standout_mode = false;
        Ok(())
    }

    fn standout_if_wanted(&mut self) -> Result<()> {
        if self.standout_mode != self.standout_wanted {
            if self.standout_wanted {
                self.emit_if(self.caps.enter_standout_mode.clone(), 1)?;
                self.standout_mode = true;
            } else {
                self.turn_off_standout()?;
            }
        }
        Ok(())
    }

    /// Requests standout for subsequent writes. No-op on terminals with
    /// magic cookies or without the mode.
    pub fn standout_on(&mut self) {
        if self.standout_ok {
            self.standout_wanted = true;
        }
    }

    pub fn standout_off(&mut self) {
        self.standout_wanted = false;
    }

    pub fn cursor_on(&mut self) -> Result<()> {
        if self.cursor_on_off_ok {
            self.emit_if(self.caps.cursor_normal.clone(), 1)?;
        }
        Ok(())
    }

    pub fn cursor_off(&mut self) -> Result<()> {
        if self.cursor_on_off_ok {
            self.emit_if(self.caps.cursor_invisible.clone(), 1)?;
        }
        Ok(())
    }

    /// Prepares the terminal for full-screen interaction: a known attribute
    /// state, the alternate screen, keypad transmit and the meta key.
    pub fn set_terminal_modes(&mut self) -> Result<()> {
        self.emit_if(self.caps.exit_attribute_mode.clone(), 1)?;
        self.emit_if(self.caps.exit_alt_charset_mode.clone(), 1)?;
        self.emit_if(self.caps.enter_ca_mode.clone(), 1)?;
        self.emit_if(self.caps.keypad_xmit.clone(), 1)?;
        if self.caps.has_meta_key {
            self.emit_if(self.caps.meta_on.clone(), 1)?;
        }
        self.force_standout_off()?;
        self.lose_cursor();
        Ok(())
    }

    pub fn reset_terminal_modes(&mut self) -> Result<()> {
        self.emit_if(self.caps.exit_attribute_mode.clone(), 1)?;
        self.emit_if(self.caps.exit_alt_charset_mode.clone(), 1)?;
        self.force_standout_off()?;
        self.emit_if(self.caps.keypad_local.clone(), 1)?;
        self.emit_if(self.caps.exit_ca_mode.clone(), 1)?;
        Ok(())
    }

    /// Limits subsequent line insert/delete to rows `0..size`. Zero means
    /// the whole screen.
    pub fn set_terminal_window(&mut self, size: usize) {
        self.specified_window = if size == 0 { self.rows } else { size };
    }

    pub fn specified_window(&self) -> usize {
        self.specified_window
    }

    /// Adopts a new geometry after a window-size change: the scroll region
    /// and the ins/del window are re-derived, the cursor is untouched (the
    /// caller is expected to redraw from scratch anyway).
    pub fn resize(&mut self, lines: usize, columns: usize) -> Result<()> {
        self.rows = lines;
        self.cols = columns;
        self.caps.lines = lines;
        self.caps.columns = columns;
        self.set_terminal_window(lines.saturating_sub(1));
        if self.scroll_region_ok {
            self.set_scroll_region(0, lines - 1)?;
        }
        tracing::debug!(lines, columns, "geometry changed");
        Ok(())
    }

    pub fn ring_bell(&mut self) -> Result<()> {
        self.emit_if(self.caps.bell.clone().or_else(|| self.caps.flash_screen.clone()), 1)
    }

    pub fn flash(&mut self) -> Result<()> {
        self.emit_if(self.caps.flash_screen.clone().or_else(|| self.caps.bell.clone()), 1)
    }

    // ---- attributes ------------------------------------------------------

    fn may_use_with_colors(&self, bit: NoColorVideo) -> bool {
        self.color_ok && !self.caps.no_color_video.intersects(bit)
    }

    /// Emits the minimum transition from the current attribute state to
    /// `attr`. Shrinking the style set, or returning a color to default,
    /// forces the full exit-attribute reset and a re-enter of everything
    /// kept; that is the only portable way to clear a single attribute.
    /// A pure growth adds just the new styles.
    pub fn set_attr(&mut self, attr: Attr) -> Result<()> {
        let cur = self.curr_attr;
        let mut attr_reset = false;

        let shrinks = cur.0 & AT_MASK & !(attr.0 & AT_MASK) != 0;
        if shrinks
            || (attr.0 & FG_NOT_DEFAULT == 0 && cur.0 & FG_NOT_DEFAULT != 0)
            || (attr.0 & BG_NOT_DEFAULT == 0 && cur.0 & BG_NOT_DEFAULT != 0)
        {
            self.emit_if(self.caps.exit_attribute_mode.clone(), 1)?;
            attr_reset = true;
        }

        let to_enter = if attr_reset {
            attr.style()
        } else {
            attr.style() - cur.style()
        };
        if to_enter.contains(Style::INVERSE) && self.may_use_with_colors(NoColorVideo::REVERSE) {
            self.emit_if(self.caps.enter_reverse_mode.clone(), 1)?;
        }
        if to_enter.contains(Style::BOLD) && self.may_use_with_colors(NoColorVideo::BOLD) {
            self.emit_if(self.caps.enter_bold_mode.clone(), 1)?;
        }
        if to_enter.contains(Style::UNDERLINE) && self.may_use_with_colors(NoColorVideo::UNDERLINE) {
            self.emit_if(self.caps.enter_underline_mode.clone(), 1)?;
        }
        if to_enter.contains(Style::DIM) && self.may_use_with_colors(NoColorVideo::DIM) {
            self.emit_if(self.caps.enter_dim_mode.clone(), 1)?;
        }
        if to_enter.contains(Style::BLINK) && self.may_use_with_colors(NoColorVideo::BLINK) {
            self.emit_if(self.caps.enter_blink_mode.clone(), 1)?;
        }

        if self.color_ok {
            // Colors must be re-emitted after a reset when non-default, and
            // whenever the field itself changed.
            if attr_reset && attr.0 & FG_NOT_DEFAULT != 0 || (attr.0 & FG_MASK) != (cur.0 & FG_MASK)
            {
                if let Some(fg) = attr.fg() {
                    let cap = self.caps.set_foreground.clone().unwrap();
                    let e = param::expand(
                        &cap,
                        &[i64::from(palette_index(fg, self.caps.ansi_color_ok))],
                    );
                    self.emit(&e, 1)?;
                }
            }
            if attr_reset && attr.0 & BG_NOT_DEFAULT != 0 || (attr.0 & BG_MASK) != (cur.0 & BG_MASK)
            {
                if let Some(bg) = attr.bg() {
                    let cap = self.caps.set_background.clone().unwrap();
                    let e = param::expand(
                        &cap,
                        &[i64::from(palette_index(bg, self.caps.ansi_color_ok))],
                    );
                    self.emit(&e, 1)?;
                }
            }
        }

        self.curr_attr = attr;
        Ok(())
    }

    // ---- the character encoder -------------------------------------------

    /// Writes one code point, substituting visible stand-ins for anything
    /// unprintable and tagging the substitute with INVERSE.
    fn out(&mut self, c: u32, attr: Option<Attr>) -> Result<()> {
        let mut c = c;
        let mut add = Style::empty();

        if (0x7F..0xA0).contains(&c) {
            c = u32::from(b'?');
            add = Style::INVERSE;
        }
        if c == 0xA0 {
            c = u32::from(b' ');
            add = Style::INVERSE;
        }
        if c < 0x20 {
            c += u32::from(b'@');
            add = Style::INVERSE;
        }
        if c > 0xFF && !self.io_utf8 {
            c = u32::from(b'?');
            add = Style::INVERSE;
        }
        if self.io_utf8 && raw_width(c) == 0 {
            c = u32::from(b'?');
            add = Style::INVERSE;
        }

        if let Some(a) = attr {
            self.set_attr(a | add)?;
        }

        if self.io_utf8 {
            let mut buf = [0u8; 6];
            let n = utf8::encode(c, &mut buf);
            self.write_raw(&buf[..n])
        } else {
            self.write_raw(&[c as u8])
        }
    }

    /// Truncates `len` (logical characters of `string`) so its width fits
    /// `max_width`, returning the resulting width.
    fn prefix_width(string: Option<&[u8]>, len: &mut usize, max_width: usize, utf8: bool) -> usize {
        match string {
            None => {
                *len = (*len).min(max_width);
                *len
            }
            Some(s) => {
                let mut width = 0;
                let mut pos = 0;
                let mut fit = 0;
                for _ in 0..*len {
                    if pos >= s.len() {
                        break;
                    }
                    let (c, c_len) = if utf8 {
                        (utf8::decode(&s[pos..]), utf8::seq_len(s[pos]))
                    } else {
                        (u32::from(s[pos]), 1)
                    };
                    let w = output_width(c);
                    if width + w > max_width {
                        break;
                    }
                    width += w;
                    pos += c_len;
                    fit += 1;
                }
                *len = fit;
                width
            }
        }
    }

    fn columns_left(&self) -> usize {
        let (row, col) = self.cursor.unwrap_or((0, 0));
        let mut left = self.cols.saturating_sub(col);
        // Writing the last cell of the bottom row would scroll the whole
        // screen on auto-wrapping terminals.
        if self.caps.auto_right_margin && row == self.rows - 1 {
            left = left.saturating_sub(1);
        }
        left
    }

    /// Writes `raw_len` bytes of `string` (or that many spaces when it is
    /// `None`), one attribute per logical character, truncated to the
    /// current row. Tabs are not expanded here; callers pass rendered text.
    pub fn output_chars(
        &mut self,
        string: Option<&[u8]>,
        attrs: Option<&[Attr]>,
        raw_len: usize,
        utf8: bool,
    ) -> Result<()> {
        if raw_len == 0 {
            return Ok(());
        }

        self.turn_off_insert()?;
        self.standout_if_wanted()?;

        let mut len = match string {
            Some(s) if utf8 => utf8::str_len(&s[..raw_len]),
            _ => raw_len,
        };
        let width = Self::prefix_width(string, &mut len, self.columns_left(), utf8);
        self.advance(width);

        let Some(s) = string else {
            // Only the first attribute is consulted when writing spaces.
            for _ in 0..len {
                if let Some(attrs) = attrs {
                    self.set_attr(attrs[0])?;
                }
                self.write_raw(b" ")?;
            }
            return Ok(());
        };

        if !self.caps.transparent_underline && !self.caps.tilde_glitch {
            let mut pos = 0;
            for i in 0..len {
                let (c, c_len) = if utf8 {
                    (utf8::decode(&s[pos..]), utf8::seq_len(s[pos]))
                } else {
                    (u32::from(s[pos]), 1)
                };
                pos += c_len;
                self.out(c, attrs.map(|a| a[i]))?;
            }
        } else {
            let mut pos = 0;
            for i in 0..len {
                if let Some(attrs) = attrs {
                    self.set_attr(attrs[i])?;
                }
                let (mut c, c_len) = if utf8 {
                    (utf8::decode(&s[pos..]), utf8::seq_len(s[pos]))
                } else {
                    (u32::from(s[pos]), 1)
                };
                pos += c_len;

                if c == u32::from(b'_') && self.caps.transparent_underline {
                    self.write_raw(b" ")?;
                    self.emit_if(self.caps.cursor_left.clone(), 1)?;
                }
                if self.caps.tilde_glitch && c == u32::from(b'~') {
                    c = u32::from(b'`');
                }
                self.out(c, attrs.map(|a| a[i]))?;
            }
        }
        Ok(())
    }

    pub fn output_string(&mut self, s: &str, utf8: bool) -> Result<()> {
        self.output_chars(Some(s.as_bytes()), None, s.len(), utf8)
    }

    /// Writes a single code point. `attr == None` leaves attributes alone.
    pub fn output_char(&mut self, c: u32, attr: Option<Attr>, utf8: bool) -> Result<()> {
        debug_assert!(c != 0);
        let mut buf = [0u8; 6];
        let raw_len = if utf8 {
            utf8::encode(c, &mut buf)
        } else {
            buf[0] = c as u8;
            1
        };
        let attr_arr = attr.map(|a| [a]);
        self.output_chars(
            Some(&buf[..raw_len]),
            attr_arr.as_ref().map(|a| a.as_slice()),
            raw_len,
            utf8,
        )
    }

    pub fn output_spaces(&mut self, n: usize, attr: Option<&Attr>) -> Result<()> {
        self.output_chars(None, attr.map(std::slice::from_ref), n, false)
    }

    /// Like [`Self::output_chars`], but pushes existing cells right instead
    /// of overwriting, via the parametric insert or insert mode.
    pub fn insert_chars(
        &mut self,
        string: Option<&[u8]>,
        attrs: Option<&[Attr]>,
        raw_len: usize,
        utf8: bool,
    ) -> Result<()> {
        if raw_len == 0 {
            return Ok(());
        }

        self.standout_if_wanted()?;

        let mut len = match string {
            Some(s) if utf8 => utf8::str_len(&s[..raw_len]),
            _ => raw_len,
        };

        if let Some(parm_ich) = self.caps.parm_ich.clone() {
            let width = match string {
                Some(s) => {
                    let mut width = 0;
                    let mut pos = 0;
                    while pos < raw_len {
                        let c = if utf8 { utf8::decode(&s[pos..]) } else { u32::from(s[pos]) };
                        width += output_width(c);
                        pos += if utf8 { utf8::seq_len(s[pos]) } else { 1 };
                    }
                    width
                }
                None => len,
            };
            let e = param::expand(&parm_ich, &[width as i64]);
            self.emit(&e, 1)?;
            if string.is_some() {
                self.output_chars(string, attrs, raw_len, utf8)?;
            }
            return Ok(());
        }

        self.turn_on_insert()?;

        let width = Self::prefix_width(string, &mut len, self.columns_left(), utf8);
        self.advance(width);

        if !self.caps.transparent_underline
            && !self.caps.tilde_glitch
            && string.is_some()
            && self.caps.insert_padding.is_none()
            && self.caps.insert_character.is_none()
        {
            let s = string.unwrap();
            let mut pos = 0;
            for i in 0..len {
                if let Some(attrs) = attrs {
                    self.set_attr(attrs[i])?;
                }
                let (c, c_len) = if utf8 {
                    (utf8::decode(&s[pos..]), utf8::seq_len(s[pos]))
                } else {
                    (u32::from(s[pos]), 1)
                };
                pos += c_len;
                self.out(c, attrs.map(|a| a[i]))?;
            }
        } else {
            let mut pos = 0;
            for i in 0..len {
                self.emit_if(self.caps.insert_character.clone(), 1)?;

                match string {
                    None => {
                        self.out(u32::from(b' '), attrs.map(|a| a[0]))?;
                    }
                    Some(s) => {
                        if let Some(attrs) = attrs {
                            self.set_attr(attrs[i])?;
                        }
                        let (mut c, c_len) = if utf8 {
                            (utf8::decode(&s[pos..]), utf8::seq_len(s[pos]))
                        } else {
                            (u32::from(s[pos]), 1)
                        };
                        pos += c_len;
                        if self.caps.tilde_glitch && c == u32::from(b'~') {
                            c = u32::from(b'`');
                        }
                        self.out(c, attrs.map(|a| a[i]))?;
                    }
                }

                self.emit_if(self.caps.insert_padding.clone(), 1)?;
            }
        }
        Ok(())
    }

    pub fn insert_char(&mut self, c: u32, attr: Option<Attr>, utf8: bool) -> Result<()> {
        debug_assert!(c != 0);
        let mut buf = [0u8; 6];
        let raw_len = if utf8 {
            utf8::encode(c, &mut buf)
        } else {
            buf[0] = c as u8;
            1
        };
        let attr_arr = attr.map(|a| [a]);
        self.insert_chars(
            Some(&buf[..raw_len]),
            attr_arr.as_ref().map(|a| a.as_slice()),
            raw_len,
            utf8,
        )
    }

    /// Deletes `n` columns at the cursor, pulling the rest of the row left.
    pub fn delete_chars(&mut self, n: usize) -> Result<()> {
        if n == 0 {
            return Ok(());
        }

        self.standout_if_wanted()?;
        if self.delete_in_insert_mode {
            self.turn_on_insert()?;
        } else {
            self.turn_off_insert()?;
            self.emit_if(self.caps.enter_delete_mode.clone(), 1)?;
        }

        if let Some(parm_dch) = self.caps.parm_dch.clone() {
            let e = param::expand(&parm_dch, &[n as i64]);
            self.emit(&e, 1)?;
        } else {
            for _ in 0..n {
                self.emit_if(self.caps.delete_character.clone(), 1)?;
            }
        }

        if !self.delete_in_insert_mode {
            let affcnt = self.affcnt_below();
            if let Some(cap) = self.caps.exit_delete_mode.clone() {
                self.emit(&cap, affcnt)?;
            }
        }
        Ok(())
    }

    // ---- clearing --------------------------------------------------------

    /// Clears from the cursor to end of line, assuming columns at and past
    /// `first_unused` are already blank. May move the cursor on terminals
    /// without a clear-to-eol string.
    pub fn clear_end_of_line(&mut self, first_unused: usize) -> Result<()> {
        let (_, col) = self.cursor.unwrap_or((0, 0));
        if col >= first_unused {
            return Ok(());
        }

        if self.curr_attr.0 & BG_NOT_DEFAULT != 0 {
            self.set_attr(Attr::default())?;
        }
        if let Some(cap) = self.caps.clr_eol.clone() {
            self.emit(&cap, 1)?;
        } else {
            self.turn_off_insert()?;
            for _ in col..first_unused {
                self.write_raw(b" ")?;
            }
            self.advance(first_unused - col);
        }
        Ok(())
    }

    pub fn clear_to_eol(&mut self) -> Result<()> {
        self.clear_end_of_line(self.cols)
    }

    pub fn clear_to_end(&mut self) -> Result<()> {
        if let Some(cap) = self.caps.clr_eos.clone() {
            let affcnt = self.affcnt_below();
            self.emit(&cap, affcnt)?;
        } else {
            let (row, _) = self.cursor.unwrap_or((0, 0));
            for i in row..self.rows {
                self.move_cursor(i, 0)?;
                self.clear_to_eol()?;
            }
        }
        Ok(())
    }

    pub fn clear_entire_screen(&mut self) -> Result<()> {
        if let Some(cap) = self.caps.clear_screen.clone() {
            let rows = self.rows;
            self.emit(&cap, rows)?;
            self.at(0, 0);
        } else {
            self.move_cursor(0, 0)?;
            self.clear_to_end()?;
        }
        Ok(())
    }

    // ---- scrolling and line insert/delete --------------------------------

    /// Sets the scroll region to rows `start..=stop`. The cursor position
    /// is lost, as terminfo specifies.
    pub fn set_scroll_region(&mut self, start: usize, stop: usize) -> Result<()> {
        debug_assert!(self.scroll_region_ok);
        let e = if let Some(csr) = self.caps.change_scroll_region.clone() {
            param::expand(&csr, &[start as i64, stop as i64])
        } else {
            let wind = self.caps.set_window.clone().unwrap();
            param::expand(&wind, &[start as i64, stop as i64, 0, self.cols as i64 - 1])
        };
        self.emit(&e, 1)?;
        self.lose_cursor();
        Ok(())
    }

    fn do_multi_ins_del(
        &mut self,
        multi: Option<Vec<u8>>,
        single: Option<Vec<u8>>,
        n: usize,
    ) -> Result<()> {
        let affcnt = self.affcnt_below();
        if let Some(multi) = multi {
            let e = param::expand(&multi, &[n as i64]);
            self.emit(&e, affcnt)?;
        } else {
            for _ in 0..n {
                self.emit_if(single.clone(), affcnt)?;
            }
        }
        Ok(())
    }

    /// Inserts `n` lines at `vpos` (deletes when `n` is negative), honoring
    /// the specified window. Returns whether anything actually happened.
    pub fn ins_del_lines(&mut self, vpos: usize, n: isize) -> Result<bool> {
        let i = n.unsigned_abs();
        debug_assert!(self.line_ins_del_ok);
        debug_assert!(i != 0);
        debug_assert!(vpos < self.specified_window);

        if self.scroll_region_ok && vpos + i >= self.specified_window {
            return Ok(false);
        }
        if !self.caps.memory_below && vpos + i >= self.rows {
            return Ok(false);
        }

        self.standout_if_wanted()?;

        if self.scroll_region_ok {
            let window = self.specified_window;
            if window != self.rows {
                self.set_scroll_region(vpos, window - 1)?;
            }

            if n < 0 {
                self.move_cursor(window - 1, 0)?;
                let affcnt = window - vpos + 1;
                for _ in 0..i {
                    let cap = self.caps.scroll_forward.clone();
                    self.emit_if(cap, affcnt)?;
                }
            } else {
                self.move_cursor(vpos, 0)?;
                let affcnt = window - vpos + 1;
                for _ in 0..i {
                    let cap = self.caps.scroll_reverse.clone();
                    self.emit_if(cap, affcnt)?;
                }
            }

            if window != self.rows {
                self.set_scroll_region(0, self.rows - 1)?;
            }
        } else if n > 0 {
            if self.specified_window != self.rows {
                self.move_cursor(self.specified_window - i, 0)?;
                self.do_multi_ins_del(
                    self.caps.parm_delete_line.clone(),
                    self.caps.delete_line.clone(),
                    i,
                )?;
            }
            self.move_cursor(vpos, 0)?;
            self.do_multi_ins_del(
                self.caps.parm_insert_line.clone(),
                self.caps.insert_line.clone(),
                i,
            )?;
        } else {
            self.move_cursor(vpos, 0)?;
            self.do_multi_ins_del(
                self.caps.parm_delete_line.clone(),
                self.caps.delete_line.clone(),
                i,
            )?;

            if self.specified_window != self.rows {
                self.move_cursor(self.specified_window - i, 0)?;
                self.do_multi_ins_del(
                    self.caps.parm_insert_line.clone(),
                    self.caps.insert_line.clone(),
                    i,
                )?;
            } else if self.caps.memory_below {
                self.move_cursor(self.rows - i, 0)?;
                self.clear_to_end()?;
            }
        }

        Ok(true)
    }
}
