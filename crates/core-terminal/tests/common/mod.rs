//! Shared fixtures: synthetic capability profiles and a byte-stream
//! interpreter that tracks where a real terminal's cursor would end up.

#![allow(dead_code)]

use core_terminal::Capabilities;

fn s(v: &'static [u8]) -> Option<Vec<u8>> {
    Some(v.to_vec())
}

/// A VT100-flavored profile: padded motion strings, hardware tabs, the
/// eat-newline glitch, no horizontal/vertical absolute addressing.
pub fn vt100() -> Capabilities {
    Capabilities {
        lines: 24,
        columns: 80,
        cursor_address: s(b"\x1b[%i%p1%d;%p2%dH$<5>"),
        carriage_return: s(b"\r"),
        cursor_home: s(b"\x1b[H"),
        cursor_up: s(b"\x1b[A$<2>"),
        cursor_down: s(b"\n"),
        cursor_left: s(b"\x08"),
        cursor_right: s(b"\x1b[C$<2>"),
        tab: s(b"\t"),
        init_tabs: Some(8),
        auto_right_margin: true,
        eat_newline_glitch: true,
        clr_eol: s(b"\x1b[K$<3>"),
        clr_eos: s(b"\x1b[J$<50>"),
        clear_screen: s(b"\x1b[H\x1b[J$<50>"),
        scroll_forward: s(b"\n"),
        scroll_reverse: s(b"\x1bM$<5>"),
        change_scroll_region: s(b"\x1b[%i%p1%d;%p2%dr$<5>"),
        enter_standout_mode: s(b"\x1b[7m$<2>"),
        exit_standout_mode: s(b"\x1b[m$<2>"),
        exit_attribute_mode: s(b"\x1b[m"),
        magic_cookie_glitch: -1,
        ..Capabilities::default()
    }
}

/// An xterm-flavored profile: column/row absolute addressing, parametric
/// character insert/delete, line insert/delete, ANSI colors.
pub fn xterm_like() -> Capabilities {
    Capabilities {
        lines: 40,
        columns: 100,
        cursor_address: s(b"\x1b[%i%p1%d;%p2%dH"),
        column_address: s(b"\x1b[%i%p1%dG"),
        row_address: s(b"\x1b[%i%p1%dd"),
        carriage_return: s(b"\r"),
        cursor_home: s(b"\x1b[H"),
        cursor_up: s(b"\x1b[A"),
        cursor_down: s(b"\x1b[B"),
        cursor_left: s(b"\x08"),
        cursor_right: s(b"\x1b[C"),
        auto_right_margin: true,
        eat_newline_glitch: true,
        clr_eol: s(b"\x1b[K"),
        clr_eos: s(b"\x1b[J"),
        clear_screen: s(b"\x1b[H\x1b[2J"),
        scroll_forward: s(b"\n"),
        scroll_reverse: s(b"\x1bM"),
        change_scroll_region: s(b"\x1b[%i%p1%d;%p2%dr"),
        insert_line: s(b"\x1b[L"),
        parm_insert_line: s(b"\x1b[%p1%dL"),
        delete_line: s(b"\x1b[M"),
        parm_delete_line: s(b"\x1b[%p1%dM"),
        parm_ich: s(b"\x1b[%p1%d@"),
        parm_dch: s(b"\x1b[%p1%dP"),
        enter_insert_mode: s(b"\x1b[4h"),
        exit_insert_mode: s(b"\x1b[4l"),
        move_insert_mode: true,
        enter_standout_mode: s(b"\x1b[7m"),
        exit_standout_mode: s(b"\x1b[27m"),
        magic_cookie_glitch: -1,
        move_standout_mode: true,
        enter_bold_mode: s(b"\x1b[1m"),
        enter_underline_mode: s(b"\x1b[4m"),
        enter_blink_mode: s(b"\x1b[5m"),
        enter_dim_mode: s(b"\x1b[2m"),
        enter_reverse_mode: s(b"\x1b[7m"),
        exit_attribute_mode: s(b"\x1b(B\x1b[m"),
        set_foreground: s(b"\x1b[3%p1%dm"),
        set_background: s(b"\x1b[4%p1%dm"),
        ansi_color_ok: true,
        cursor_invisible: s(b"\x1b[?25l"),
        cursor_normal: s(b"\x1b[?25h"),
        ..Capabilities::default()
    }
}

/// Interprets the byte stream the way a VT100-family terminal would,
/// tracking only the cursor. `lost` goes true on sequences after which the
/// hardware cursor position is unspecified (scroll-region changes).
pub struct Vt {
    pub rows: usize,
    pub cols: usize,
    pub am: bool,
    pub xenl: bool,
    pub row: usize,
    pub col: usize,
    pub lost: bool,
}

impl Vt {
    pub fn new(caps: &Capabilities) -> Vt {
        Vt {
            rows: caps.lines,
            cols: caps.columns,
            am: caps.auto_right_margin,
            xenl: caps.eat_newline_glitch,
            row: 0,
            col: 0,
            lost: false,
        }
    }

    fn put_printable(&mut self) {
        if self.col >= self.cols {
            // Deferred wrap fires on the next printable.
            self.row = (self.row + 1).min(self.rows - 1);
            self.col = 0;
        }
        self.col += 1;
        if self.col >= self.cols {
            if !self.am {
                self.col = self.cols - 1;
            } else if !self.xenl {
                self.col = 0;
                self.row = (self.row + 1).min(self.rows - 1);
            }
            // With xenl the cursor floats at the phantom column.
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                0x00 => {} // padding
                b'\r' => self.col = 0,
                b'\n' => self.row = (self.row + 1).min(self.rows - 1),
                0x08 => self.col = self.col.saturating_sub(1),
                b'\t' => {
                    self.col = (self.col / 8 + 1) * 8;
                    if self.col >= self.cols {
                        self.col = self.cols - 1;
                    }
                }
                0x1b => {
                    i += 1;
                    if i >= bytes.len() {
                        break;
                    }
                    match bytes[i] {
                        b'[' => {
                            i += 1;
                            let start = i;
                            while i < bytes.len() && !(0x40..=0x7E).contains(&bytes[i]) {
                                i += 1;
                            }
                            if i >= bytes.len() {
                                break;
                            }
                            let args: Vec<usize> = bytes[start..i]
                                .split(|&b| b == b';')
                                .map(|p| {
                                    std::str::from_utf8(p)
                                        .ok()
                                        .and_then(|t| t.parse().ok())
                                        .unwrap_or(0)
                                })
                                .collect();
                            let arg = |k: usize, default: usize| {
                                args.get(k).copied().filter(|&v| v > 0).unwrap_or(default)
                            };
                            match bytes[i] {
                                b'H' | b'f' => {
                                    self.row = (arg(0, 1) - 1).min(self.rows - 1);
                                    self.col = (arg(1, 1) - 1).min(self.cols - 1);
                                }
                                b'A' => self.row = self.row.saturating_sub(arg(0, 1)),
                                b'B' => self.row = (self.row + arg(0, 1)).min(self.rows - 1),
                                b'C' => self.col = (self.col + arg(0, 1)).min(self.cols - 1),
                                b'D' => self.col = self.col.saturating_sub(arg(0, 1)),
                                b'G' => self.col = (arg(0, 1) - 1).min(self.cols - 1),
                                b'd' => self.row = (arg(0, 1) - 1).min(self.rows - 1),
                                b'r' => self.lost = true,
                                _ => {}
                            }
                        }
                        b'M' => self.row = self.row.saturating_sub(1),
                        b'(' => i += 1, // charset designator: one payload byte
                        _ => {}
                    }
                }
                0x20..=0x7E => self.put_printable(),
                _ => {}
            }
            i += 1;
        }
    }
}
