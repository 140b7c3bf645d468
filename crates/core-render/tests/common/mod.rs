//! Test fixtures: an in-memory screen grid that interprets the engine's
//! byte stream, capability profiles, and byte-stream classifiers.

#![allow(dead_code)]

use core_terminal::{Capabilities, Screen};

fn s(v: &'static [u8]) -> Option<Vec<u8>> {
    Some(v.to_vec())
}

/// ANSI-flavored profile with character and line insert/delete but no
/// scroll region, so line edits come out as CSI L/M the grid understands.
pub fn editing_profile() -> Capabilities {
    Capabilities {
        lines: 25,
        columns: 80,
        cursor_address: s(b"\x1b[%i%p1%d;%p2%dH"),
        carriage_return: s(b"\r"),
        cursor_home: s(b"\x1b[H"),
        cursor_up: s(b"\x1b[A"),
        cursor_down: s(b"\x1b[B"),
        cursor_left: s(b"\x08"),
        cursor_right: s(b"\x1b[C"),
        auto_right_margin: true,
        clr_eol: s(b"\x1b[K"),
        clr_eos: s(b"\x1b[J"),
        clear_screen: s(b"\x1b[H\x1b[J"),
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
        exit_standout_mode: s(b"\x1b[m"),
        exit_attribute_mode: s(b"\x1b[m"),
        magic_cookie_glitch: -1,
        enter_bold_mode: s(b"\x1b[1m"),
        enter_underline_mode: s(b"\x1b[4m"),
        enter_blink_mode: s(b"\x1b[5m"),
        enter_reverse_mode: s(b"\x1b[7m"),
        set_foreground: s(b"\x1b[3%p1%dm"),
        set_background: s(b"\x1b[4%p1%dm"),
        ansi_color_ok: true,
        ..Capabilities::default()
    }
}

pub fn screen(caps: Capabilities) -> Screen<Vec<u8>> {
    let mut scr = Screen::new(caps, 0, true, Vec::new()).unwrap();
    scr.clear_entire_screen().unwrap();
    scr.writer_mut().clear();
    scr
}

pub fn take(scr: &mut Screen<Vec<u8>>) -> Vec<u8> {
    std::mem::take(scr.writer_mut())
}

/// Counts payload characters: printables that land in cells, with escape
/// sequences and controls stripped. Multi-byte UTF-8 counts once.
pub fn printable_payload(bytes: &[u8]) -> usize {
    let mut n = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == 0x1b {
            i += 1;
            if i < bytes.len() && bytes[i] == b'[' {
                i += 1;
                while i < bytes.len() && !(0x40..=0x7E).contains(&bytes[i]) {
                    i += 1;
                }
            }
        } else if (0x20..0x7F).contains(&b) {
            n += 1;
        } else if b >= 0xC0 {
            n += 1; // UTF-8 lead byte
        }
        i += 1;
    }
    n
}

/// A character-cell screen fed with the engine's output. Attributes are
/// ignored; geometry, clears, and character/line insert-delete are honored.
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
    cells: Vec<Vec<char>>,
    pub cur: (usize, usize),
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Grid {
        Grid {
            rows,
            cols,
            cells: vec![vec![' '; cols]; rows],
            cur: (0, 0),
        }
    }

    pub fn row_text(&self, r: usize) -> String {
        self.cells[r].iter().collect::<String>().trim_end().to_string()
    }

    fn put(&mut self, c: char) {
        let (r, col) = self.cur;
        if col < self.cols {
            self.cells[r][col] = c;
        }
        self.cur.1 = (col + 1).min(self.cols);
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            match b {
                b'\r' => self.cur.1 = 0,
                b'\n' => self.cur.0 = (self.cur.0 + 1).min(self.rows - 1),
                0x08 => self.cur.1 = self.cur.1.saturating_sub(1),
                0x1b => {
                    i += 1;
                    if i >= bytes.len() {
                        break;
                    }
                    if bytes[i] != b'[' {
                        i += 1;
                        continue;
                    }
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
                    let arg = |k: usize, d: usize| {
                        args.get(k).copied().filter(|&v| v > 0).unwrap_or(d)
                    };
                    let (r, c) = self.cur;
                    match bytes[i] {
                        b'H' | b'f' => {
                            self.cur = (
                                (arg(0, 1) - 1).min(self.rows - 1),
                                (arg(1, 1) - 1).min(self.cols - 1),
                            );
                        }
                        b'A' => self.cur.0 = r.saturating_sub(arg(0, 1)),
                        b'B' => self.cur.0 = (r + arg(0, 1)).min(self.rows - 1),
                        b'C' => self.cur.1 = (c + arg(0, 1)).min(self.cols - 1),
                        b'D' => self.cur.1 = c.saturating_sub(arg(0, 1)),
                        b'K' => {
                            for cell in &mut self.cells[r][c..] {
                                *cell = ' ';
                            }
                        }
                        b'J' => {
                            for cell in &mut self.cells[r][c..] {
                                *cell = ' ';
                            }
                            for row in &mut self.cells[r + 1..] {
                                row.fill(' ');
                            }
                        }
                        b'@' => {
                            let n = arg(0, 1);
                            for _ in 0..n {
                                self.cells[r].insert(c.min(self.cols), ' ');
                                self.cells[r].truncate(self.cols);
                            }
                        }
                        b'P' => {
                            let n = arg(0, 1).min(self.cols - c);
                            for _ in 0..n {
                                self.cells[r].remove(c);
                                self.cells[r].push(' ');
                            }
                        }
                        b'L' => {
                            let n = arg(0, 1);
                            for _ in 0..n {
                                self.cells.insert(r, vec![' '; self.cols]);
                                self.cells.truncate(self.rows);
                            }
                        }
                        b'M' => {
                            let n = arg(0, 1);
                            for _ in 0..n {
                                self.cells.remove(r);
                                self.cells.push(vec![' '; self.cols]);
                            }
                        }
                        _ => {} // SGR, modes
                    }
                }
                0x20..=0x7E => self.put(b as char),
                0xC0.. => {
                    let len = core_terminal::utf8::seq_len(b);
                    let c = core_terminal::utf8::decode(&bytes[i..]);
                    self.put(char::from_u32(c).unwrap_or('?'));
                    i += len - 1;
                }
                _ => {}
            }
            i += 1;
        }
    }
}
