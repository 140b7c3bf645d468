//! The buffer view consumed by the display engine.
//!
//! A buffer is a sequence of line descriptors plus scroll offsets, the
//! current position, and the per-buffer attribute cache for the current
//! line. The engine never walks line links itself; it asks for the nth
//! visible line and gets an `Option` back.

use core_syntax::{HighlightState, Syntax};
use core_terminal::Attr;

pub mod encoding;
pub mod matching;
pub mod width;

pub use encoding::Encoding;
pub use matching::{find_matching_bracket, BracketMatch};
pub use width::{calc_char_len, calc_pos, calc_width};

/// One line of text: raw bytes (no terminator) and the highlight state its
/// first character parses in.
#[derive(Debug, Clone, Default)]
pub struct Line {
    bytes: Vec<u8>,
    pub highlight: HighlightState,
}

impl Line {
    pub fn from_bytes(bytes: Vec<u8>) -> Line {
        Line {
            bytes,
            highlight: HighlightState::default(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Bracket-match display bookkeeping: where the highlighted match sits on
/// screen, so hiding it can restore the very cell that was touched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Automatch {
    pub shown: bool,
    pub row: usize,
    pub col: usize,
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("name", &self.name)
            .field("lines", &self.lines)
            .field("win_x", &self.win_x)
            .field("win_y", &self.win_y)
            .field("cur_line", &self.cur_line)
            .field("cur_pos", &self.cur_pos)
            .field("encoding", &self.encoding)
            .field("tab_size", &self.tab_size)
            .field("modified", &self.modified)
            .field("has_syntax", &self.syntax.is_some())
            .field("attr_cache", &self.attr_cache)
            .field("next_state", &self.next_state)
            .field("automatch", &self.automatch)
            .field("automatch_opts", &self.automatch_opts)
            .finish()
    }
}

pub struct Buffer {
    pub name: String,
    lines: Vec<Line>,
    /// Scroll offsets: leftmost visible column and topmost visible line.
    pub win_x: usize,
    pub win_y: usize,
    /// Current position, as a line index and a byte offset within it.
    pub cur_line: usize,
    pub cur_pos: usize,
    pub encoding: Encoding,
    pub tab_size: usize,
    pub modified: bool,
    pub syntax: Option<Box<dyn Syntax>>,
    /// Cached attribute vector for the current line; `None` marks it
    /// invalid (the shared parse buffer went elsewhere).
    pub attr_cache: Option<Vec<Attr>>,
    /// Highlight state at end of the current line, valid with the cache.
    pub next_state: HighlightState,
    pub automatch: Automatch,
    /// Transform bits for the bracket-match highlight: 1 inverts color
    /// brightness, 2 toggles reverse, 4 bold, 8 underline.
    pub automatch_opts: u32,
}

impl Buffer {
    pub fn from_text(name: &str, text: &str) -> Buffer {
        let lines = text
            .split('\n')
            .map(|l| Line::from_bytes(l.as_bytes().to_vec()))
            .collect();
        Buffer {
            name: name.to_string(),
            lines,
            win_x: 0,
            win_y: 0,
            cur_line: 0,
            cur_pos: 0,
            encoding: Encoding::Utf8,
            tab_size: 8,
            modified: false,
            syntax: None,
            attr_cache: None,
            next_state: HighlightState::default(),
            automatch: Automatch::default(),
            automatch_opts: 2,
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, idx: usize) -> Option<&Line> {
        self.lines.get(idx)
    }

    pub fn line_mut(&mut self, idx: usize) -> Option<&mut Line> {
        self.lines.get_mut(idx)
    }

    /// The line occupying screen row `row`, if any text reaches it.
    pub fn nth_line(&self, row: usize) -> Option<&Line> {
        self.lines.get(self.win_y + row)
    }

    pub fn has_syntax(&self) -> bool {
        self.syntax.is_some()
    }

    /// Runs the highlighter over line `idx` from its stored state, filling
    /// `attrs` with one attribute per character. Returns the end-of-line
    /// state, or `None` without a syntax engine.
    pub fn parse_line(&mut self, idx: usize, attrs: &mut Vec<Attr>) -> Option<HighlightState> {
        let utf8 = self.encoding.is_utf8();
        let syn = self.syntax.as_mut()?;
        let line = self.lines.get(idx)?;
        Some(syn.parse(&line.bytes, utf8, &line.highlight, attrs))
    }

    // Buffer mutation proper belongs to the editor; these minimal forms
    // exist so the demo and the tests can drive the display engine.

    pub fn insert_at(&mut self, idx: usize, pos: usize, c: u32) {
        let utf8 = self.encoding.is_utf8();
        let line = &mut self.lines[idx];
        let mut buf = [0u8; 6];
        let n = if utf8 {
            core_terminal::utf8::encode(c, &mut buf)
        } else {
            buf[0] = c as u8;
            1
        };
        line.bytes.splice(pos..pos, buf[..n].iter().copied());
        self.modified = true;
    }

    /// Removes the character at byte `pos`, returning it.
    pub fn delete_at(&mut self, idx: usize, pos: usize) -> Option<u32> {
        let enc = self.encoding;
        let line = &mut self.lines[idx];
        if pos >= line.bytes.len() {
            return None;
        }
        let c = encoding::char_at(&line.bytes, pos, enc);
        let end = encoding::next_pos(&line.bytes, pos, enc);
        line.bytes.drain(pos..end);
        self.modified = true;
        Some(c)
    }

    /// Replaces the character at byte `pos`, returning the old one.
    pub fn replace_at(&mut self, idx: usize, pos: usize, c: u32) -> Option<u32> {
        let old = self.delete_at(idx, pos)?;
        self.insert_at(idx, pos, c);
        Some(old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nth_line_follows_the_scroll_offset() {
        let mut b = Buffer::from_text("t", "one\ntwo\nthree\nfour");
        assert_eq!(b.nth_line(1).unwrap().as_bytes(), b"two");
        b.win_y = 2;
        assert_eq!(b.nth_line(1).unwrap().as_bytes(), b"four");
        assert!(b.nth_line(2).is_none());
    }

    #[test]
    fn mutators_round_trip() {
        let mut b = Buffer::from_text("t", "abc");
        b.insert_at(0, 1, u32::from('é'));
        assert_eq!(b.line(0).unwrap().as_bytes(), "aébc".as_bytes());
        assert_eq!(b.delete_at(0, 1), Some(u32::from('é')));
        assert_eq!(b.replace_at(0, 0, u32::from('z')), Some(u32::from('a')));
        assert_eq!(b.line(0).unwrap().as_bytes(), b"zbc");
    }
}
