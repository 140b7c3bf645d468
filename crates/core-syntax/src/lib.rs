//! The syntax highlighting seam.
//!
//! The display engine does not know how to highlight; it knows that every
//! line starts in a [`HighlightState`], that parsing a line yields one
//! attribute per logical character plus the state the *next* line starts
//! in, and that two equal states parse identically. That last property is
//! what lets re-highlighting stop: propagation runs down the buffer only
//! until a line's stored state matches the state flowing into it.
//!
//! [`CLike`] is a deliberately small highlighter (line comments, block
//! comments, strings) whose block comments span lines, giving the state
//! propagation something real to chew on.

use core_terminal::{utf8, Attr};

/// Where a line's first token starts parsing. Opaque to the engine;
/// equality is structural, and stable across identical prior context.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HighlightState {
    pub state: u32,
    pub stack: Vec<u32>,
    pub saved: String,
}

impl HighlightState {
    pub fn new(state: u32) -> HighlightState {
        HighlightState {
            state,
            stack: Vec::new(),
            saved: String::new(),
        }
    }
}

pub trait Syntax {
    /// Parses `line` starting from `state`, pushing one attribute per
    /// logical character into `attrs` (which is cleared first), and
    /// returns the state at end of line.
    fn parse(
        &mut self,
        line: &[u8],
        utf8: bool,
        state: &HighlightState,
        attrs: &mut Vec<Attr>,
    ) -> HighlightState;
}

const PLAIN: u32 = 0;
const IN_BLOCK_COMMENT: u32 = 1;

/// Comments and strings for C-family sources. Strings never cross a line
/// boundary; block comments do.
pub struct CLike {
    pub comment_fg: u8,
    pub string_fg: u8,
}

impl Default for CLike {
    fn default() -> Self {
        CLike {
            comment_fg: 6,
            string_fg: 2,
        }
    }
}

impl Syntax for CLike {
    fn parse(
        &mut self,
        line: &[u8],
        is_utf8: bool,
        state: &HighlightState,
        attrs: &mut Vec<Attr>,
    ) -> HighlightState {
        attrs.clear();

        let comment = Attr::default().with_fg(Some(self.comment_fg));
        let string = Attr::default().with_fg(Some(self.string_fg));
        let plain = Attr::default();

        let mut in_block = state.state == IN_BLOCK_COMMENT;
        let mut in_string = false;
        let mut escaped = false;
        let mut pos = 0;
        // Bytes of the current token already attributed; lets a two-byte
        // opener or closer color both of its characters.
        let mut pending_comment = 0usize;

        while pos < line.len() {
            let step = if is_utf8 { utf8::seq_len(line[pos]) } else { 1 };
            let b = line[pos];

            if in_block {
                attrs.push(comment);
                if pending_comment > 0 {
                    pending_comment -= 1;
                } else if b == b'*' && line.get(pos + 1) == Some(&b'/') {
                    attrs.push(comment);
                    pos += 2;
                    in_block = false;
                    continue;
                }
            } else if in_string {
                attrs.push(string);
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                }
            } else if b == b'/' && line.get(pos + 1) == Some(&b'/') {
                // Line comment: everything to end of line.
                let mut p = pos;
                while p < line.len() {
                    attrs.push(comment);
                    p += if is_utf8 { utf8::seq_len(line[p]) } else { 1 };
                }
                break;
            } else if b == b'/' && line.get(pos + 1) == Some(&b'*') {
                attrs.push(comment);
                pending_comment = 1;
                in_block = true;
            } else if b == b'"' {
                attrs.push(string);
                in_string = true;
            } else {
                attrs.push(plain);
            }

            pos += step;
        }

        HighlightState::new(if in_block { IN_BLOCK_COMMENT } else { PLAIN })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(syn: &mut CLike, line: &str, state: &HighlightState) -> (Vec<Attr>, HighlightState) {
        let mut attrs = Vec::new();
        let next = syn.parse(line.as_bytes(), true, state, &mut attrs);
        (attrs, next)
    }

    #[test]
    fn one_attribute_per_character() {
        let mut syn = CLike::default();
        let (attrs, next) = parse(&mut syn, "ab // cé", &HighlightState::default());
        assert_eq!(attrs.len(), 8);
        assert_eq!(next, HighlightState::new(PLAIN));
    }

    #[test]
    fn block_comment_carries_state_across_lines() {
        let mut syn = CLike::default();
        let (_, s1) = parse(&mut syn, "int x; /* start", &HighlightState::default());
        assert_eq!(s1, HighlightState::new(IN_BLOCK_COMMENT));
        let (attrs, s2) = parse(&mut syn, "end */ y;", &s1);
        assert_eq!(s2, HighlightState::new(PLAIN));
        let comment = Attr::default().with_fg(Some(syn.comment_fg));
        assert_eq!(attrs[0], comment);
        assert_eq!(attrs[5], comment); // the closing '/'
        assert_eq!(attrs[7], Attr::default()); // 'y' back to plain
    }

    #[test]
    fn strings_do_not_cross_lines() {
        let mut syn = CLike::default();
        let (attrs, next) = parse(&mut syn, "a \"b \\\" c", &HighlightState::default());
        assert_eq!(next, HighlightState::new(PLAIN));
        let string = Attr::default().with_fg(Some(syn.string_fg));
        assert_eq!(attrs[2], string);
        assert_eq!(*attrs.last().unwrap(), string);
    }

    #[test]
    fn equal_states_compare_equal_structurally() {
        let a = HighlightState {
            state: 3,
            stack: vec![1, 2],
            saved: "xx".into(),
        };
        let b = HighlightState {
            state: 3,
            stack: vec![1, 2],
            saved: "xx".into(),
        };
        assert_eq!(a, b);
        assert_ne!(a, HighlightState::new(3));
    }
}
