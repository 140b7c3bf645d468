//! The typed capability table.
//!
//! Everything the engine knows about a terminal lives in one record of
//! named capability strings, flags and numbers, copied once at startup
//! either out of the system terminfo database (selected by `TERM`) or from
//! the hardwired ANSI profile. After startup the database is never
//! consulted again; the fields are public so tests can assemble synthetic
//! profiles.

use terminfo::{capability::Value, Database};
use thiserror::Error;

use crate::attr::NoColorVideo;

#[derive(Debug, Error)]
pub enum TermSetupError {
    #[error(
        "there are problems finding your terminal in the database; \
         check that TERM is set correctly, or try --ansi"
    )]
    Database(#[source] terminfo::Error),
    #[error("your terminal lacks the ability to position the cursor (generic entry: {generic})")]
    NotAddressable { generic: bool },
    #[error("the size of the terminal is unknown")]
    SizeUnknown,
}

/// Capability record consumed by the display engine. String capabilities
/// keep their parametric `%` encoding and padding directives; they are
/// expanded at emission time.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    /// The database flagged this entry as a generic (not real) terminal.
    pub generic_type: bool,

    pub lines: usize,
    pub columns: usize,
    pub no_color_video: NoColorVideo,

    // Motion.
    pub cursor_address: Option<Vec<u8>>,
    pub column_address: Option<Vec<u8>>,
    pub row_address: Option<Vec<u8>>,
    pub carriage_return: Option<Vec<u8>>,
    pub cursor_home: Option<Vec<u8>>,
    pub cursor_to_ll: Option<Vec<u8>>,
    pub cursor_up: Option<Vec<u8>>,
    pub cursor_down: Option<Vec<u8>>,
    pub cursor_left: Option<Vec<u8>>,
    pub cursor_right: Option<Vec<u8>>,
    pub tab: Option<Vec<u8>>,
    pub init_tabs: Option<u32>,

    pub auto_right_margin: bool,
    pub eat_newline_glitch: bool,
    /// Carriage return also performs a line feed.
    pub carriage_return_does_lf: bool,

    // Clearing.
    pub clr_eol: Option<Vec<u8>>,
    pub clr_eos: Option<Vec<u8>>,
    pub clear_screen: Option<Vec<u8>>,

    pub bell: Option<Vec<u8>>,
    pub flash_screen: Option<Vec<u8>>,

    // Scrolling and line edits.
    pub scroll_forward: Option<Vec<u8>>,
    pub scroll_reverse: Option<Vec<u8>>,
    pub change_scroll_region: Option<Vec<u8>>,
    pub set_window: Option<Vec<u8>>,
    pub insert_line: Option<Vec<u8>>,
    pub parm_insert_line: Option<Vec<u8>>,
    pub delete_line: Option<Vec<u8>>,
    pub parm_delete_line: Option<Vec<u8>>,
    pub memory_below: bool,

    // Character edits.
    pub enter_insert_mode: Option<Vec<u8>>,
    pub exit_insert_mode: Option<Vec<u8>>,
    pub enter_delete_mode: Option<Vec<u8>>,
    pub exit_delete_mode: Option<Vec<u8>>,
    pub insert_character: Option<Vec<u8>>,
    pub insert_padding: Option<Vec<u8>>,
    pub parm_ich: Option<Vec<u8>>,
    pub delete_character: Option<Vec<u8>>,
    pub parm_dch: Option<Vec<u8>>,
    pub move_insert_mode: bool,

    // Attributes.
    pub enter_standout_mode: Option<Vec<u8>>,
    pub exit_standout_mode: Option<Vec<u8>>,
    pub magic_cookie_glitch: i32,
    pub move_standout_mode: bool,
    pub enter_bold_mode: Option<Vec<u8>>,
    pub enter_underline_mode: Option<Vec<u8>>,
    pub enter_dim_mode: Option<Vec<u8>>,
    pub enter_blink_mode: Option<Vec<u8>>,
    pub enter_reverse_mode: Option<Vec<u8>>,
    pub exit_attribute_mode: Option<Vec<u8>>,
    pub exit_alt_charset_mode: Option<Vec<u8>>,
    pub set_foreground: Option<Vec<u8>>,
    pub set_background: Option<Vec<u8>>,
    /// The color strings use ANSI numbering (`setaf`/`setab`).
    pub ansi_color_ok: bool,

    pub tilde_glitch: bool,
    pub transparent_underline: bool,

    // Cursor visibility, modes, initialization.
    pub cursor_invisible: Option<Vec<u8>>,
    pub cursor_normal: Option<Vec<u8>>,
    pub enter_ca_mode: Option<Vec<u8>>,
    pub exit_ca_mode: Option<Vec<u8>>,
    pub keypad_xmit: Option<Vec<u8>>,
    pub keypad_local: Option<Vec<u8>>,
    pub has_meta_key: bool,
    pub meta_on: Option<Vec<u8>>,
    pub meta_off: Option<Vec<u8>>,
}

fn s(v: &'static [u8]) -> Option<Vec<u8>> {
    Some(v.to_vec())
}

impl Capabilities {
    /// The hardwired ANSI profile, for environments without a usable
    /// database: 25x80, VT100-class sequences, eight ANSI colors, standout
    /// and underline excluded from color.
    pub fn ansi() -> Capabilities {
        Capabilities {
            lines: 25,
            columns: 80,
            no_color_video: NoColorVideo::STANDOUT | NoColorVideo::UNDERLINE,
            cursor_address: s(b"\x1b[%i%p1%d;%p2%dH"),
            carriage_return: s(b"\r"),
            cursor_home: s(b"\x1b[H"),
            cursor_up: s(b"\x1b[A"),
            cursor_down: s(b"\x1b[B"),
            cursor_left: s(b"\x1b[D"),
            cursor_right: s(b"\x1b[C"),
            auto_right_margin: true,
            clr_eol: s(b"\x1b[K"),
            clr_eos: s(b"\x1b[J"),
            clear_screen: s(b"\x1b[H\x1b[J"),
            bell: s(b"\x07"),
            scroll_forward: s(b"\n"),
            insert_line: s(b"\x1b[L"),
            delete_line: s(b"\x1b[M"),
            delete_character: s(b"\x1b[P"),
            move_insert_mode: true,
            enter_standout_mode: s(b"\x1b[7m"),
            exit_standout_mode: s(b"\x1b[m"),
            exit_attribute_mode: s(b"\x1b[m"),
            exit_alt_charset_mode: s(b"\x1b[10m"),
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

    /// Loads the entry selected by `TERM` from the system database.
    pub fn from_env() -> Result<Capabilities, TermSetupError> {
        let db = Database::from_env().map_err(TermSetupError::Database)?;
        Ok(Capabilities::from_database(&db))
    }

    pub fn from_database(db: &Database) -> Capabilities {
        let string = |names: &[&str]| -> Option<Vec<u8>> {
            names.iter().find_map(|n| match db.raw(n) {
                Some(Value::String(v)) => Some(v.clone()),
                _ => None,
            })
        };
        let flag = |names: &[&str]| -> bool {
            names.iter().any(|n| matches!(db.raw(n), Some(Value::True)))
        };
        let number = |names: &[&str]| -> Option<i32> {
            names.iter().find_map(|n| match db.raw(n) {
                Some(Value::Number(v)) => Some(*v),
                _ => None,
            })
        };

        // ANSI color strings are preferred; the legacy pair implies the
        // permuted palette.
        let setaf = string(&["setaf", "set_a_foreground"]);
        let setab = string(&["setab", "set_a_background"]);
        let ansi_color_ok = setaf.is_some() && setab.is_some();
        let (set_foreground, set_background) = if ansi_color_ok {
            (setaf, setab)
        } else {
            (
                string(&["setf", "set_foreground"]),
                string(&["setb", "set_background"]),
            )
        };

        let mut caps = Capabilities {
            generic_type: flag(&["gn", "generic_type"]),
            lines: number(&["lines"]).unwrap_or(0).max(0) as usize,
            columns: number(&["cols", "columns"]).unwrap_or(0).max(0) as usize,
            no_color_video: NoColorVideo::from_bits_truncate(
                number(&["ncv", "no_color_video"]).unwrap_or(0).max(0) as u32,
            ),
            cursor_address: string(&["cup", "cursor_address"]),
            column_address: string(&["hpa", "column_address"]),
            row_address: string(&["vpa", "row_address"]),
            carriage_return: string(&["cr", "carriage_return"]),
            cursor_home: string(&["home", "cursor_home"]),
            cursor_to_ll: string(&["ll", "cursor_to_ll"]),
            cursor_up: string(&["cuu1", "cursor_up"]),
            cursor_down: string(&["cud1", "cursor_down"]),
            cursor_left: string(&["cub1", "cursor_left"]),
            cursor_right: string(&["cuf1", "cursor_right"]),
            tab: string(&["ht", "tab"]),
            init_tabs: number(&["it", "init_tabs"]).and_then(|v| u32::try_from(v).ok()),
            auto_right_margin: flag(&["am", "auto_right_margin"]),
            eat_newline_glitch: flag(&["xenl", "eat_newline_glitch"]),
            carriage_return_does_lf: false,
            clr_eol: string(&["el", "clr_eol"]),
            clr_eos: string(&["ed", "clr_eos"]),
            clear_screen: string(&["clear", "clear_screen"]),
            bell: string(&["bel", "bell"]),
            flash_screen: string(&["flash", "flash_screen"]),
            scroll_forward: string(&["ind", "scroll_forward"]),
            scroll_reverse: string(&["ri", "scroll_reverse"]),
            change_scroll_region: string(&["csr", "change_scroll_region"]),
            set_window: string(&["wind", "set_window"]),
            insert_line: string(&["il1", "insert_line"]),
            parm_insert_line: string(&["il", "parm_insert_line"]),
            delete_line: string(&["dl1", "delete_line"]),
            parm_delete_line: string(&["dl", "parm_delete_line"]),
            memory_below: flag(&["db", "memory_below"]),
            enter_insert_mode: string(&["smir", "enter_insert_mode"]),
            exit_insert_mode: string(&["rmir", "exit_insert_mode"]),
            enter_delete_mode: string(&["smdc", "enter_delete_mode"]),
            exit_delete_mode: string(&["rmdc", "exit_delete_mode"]),
            insert_character: string(&["ich1", "insert_character"]),
            insert_padding: string(&["ip", "insert_padding"]),
            parm_ich: string(&["ich", "parm_ich"]),
            delete_character: string(&["dch1", "delete_character"]),
            parm_dch: string(&["dch", "parm_dch"]),
            move_insert_mode: flag(&["mir", "move_insert_mode"]),
            enter_standout_mode: string(&["smso", "enter_standout_mode"]),
            exit_standout_mode: string(&["rmso", "exit_standout_mode"]),
            magic_cookie_glitch: number(&["xmc", "magic_cookie_glitch"]).unwrap_or(-1),
            move_standout_mode: flag(&["msgr", "move_standout_mode"]),
            enter_bold_mode: string(&["bold", "enter_bold_mode"]),
            enter_underline_mode: string(&["smul", "enter_underline_mode"]),
            enter_dim_mode: string(&["dim", "enter_dim_mode"]),
            enter_blink_mode: string(&["blink", "enter_blink_mode"]),
            enter_reverse_mode: string(&["rev", "enter_reverse_mode"]),
            exit_attribute_mode: string(&["sgr0", "exit_attribute_mode"]),
            exit_alt_charset_mode: string(&["rmacs", "exit_alt_charset_mode"]),
            set_foreground,
            set_background,
            ansi_color_ok,
            tilde_glitch: flag(&["hz", "tilde_glitch"]),
            transparent_underline: flag(&["ul", "transparent_underline"]),
            cursor_invisible: string(&["civis", "cursor_invisible"]),
            cursor_normal: string(&["cnorm", "cursor_normal"]),
            enter_ca_mode: string(&["smcup", "enter_ca_mode"]),
            exit_ca_mode: string(&["rmcup", "exit_ca_mode"]),
            keypad_xmit: string(&["smkx", "keypad_xmit"]),
            keypad_local: string(&["rmkx", "keypad_local"]),
            has_meta_key: flag(&["km", "has_meta_key"]),
            meta_on: string(&["smm", "meta_on"]),
            meta_off: string(&["rmm", "meta_off"]),
        };
        caps.apply_fallbacks();
        caps
    }

    /// Database patch-ups: a bell every terminal can ring, and plain
    /// up/down motion standing in for missing scroll strings.
    pub fn apply_fallbacks(&mut self) {
        if self.bell.is_none() {
            self.bell = s(b"\x07");
        }
        if self.scroll_forward.is_none() {
            self.scroll_forward = self.cursor_down.clone();
        }
        if self.scroll_reverse.is_none() {
            self.scroll_reverse = self.cursor_up.clone();
        }
    }

    /// Checks the minimum feature set: absolute addressing, or enough
    /// relative motion to reach every cell, plus a known geometry.
    pub fn validate(&self) -> Result<(), TermSetupError> {
        if self.cursor_address.is_none() {
            if self.cursor_up.is_none() || self.cursor_left.is_none() {
                return Err(TermSetupError::NotAddressable {
                    generic: self.generic_type,
                });
            }
            if self.cursor_down.is_none() || self.cursor_right.is_none() {
                return Err(TermSetupError::NotAddressable {
                    generic: self.generic_type,
                });
            }
        }
        if self.lines == 0 || self.columns == 0 {
            return Err(TermSetupError::SizeUnknown);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ansi_profile_is_valid() {
        let caps = Capabilities::ansi();
        assert!(caps.validate().is_ok());
        assert_eq!(caps.lines, 25);
        assert_eq!(caps.columns, 80);
        assert!(caps.ansi_color_ok);
    }

    #[test]
    fn validation_requires_motion() {
        let caps = Capabilities {
            lines: 24,
            columns: 80,
            ..Capabilities::default()
        };
        assert!(matches!(
            caps.validate(),
            Err(TermSetupError::NotAddressable { .. })
        ));
    }

    #[test]
    fn validation_requires_geometry() {
        let mut caps = Capabilities::ansi();
        caps.lines = 0;
        assert!(matches!(caps.validate(), Err(TermSetupError::SizeUnknown)));
    }

    #[test]
    fn relative_only_terminal_is_accepted() {
        let caps = Capabilities {
            lines: 24,
            columns: 80,
            cursor_up: s(b"\x1bA"),
            cursor_down: s(b"\n"),
            cursor_left: s(b"\x08"),
            cursor_right: s(b"\x1bC"),
            ..Capabilities::default()
        };
        assert!(caps.validate().is_ok());
    }
}
