//! Packed visual attributes.
//!
//! One cell's rendition is a 32-bit word: an 8-bit style field (reverse,
//! bold, underline, dim, blink), then a 4-bit foreground palette index with
//! a "not default" flag bit, then the same for the background. Bit 3 of a
//! palette index selects the bright variant. The layout is public because
//! the differential renderer compares whole words, and the bracket-match
//! highlighter toggles individual fields.

use bitflags::bitflags;

bitflags! {
    /// Style bits of an [`Attr`]. These occupy the low byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Style: u32 {
        const INVERSE   = 1 << 0;
        const UNDERLINE = 1 << 1;
        const BOLD      = 1 << 2;
        const DIM       = 1 << 3;
        const BLINK     = 1 << 4;
    }
}

bitflags! {
    /// The terminfo `ncv` mask: attributes that cannot be combined with
    /// color on this terminal.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NoColorVideo: u32 {
        const STANDOUT    = 1 << 0;
        const UNDERLINE   = 1 << 1;
        const REVERSE     = 1 << 2;
        const BLINK       = 1 << 3;
        const DIM         = 1 << 4;
        const BOLD        = 1 << 5;
        const INVIS       = 1 << 6;
        const PROTECT     = 1 << 7;
        const ALT_CHARSET = 1 << 8;
    }
}

pub const AT_MASK: u32 = 0xFF;
pub const FG_SHIFT: u32 = 8;
pub const BG_SHIFT: u32 = 16;
pub const FG_NOT_DEFAULT: u32 = 1 << 12;
pub const BG_NOT_DEFAULT: u32 = 1 << 20;
/// Color field plus its not-default flag; comparing under this mask decides
/// whether a color transition must be emitted.
pub const FG_MASK: u32 = 0xF << FG_SHIFT | FG_NOT_DEFAULT;
pub const BG_MASK: u32 = 0xF << BG_SHIFT | BG_NOT_DEFAULT;
const BRIGHT: u32 = 0x8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Attr(pub u32);

impl Attr {
    pub fn new(style: Style, fg: Option<u8>, bg: Option<u8>) -> Attr {
        let mut a = Attr(style.bits());
        a = a.with_fg(fg);
        a.with_bg(bg)
    }

    pub fn style(self) -> Style {
        Style::from_bits_truncate(self.0 & AT_MASK)
    }

    pub fn with_style(self, style: Style) -> Attr {
        Attr(self.0 & !AT_MASK | style.bits())
    }

    /// Foreground palette index, `None` when the terminal default applies.
    pub fn fg(self) -> Option<u8> {
        (self.0 & FG_NOT_DEFAULT != 0).then_some((self.0 >> FG_SHIFT & 0xF) as u8)
    }

    pub fn bg(self) -> Option<u8> {
        (self.0 & BG_NOT_DEFAULT != 0).then_some((self.0 >> BG_SHIFT & 0xF) as u8)
    }

    pub fn with_fg(self, fg: Option<u8>) -> Attr {
        match fg {
            Some(c) => Attr(self.0 & !FG_MASK | u32::from(c & 0xF) << FG_SHIFT | FG_NOT_DEFAULT),
            None => Attr(self.0 & !FG_MASK),
        }
    }

    pub fn with_bg(self, bg: Option<u8>) -> Attr {
        match bg {
            Some(c) => Attr(self.0 & !BG_MASK | u32::from(c & 0xF) << BG_SHIFT | BG_NOT_DEFAULT),
            None => Attr(self.0 & !BG_MASK),
        }
    }

    /// Flips the bright bit of both palette fields. Default colors are left
    /// alone: there is no bright variant of "whatever the terminal shows".
    pub fn invert_brightness(self) -> Attr {
        let mut bits = self.0;
        if bits & FG_NOT_DEFAULT != 0 {
            bits ^= BRIGHT << FG_SHIFT;
        }
        if bits & BG_NOT_DEFAULT != 0 {
            bits ^= BRIGHT << BG_SHIFT;
        }
        Attr(bits)
    }

    pub fn toggle(self, style: Style) -> Attr {
        Attr(self.0 ^ style.bits())
    }
}

impl std::ops::BitOr<Style> for Attr {
    type Output = Attr;

    fn bitor(self, rhs: Style) -> Attr {
        Attr(self.0 | rhs.bits())
    }
}

/// Maps a logical palette index to the terminal's own numbering: identity
/// for ANSI-color terminals, the legacy permutation (red and blue, yellow
/// and cyan swapped) otherwise. Brightness is not the terminal's business
/// here, so only the low three bits travel.
pub fn palette_index(color: u8, ansi_color_ok: bool) -> u8 {
    if ansi_color_ok {
        return color & 7;
    }
    [0, 4, 2, 6, 1, 5, 3, 7][usize::from(color & 7)]
}
