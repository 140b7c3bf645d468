//! Terminal control for the display engine.
//!
//! One typed capability table (terminfo database or hardwired ANSI),
//! a minimum-cost cursor motion planner, an SGR attribute engine that
//! emits only transitions, and the character encoder that turns code
//! points into terminal bytes. Everything the higher layers know about
//! the terminal, they know through [`Screen`].

pub mod attr;
pub mod caps;
pub mod cost;
pub mod motion;
pub mod param;
pub mod screen;
pub mod session;
pub mod utf8;

pub use attr::{palette_index, Attr, NoColorVideo, Style};
pub use caps::{Capabilities, TermSetupError};
pub use cost::Cost;
pub use motion::MotionCosts;
pub use screen::{output_width, Screen};
pub use session::{window_size, RawModeGuard};
