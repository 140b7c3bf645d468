//! Differential display updates for the text window.
//!
//! This crate turns logical buffer changes into terminal output through
//! [`core_terminal::Screen`]: a line renderer that expands tabs and clips
//! to the visible column window, the incremental update layer with its
//! TURBO throttle and dirty-region bookkeeping, the syntax state
//! propagator, the status line, and the bracket-match highlight.

pub mod dirty;
pub mod engine;
pub mod line;
pub mod status;

pub use dirty::DirtyRange;
pub use engine::RenderEngine;
pub use line::output_line_slice;
pub use status::StatusBar;
