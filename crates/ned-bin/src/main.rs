//! ned entrypoint: a file viewer over the differential display engine.
//!
//! Input handling is deliberately thin (scroll, resize, quit); the point
//! of the binary is wiring the engine end to end: capability selection,
//! raw mode with guaranteed restoration, incremental scrolling, full
//! refresh on resize.

use std::io::Stdout;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use core_render::RenderEngine;
use core_syntax::{CLike, HighlightState};
use core_terminal::{window_size, Capabilities, RawModeGuard, Screen};
use core_text::Buffer;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ned", version, about = "Differential-display file viewer")]
struct Args {
    /// File to display. A small banner is shown when omitted.
    pub path: Option<PathBuf>,
    /// Use the hardwired ANSI profile instead of the terminfo database.
    #[arg(long)]
    pub ansi: bool,
    /// Update throttle: cell-level updates stop after this many line
    /// updates per refresh. Zero means twice the screen height.
    #[arg(long, default_value_t = 0)]
    pub turbo: usize,
    /// Disable syntax highlighting.
    #[arg(long)]
    pub no_syntax: bool,
}

/// Logging goes to a file: the tty belongs to the display engine.
fn init_logging() -> Option<WorkerGuard> {
    if std::env::var_os("NED_LOG").is_none() {
        return None;
    }
    let appender = tracing_appender::rolling::never(".", "ned.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("NED_LOG"))
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

fn load_buffer(args: &Args) -> Result<Buffer> {
    let (name, text) = match &args.path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            (path.display().to_string(), text)
        }
        None => (
            "*scratch*".to_string(),
            "ned - differential display demo\n\nOpen a file: ned <path>\n\
             Scroll with the arrow keys or PgUp/PgDn, quit with q.\n"
                .to_string(),
        ),
    };

    let mut b = Buffer::from_text(&name, &text);
    let highlighted = matches!(
        args.path.as_deref().and_then(|p| p.extension()?.to_str()),
        Some("c" | "h" | "rs" | "java" | "js")
    );
    if highlighted && !args.no_syntax {
        b.syntax = Some(Box::new(CLike::default()));
        init_states(&mut b);
    }
    Ok(b)
}

fn init_states(b: &mut Buffer) {
    let mut attrs = Vec::new();
    let mut state = HighlightState::default();
    for i in 0..b.line_count() {
        b.line_mut(i).unwrap().highlight = state.clone();
        state = b.parse_line(i, &mut attrs).unwrap();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging();

    let mut caps = if args.ansi {
        Capabilities::ansi()
    } else {
        Capabilities::from_env()?
    };
    if let Some((lines, columns)) = window_size() {
        caps.lines = lines;
        caps.columns = columns;
    }

    let mut b = load_buffer(&args)?;
    let mut screen = Screen::new(caps, 0, true, std::io::stdout())?;
    let mut engine = RenderEngine::new(args.turbo);

    let mut guard = RawModeGuard::enter()?;
    let outcome = run(&mut screen, &mut engine, &mut b);
    let restored = screen.finalize();
    guard.leave()?;
    outcome.and(restored)
}

fn run(
    screen: &mut Screen<Stdout>,
    engine: &mut RenderEngine,
    b: &mut Buffer,
) -> Result<()> {
    info!(name = %b.name, lines = b.line_count(), "displaying");
    screen.set_terminal_modes()?;
    screen.cursor_on()?;
    screen.set_terminal_window(screen.rows() - 1);
    screen.clear_entire_screen()?;
    engine.reset_window(screen);

    loop {
        engine.refresh_window(screen, b)?;
        engine.status.draw(screen, b)?;
        screen.move_cursor(0, 0)?;
        screen.flush()?;

        match event::read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                let text_rows = screen.rows() - 1;
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Down => {
                        if b.win_y + text_rows < b.line_count() {
                            b.win_y += 1;
                            b.cur_line = b.win_y;
                            engine.scroll_window(screen, b, 0, -1)?;
                            engine.status.reset();
                        } else {
                            screen.ring_bell()?;
                        }
                    }
                    KeyCode::Up => {
                        if b.win_y > 0 {
                            b.win_y -= 1;
                            b.cur_line = b.win_y;
                            engine.scroll_window(screen, b, 0, 1)?;
                            engine.status.reset();
                        } else {
                            screen.ring_bell()?;
                        }
                    }
                    KeyCode::PageDown => {
                        let jump = text_rows.min(
                            b.line_count().saturating_sub(b.win_y + text_rows),
                        );
                        if jump > 0 {
                            b.win_y += jump;
                            b.cur_line = b.win_y;
                            engine.reset_window(screen);
                        }
                    }
                    KeyCode::PageUp => {
                        if b.win_y > 0 {
                            b.win_y = b.win_y.saturating_sub(text_rows);
                            b.cur_line = b.win_y;
                            engine.reset_window(screen);
                        }
                    }
                    _ => {}
                }
            }
            Event::Resize(columns, lines) => {
                info!(lines, columns, "window size changed");
                screen.resize(lines as usize, columns as usize)?;
                engine.reset_window(screen);
            }
            _ => {}
        }
    }
    Ok(())
}
