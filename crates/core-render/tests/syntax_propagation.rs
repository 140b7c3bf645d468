mod common;

use common::{screen, take, Grid};
use core_render::RenderEngine;
use core_syntax::{CLike, HighlightState};
use core_terminal::{Capabilities, Screen};
use core_text::Buffer;

fn setup(lines: &[&str]) -> (Screen<Vec<u8>>, RenderEngine, Buffer, Grid) {
    let mut scr = screen(Capabilities::ansi());
    let mut eng = RenderEngine::new(0);
    let mut b = Buffer::from_text("demo", &lines.join("\n"));
    b.syntax = Some(Box::new(CLike::default()));
    init_states(&mut b);
    let mut grid = Grid::new(25, 80);
    eng.update_window(&mut scr, &mut b).unwrap();
    eng.refresh_window(&mut scr, &mut b).unwrap();
    grid.feed(&take(&mut scr));
    (scr, eng, b, grid)
}

/// Establishes a consistent highlight-state chain, the way a full load
/// pass would.
fn init_states(b: &mut Buffer) {
    let mut attrs = Vec::new();
    let mut state = HighlightState::default();
    for i in 0..b.line_count() {
        b.line_mut(i).unwrap().highlight = state.clone();
        state = b.parse_line(i, &mut attrs).unwrap();
    }
}

#[test]
fn attribute_cache_agrees_with_a_fresh_parse() {
    let (mut scr, mut eng, mut b, _) = setup(&["int a;", "x /* y */ z", "tail"]);
    b.cur_line = 1;
    eng.update_line(&mut scr, &mut b, 1, false, false).unwrap();

    let cache = b.attr_cache.clone().expect("cache valid after update_line");
    let recorded_next = b.next_state.clone();
    let mut fresh = Vec::new();
    let next = b.parse_line(1, &mut fresh).unwrap();
    assert_eq!(cache, fresh);
    assert_eq!(recorded_next, next);
}

#[test]
fn propagation_stops_at_the_first_agreeing_line() {
    let lines = ["int a;", "x   y", "one", "two */ z", "tail1", "tail2"];
    let (mut scr, mut eng, mut b, mut grid) = setup(&lines);

    // Open a block comment on line 1: "x   y" becomes "x/* y".
    b.cur_line = 1;
    b.replace_at(1, 1, u32::from('/'));
    b.replace_at(1, 2, u32::from('*'));
    eng.update_line(&mut scr, &mut b, 1, false, false).unwrap();
    let base = eng.updated_lines();

    eng.need_attr_update = true;
    eng.update_syntax_states(&mut scr, &mut b, Some(1), 1, None)
        .unwrap();
    grid.feed(&take(&mut scr));

    // Lines 2 and 3 flipped state (the comment now swallows them up to the
    // closer on line 3); line 4's stored state already agrees, so exactly
    // two lines were re-rendered.
    assert_eq!(eng.updated_lines() - base, 2);
    assert_eq!(b.line(2).unwrap().highlight, HighlightState::new(1));
    assert_eq!(b.line(3).unwrap().highlight, HighlightState::new(1));
    assert_eq!(b.line(4).unwrap().highlight, HighlightState::new(0));
    assert!(!eng.need_attr_update);

    // Propagation used the shared parse buffer on other lines: the
    // current line's cache is gone.
    assert!(b.attr_cache.is_none());

    // The text itself never changed, only its attributes.
    for (i, l) in lines.iter().enumerate() {
        let want = if i == 1 { "x/* y" } else { *l };
        assert_eq!(grid.row_text(i), want);
    }
}

#[test]
fn closing_a_comment_reverts_downstream_lines() {
    let lines = ["/* open", "a", "b", "c"];
    let (mut scr, mut eng, mut b, _) = setup(&lines);
    assert_eq!(b.line(3).unwrap().highlight, HighlightState::new(1));

    // Close the comment at the start: "/* open" -> "*/ open".
    b.cur_line = 0;
    b.replace_at(0, 0, u32::from('*'));
    b.replace_at(0, 1, u32::from('/'));
    eng.update_line(&mut scr, &mut b, 0, false, false).unwrap();

    eng.need_attr_update = true;
    eng.update_syntax_states(&mut scr, &mut b, Some(0), 0, None)
        .unwrap();

    for i in 1..4 {
        assert_eq!(b.line(i).unwrap().highlight, HighlightState::new(0));
    }
}

#[test]
fn propagation_without_syntax_or_flag_is_inert() {
    let (mut scr, mut eng, mut b, _) = setup(&["a", "b"]);
    // Flag not set: nothing happens, bytes stay empty.
    eng.update_syntax_states(&mut scr, &mut b, Some(0), 0, None)
        .unwrap();
    assert!(take(&mut scr).is_empty());
    assert!(!eng.need_attr_update);
}

#[test]
fn deferred_propagation_extends_the_dirty_range() {
    let lines: Vec<String> = std::iter::once("/* open".to_string())
        .chain((0..12).map(|i| format!("l{i}")))
        .collect();
    let line_refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let (mut scr, _eng, mut b, _) = setup(&line_refs);

    // A tiny TURBO forces deferral mid-propagation.
    let mut eng2 = RenderEngine::new(3);
    b.cur_line = 0;
    b.replace_at(0, 0, u32::from('*'));
    b.replace_at(0, 1, u32::from('/'));
    eng2.update_line(&mut scr, &mut b, 0, false, false).unwrap();
    take(&mut scr);

    eng2.need_attr_update = true;
    eng2.update_syntax_states(&mut scr, &mut b, Some(0), 0, None)
        .unwrap();
    assert!(eng2.window_needs_refresh());
    let (first, last) = eng2.dirty_range().unwrap();
    assert!(first >= 1);
    assert!(last > first);
    // States advanced all the way even though drawing deferred.
    assert_eq!(b.line(12).unwrap().highlight, HighlightState::new(0));
}

#[test]
fn block_operation_fixup_defers_and_propagates() {
    let (mut scr, mut eng, mut b, _) = setup(&["/* a", "b", "c"]);
    assert_eq!(b.line(2).unwrap().highlight, HighlightState::new(1));

    b.cur_line = 0;
    b.replace_at(0, 0, u32::from('*'));
    b.replace_at(0, 1, u32::from('/'));
    eng.update_syntax_and_lines(&mut scr, &mut b, 0, None).unwrap();

    // Everything is deferred; the states nevertheless reached a fixed
    // point and the cache is gone.
    assert!(eng.window_needs_refresh());
    assert!(take(&mut scr).is_empty());
    assert_eq!(b.line(1).unwrap().highlight, HighlightState::new(0));
    assert_eq!(b.line(2).unwrap().highlight, HighlightState::new(0));
    assert!(b.attr_cache.is_none());
    assert!(!eng.need_attr_update);

    eng.refresh_window(&mut scr, &mut b).unwrap();
    assert!(!eng.window_needs_refresh());
}
