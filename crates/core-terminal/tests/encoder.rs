use core_terminal::{Attr, Capabilities, Screen};

fn screen_utf8(utf8: bool) -> Screen<Vec<u8>> {
    let mut scr = Screen::new(Capabilities::ansi(), 0, utf8, Vec::new()).unwrap();
    scr.clear_entire_screen().unwrap();
    scr.writer_mut().clear();
    scr
}

#[test]
fn control_chars_become_inverse_letters() {
    let mut scr = screen_utf8(true);
    scr.output_char(0x01, Some(Attr::default()), true).unwrap();
    // ^A prints as inverse 'A'.
    assert_eq!(scr.writer_mut().as_slice(), b"\x1b[7mA");
    scr.writer_mut().clear();
    // Same attribute plus the implied INVERSE: no transition needed.
    scr.output_char(0x02, Some(Attr::default()), true).unwrap();
    assert_eq!(scr.writer_mut().as_slice(), b"B");
}

#[test]
fn del_range_becomes_question_mark() {
    let mut scr = screen_utf8(true);
    scr.output_char(0x7F, Some(Attr::default()), true).unwrap();
    assert_eq!(scr.writer_mut().as_slice(), b"\x1b[7m?");
}

#[test]
fn nbsp_becomes_inverse_space() {
    let mut scr = screen_utf8(true);
    scr.output_char(0xA0, Some(Attr::default()), true).unwrap();
    assert_eq!(scr.writer_mut().as_slice(), b"\x1b[7m ");
}

#[test]
fn wide_code_points_are_encoded_when_utf8() {
    let mut scr = screen_utf8(true);
    scr.output_char(u32::from('é'), None, true).unwrap();
    assert_eq!(scr.writer_mut().as_slice(), "é".as_bytes());
    scr.writer_mut().clear();
    scr.output_char(0x20AC, None, true).unwrap();
    assert_eq!(scr.writer_mut().as_slice(), "€".as_bytes());
}

#[test]
fn high_code_points_degrade_without_utf8() {
    let mut scr = screen_utf8(false);
    scr.output_char(0x20AC, Some(Attr::default()), true).unwrap();
    assert_eq!(scr.writer_mut().as_slice(), b"\x1b[7m?");
}

#[test]
fn zero_width_code_points_are_substituted() {
    let mut scr = screen_utf8(true);
    // A combining acute accent has zero display width.
    scr.output_char(0x0301, Some(Attr::default()), true).unwrap();
    assert_eq!(scr.writer_mut().as_slice(), b"\x1b[7m?");
}

#[test]
fn output_truncates_at_the_right_margin() {
    let mut scr = screen_utf8(true);
    scr.move_cursor(24, 70).unwrap();
    scr.writer_mut().clear();
    // Bottom row with autowrap: the last cell is off limits.
    scr.output_chars(Some(b"abcdefghijkl"), None, 12, false).unwrap();
    assert_eq!(scr.writer_mut().as_slice(), b"abcdefghi");
    assert_eq!(scr.cursor(), Some((24, 79)));
}

#[test]
fn spaces_only_consult_the_first_attribute() {
    let mut scr = screen_utf8(true);
    scr.move_cursor(0, 0).unwrap();
    scr.writer_mut().clear();
    let attr = Attr::default().with_fg(Some(2));
    scr.output_spaces(3, Some(&attr)).unwrap();
    // The attribute transition is emitted once; repeats are no-ops.
    assert_eq!(scr.writer_mut().as_slice(), b"\x1b[32m   ");
}
