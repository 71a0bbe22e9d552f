//! Outbound framing.

use super::constants::{CONTROL_CLOSE, CONTROL_OPEN, ControlCommand, PROGRAM_CLOSE, PROGRAM_OPEN};

/// Wrap a program in `<` `>`, adding only the delimiters that are missing.
pub fn frame_program(program: &str) -> String {
    let body = program.trim();
    let mut framed = String::with_capacity(body.len() + 2);
    if !body.starts_with(PROGRAM_OPEN) {
        framed.push(PROGRAM_OPEN);
    }
    framed.push_str(body);
    if !body.ends_with(PROGRAM_CLOSE) {
        framed.push(PROGRAM_CLOSE);
    }
    framed
}

/// The program inside a `<…>` frame, if the text is one.
pub fn unframe_program(framed: &str) -> Option<&str> {
    framed
        .trim()
        .strip_prefix(PROGRAM_OPEN)?
        .strip_suffix(PROGRAM_CLOSE)
}

pub fn frame_control(command: ControlCommand) -> String {
    format!("{CONTROL_OPEN}{}{CONTROL_CLOSE}", command.keyword())
}
