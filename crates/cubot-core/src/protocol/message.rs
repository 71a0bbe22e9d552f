//! Inbound line classification.
//!
//! The controller talks in loosely formatted text lines. A line is matched
//! against the known keywords in a fixed priority order, and an optional
//! parenthesised payload is split off the end.

use std::fmt;

use super::constants::{
    MSG_CONNECTED, MSG_CURRENT_SETTINGS, MSG_NEW_SETTINGS, MSG_PROGRESS, MSG_SOLVED, MSG_START,
    MSG_STOP, PROGRAM_CLOSE, PROGRAM_OPEN,
};

/// One decoded line from the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// The controller announced its link.
    Connected,
    /// The controller repeated a received program, frame included.
    Echo(String),
    /// The run was stopped, with the robot time in seconds when reported.
    Stop { elapsed: Option<f64> },
    Start,
    /// Position of the instruction being executed.
    Progress(usize),
    Solved { elapsed: Option<f64> },
    /// Servo settings report; holds the parenthesised payload.
    SettingsReport(String),
    SettingsAccepted,
    Unknown(String),
}

impl InboundMessage {
    /// Classify one line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (head, payload) = split_payload(line);

        let message = if head.contains(MSG_CONNECTED) {
            InboundMessage::Connected
        } else if line.contains(PROGRAM_OPEN) && line.contains(PROGRAM_CLOSE) {
            InboundMessage::Echo(line.to_string())
        } else if head.contains(MSG_STOP) {
            InboundMessage::Stop {
                elapsed: payload.and_then(parse_elapsed),
            }
        } else if head.contains(MSG_START) {
            InboundMessage::Start
        } else if let Some(rest) = head.find(MSG_PROGRESS).map(|i| &head[i + MSG_PROGRESS.len()..])
        {
            match rest.trim().parse() {
                Ok(index) => InboundMessage::Progress(index),
                Err(_) => InboundMessage::Unknown(line.to_string()),
            }
        } else if head.contains(MSG_SOLVED) {
            InboundMessage::Solved {
                elapsed: payload.and_then(parse_elapsed),
            }
        } else if head.contains(MSG_CURRENT_SETTINGS) {
            InboundMessage::SettingsReport(payload.unwrap_or_default().to_string())
        } else if head.contains(MSG_NEW_SETTINGS) {
            InboundMessage::SettingsAccepted
        } else {
            InboundMessage::Unknown(line.to_string())
        };

        Some(message)
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Connected => "connected",
            InboundMessage::Echo(_) => "echo",
            InboundMessage::Stop { .. } => "stop",
            InboundMessage::Start => "start",
            InboundMessage::Progress(_) => "progress",
            InboundMessage::Solved { .. } => "solved",
            InboundMessage::SettingsReport(_) => "settings_report",
            InboundMessage::SettingsAccepted => "settings_accepted",
            InboundMessage::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InboundMessage::Echo(text) | InboundMessage::Unknown(text) => {
                write!(f, "{}({text})", self.kind())
            }
            InboundMessage::Progress(index) => write!(f, "progress({index})"),
            InboundMessage::Stop { elapsed: Some(s) } | InboundMessage::Solved { elapsed: Some(s) } => {
                write!(f, "{}({s})", self.kind())
            }
            InboundMessage::SettingsReport(payload) => write!(f, "settings_report({payload})"),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// Split `keyword(payload)` into the keyword part and the text between the
/// first `(` and the following `)`.
fn split_payload(line: &str) -> (&str, Option<&str>) {
    match line.find('(') {
        Some(open) => {
            let rest = &line[open + 1..];
            let payload = rest.find(')').map(|close| &rest[..close]);
            (&line[..open], payload)
        }
        None => (line, None),
    }
}

fn parse_elapsed(payload: &str) -> Option<f64> {
    payload.trim().parse().ok()
}
