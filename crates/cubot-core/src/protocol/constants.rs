//! Wire constants for the controller link.

use std::fmt;
use std::str::FromStr;

// ============================================================================
// Framing
// ============================================================================

/// Opens a robot program.
pub const PROGRAM_OPEN: char = '<';
/// Closes a robot program.
pub const PROGRAM_CLOSE: char = '>';
/// Opens a control command.
pub const CONTROL_OPEN: char = '[';
/// Closes a control command.
pub const CONTROL_CLOSE: char = ']';
/// Every outbound frame ends with a line break.
pub const LINE_END: char = '\n';

// ============================================================================
// Inbound keywords (Controller -> Host)
// ============================================================================

pub const MSG_CONNECTED: &str = "conn";
pub const MSG_STOP: &str = "stop";
pub const MSG_START: &str = "start";
pub const MSG_PROGRESS: &str = "i_";
pub const MSG_SOLVED: &str = "solved";
pub const MSG_CURRENT_SETTINGS: &str = "current_settings";
pub const MSG_NEW_SETTINGS: &str = "new_settings";

// ============================================================================
// Timing
// ============================================================================

/// Control plane request timeout (ms).
pub const CONTROL_TIMEOUT_MS: u64 = 1000;
/// Discovery liveness probe timeout (ms).
pub const PROBE_TIMEOUT_MS: u64 = 100;
/// Data plane read poll (ms).
pub const READ_POLL_MS: u64 = 200;
/// Parallel discovery workers.
pub const DISCOVERY_WORKERS: usize = 4;
/// Data plane line stream port.
pub const DEFAULT_STREAM_PORT: u16 = 8888;

// ============================================================================
// Control plane endpoints
// ============================================================================

/// Request/response operations exposed by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CheckConnection,
    /// Carries the robot settings JSON.
    Init,
    Disconnect,
    /// Answers with the robot settings JSON.
    GetSettings,
    UpdateSettings,
    FlipTopCover,
    CloseTopCover,
    OpenTopCover,
    RotateCounterClockwise,
    HomeCubeHolder,
    RotateClockwise,
}

impl Endpoint {
    /// Servo test actions.
    pub const SERVO_TESTS: [Endpoint; 6] = [
        Endpoint::FlipTopCover,
        Endpoint::CloseTopCover,
        Endpoint::OpenTopCover,
        Endpoint::RotateCounterClockwise,
        Endpoint::HomeCubeHolder,
        Endpoint::RotateClockwise,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Endpoint::CheckConnection => "checkConnection",
            Endpoint::Init => "init",
            Endpoint::Disconnect => "disconnect",
            Endpoint::GetSettings => "getSettings",
            Endpoint::UpdateSettings => "updateSettings",
            Endpoint::FlipTopCover => "flipTopCover",
            Endpoint::CloseTopCover => "closeTopCover",
            Endpoint::OpenTopCover => "openTopCover",
            Endpoint::RotateCounterClockwise => "rotateCounterClockwise",
            Endpoint::HomeCubeHolder => "homeCubeHolder",
            Endpoint::RotateClockwise => "rotateClockwise",
        }
    }

    /// URL path on the controller.
    pub fn path(self) -> String {
        format!("/{}", self.name())
    }

    pub fn is_servo_test(self) -> bool {
        Self::SERVO_TESTS.contains(&self)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim_start_matches('/');
        [
            Endpoint::CheckConnection,
            Endpoint::Init,
            Endpoint::Disconnect,
            Endpoint::GetSettings,
            Endpoint::UpdateSettings,
        ]
        .into_iter()
        .chain(Self::SERVO_TESTS)
        .find(|e| e.name().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| format!("unknown controller endpoint '{s}'"))
    }
}

// ============================================================================
// Control commands (Host -> Controller, data plane)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Stop,
    /// Ask the controller to report its servo settings.
    Settings,
}

impl ControlCommand {
    pub fn keyword(self) -> &'static str {
        match self {
            ControlCommand::Start => "start",
            ControlCommand::Stop => "stop",
            ControlCommand::Settings => "settings",
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CONTROL_OPEN}{}{CONTROL_CLOSE}", self.keyword())
    }
}
