//! Session state machine.

use std::fmt;

use crate::cube::CubeStore;
use crate::program::{ProgressLedger, SolvePlan};
use crate::settings::RobotSettings;

/// Lifecycle of the controller link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    /// Link up, no program running.
    ConnectedIdle,
    /// Program sent, waiting for the controller to echo it.
    AwaitingStartAck,
    /// Robot executing the program.
    Working,
    /// Inbound stream stopped on an undecodable payload; disconnect to leave.
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "DISCONNECTED"),
            SessionState::ConnectedIdle => write!(f, "CONNECTED_IDLE"),
            SessionState::AwaitingStartAck => write!(f, "AWAITING_START_ACK"),
            SessionState::Working => write!(f, "WORKING"),
            SessionState::Error => write!(f, "ERROR"),
        }
    }
}

impl SessionState {
    /// Check if the link is up (any state but Disconnected).
    pub fn is_connected(&self) -> bool {
        !matches!(self, SessionState::Disconnected)
    }

    /// Check if a program is on its way or running.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SessionState::AwaitingStartAck | SessionState::Working
        )
    }

    /// Check if inbound lines should still be read.
    pub fn is_listening(&self) -> bool {
        !matches!(self, SessionState::Disconnected | SessionState::Error)
    }
}

/// State machine context holding all runtime state.
#[derive(Debug, Default)]
pub struct SessionContext {
    /// Current session state.
    pub state: SessionState,
    /// Cube followed through the robot's moves.
    pub store: CubeStore,
    /// Built when the controller acknowledges a program.
    pub ledger: Option<ProgressLedger>,
    /// Program loaded for sending.
    pub plan: Option<SolvePlan>,
    /// Exact frame sent, compared against the echo.
    pub sent_frame: Option<String>,
    /// Last known servo settings.
    pub settings: RobotSettings,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transition to a new state.
    pub fn goto_state(&mut self, new_state: SessionState) {
        tracing::info!(from = %self.state, to = %new_state, "State transition");
        self.state = new_state;
    }

    /// Forget the running program, keeping the cube as displayed.
    pub fn clear_run(&mut self) {
        self.plan = None;
        self.ledger = None;
        self.sent_frame = None;
    }
}
