//! Event system for UI decoupling.
//!
//! Lets the CLI and TUI follow a robot run without reaching into the
//! session worker.

use std::fmt;

use crate::cube::CubeState;
use crate::record::SolveRecord;
use crate::settings::RobotSettings;
use crate::state::SessionState;

/// Log level for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Events emitted by the robot session.
#[derive(Debug, Clone)]
pub enum CubotEvent {
    /// Session state changed.
    StateChanged { from: SessionState, to: SessionState },
    /// Controller answered the liveness probe.
    Connected { address: String },
    Disconnected,
    /// The robot reported the instruction at `index`.
    Progress {
        index: usize,
        percent: u8,
        remaining: i64,
        total: u32,
    },
    /// The followed cube changed.
    CubeUpdated { state: CubeState },
    /// Log message.
    Log { level: LogLevel, message: String },
    /// Line sent to or received from the controller.
    Line {
        direction: LineDirection,
        text: String,
    },
    /// A stop was sent; the run ends when the controller confirms.
    StopRequested,
    /// A run ended.
    SolveFinished { record: SolveRecord },
    /// Servo settings reported or fetched from the controller.
    SettingsReceived { settings: RobotSettings },
    /// Controllers answering on the scanned subnet.
    ControllersDiscovered { addresses: Vec<String> },
}

/// Data plane direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDirection {
    Tx, // Host -> Controller
    Rx, // Controller -> Host
}

impl fmt::Display for LineDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineDirection::Tx => write!(f, "TX"),
            LineDirection::Rx => write!(f, "RX"),
        }
    }
}

/// Observer trait for receiving session events.
///
/// Implement this trait in your UI layer to receive updates.
pub trait CubotObserver: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &CubotEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl CubotObserver for NullObserver {
    fn on_event(&self, _event: &CubotEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl CubotObserver for TracingObserver {
    fn on_event(&self, event: &CubotEvent) {
        match event {
            CubotEvent::StateChanged { from, to } => {
                tracing::info!(from = %from, to = %to, "State changed");
            }
            CubotEvent::Connected { address } => {
                tracing::info!(address = %address, "Controller connected");
            }
            CubotEvent::Disconnected => {
                tracing::warn!("Controller disconnected");
            }
            CubotEvent::Progress {
                index,
                percent,
                remaining,
                total,
            } => {
                tracing::info!(
                    index,
                    remaining,
                    total,
                    progress = %format!("{}%", percent),
                    "Progress"
                );
            }
            CubotEvent::CubeUpdated { state } => {
                tracing::debug!(cube = %state, "Cube updated");
            }
            CubotEvent::Log { level, message } => match level {
                LogLevel::Trace => tracing::trace!("{}", message),
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
            CubotEvent::Line { direction, text } => {
                tracing::trace!(dir = %direction, line = %text, "Line");
            }
            CubotEvent::StopRequested => {
                tracing::info!("Stop requested");
            }
            CubotEvent::SolveFinished { record } => {
                tracing::info!(
                    reason = %record.end_reason,
                    moves = record.total_moves,
                    elapsed = ?record.elapsed_secs,
                    "Run finished"
                );
            }
            CubotEvent::SettingsReceived { settings } => {
                tracing::info!(settings = %settings.to_wire(), "Servo settings received");
            }
            CubotEvent::ControllersDiscovered { addresses } => {
                tracing::info!(count = addresses.len(), "Controllers discovered");
            }
        }
    }
}
