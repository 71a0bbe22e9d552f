//! Cubot-Core: cube state and controller session engine for a cube
//! solving robot.
//!
//! The robot flips, spins and rotates a cube held in a cradle while a
//! controller on the local network streams back which instruction it is
//! executing. This crate follows the cube through those moves and keeps
//! the host side of the conversation.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Cube**: Facelet state, robot move permutations, followed cube store
//! - **Program**: Robot instruction text, progress ledger, solve pipeline
//! - **Protocol**: Framing, endpoints, inbound message classification
//! - **Transport**: Controller abstraction (network, mock)
//! - **State**: Session state machine and inbound line handlers
//! - **Events**: Observer pattern for UI decoupling
//! - **Session**: High-level orchestrator and worker thread
//! - **Settings / Record**: Servo settings persistence and run log
//!
//! # Example
//!
//! ```no_run
//! use cubot_core::program::SolvePlan;
//! use cubot_core::cube::CubeState;
//! use cubot_core::session::{RobotSession, SessionConfig};
//! use std::time::Duration;
//!
//! let config = SessionConfig {
//!     address: Some("192.168.1.50".to_string()),
//!     ..Default::default()
//! };
//! let transport = config.network_transport()?;
//! let mut session = RobotSession::new(config, transport);
//!
//! if session.connect() {
//!     let plan = SolvePlan::from_instructions(CubeState::solved(), "F1R1S3", true)?;
//!     session.load_plan(plan)?;
//!     session.send_program()?;
//!     session.listen_until_finished(Duration::from_secs(120))?;
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cube;
pub mod discovery;
pub mod events;
pub mod program;
pub mod protocol;
pub mod record;
pub mod scanner;
pub mod session;
pub mod settings;
pub mod state;
pub mod transport;

// Re-exports for convenience
pub use cube::{CubeState, CubeStore, Face, PrimitiveMove};
pub use events::{CubotEvent, CubotObserver, LogLevel, NullObserver, TracingObserver};
pub use program::{ProgressLedger, RobotInstructions, SolvePlan};
pub use protocol::{Endpoint, InboundMessage};
pub use record::{SolveLog, SolveRecord};
pub use session::{RobotSession, SessionCommand, SessionConfig, SessionHandle};
pub use settings::{CamSettings, RobotSettings};
pub use state::SessionState;
pub use transport::{ControllerTransport, MockTransport, NetworkTransport, TransportError};
