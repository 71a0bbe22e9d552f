//! Controller transport abstraction.
//!
//! The controller has two channels: a request/response control plane
//! (liveness, settings, servo tests) and a line oriented data plane that
//! carries programs, control commands and progress reports.

use thiserror::Error;

use crate::protocol::Endpoint;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Controller not reachable at {address}: {message}")]
    Unreachable { address: String, message: String },

    #[error("Request {endpoint} failed: {message}")]
    RequestFailed { endpoint: Endpoint, message: String },

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Controller disconnected")]
    Disconnected,

    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Abstract controller link.
///
/// This trait enables:
/// - Production implementation over HTTP and TCP
/// - Mock implementation for unit testing
pub trait ControllerTransport: Send + Sync {
    /// Control plane request, with an optional JSON body. Returns the
    /// response body.
    fn request(&self, endpoint: Endpoint, body: Option<&str>) -> Result<String, TransportError>;

    /// Send one data plane line; the line break is added here.
    fn write_line(&self, line: &str) -> Result<(), TransportError>;

    /// Next raw data plane line, without its line break.
    ///
    /// `Timeout` means nothing arrived within the poll interval.
    fn read_line(&self) -> Result<Vec<u8>, TransportError>;

    /// Check if the controller link is up.
    fn is_connected(&self) -> bool;

    /// Controller address.
    fn address(&self) -> &str;

    /// Liveness probe.
    fn probe(&self) -> bool {
        self.request(Endpoint::CheckConnection, None).is_ok()
    }

    /// Drop the data plane.
    fn close(&self) {}
}
