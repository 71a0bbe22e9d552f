//! Mock controller transport for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use super::traits::{ControllerTransport, TransportError};
use crate::protocol::Endpoint;

/// Mock transport for unit testing session logic.
///
/// Clones share the same queues, so a test can keep a handle while the
/// session owns another.
#[derive(Clone)]
pub struct MockTransport {
    /// Queued inbound lines to return on read.
    line_queue: Arc<Mutex<VecDeque<Vec<u8>>>>,
    /// Captured data plane writes.
    write_log: Arc<Mutex<Vec<String>>>,
    /// Captured control plane requests.
    request_log: Arc<Mutex<Vec<(Endpoint, Option<String>)>>>,
    /// Canned control plane responses.
    responses: Arc<Mutex<HashMap<Endpoint, String>>>,
    /// Whether the controller is "connected".
    connected: Arc<Mutex<bool>>,
    /// Data plane down while the control plane still answers.
    stream_down: Arc<Mutex<bool>>,
    address: String,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::with_address("192.168.1.50")
    }

    pub fn with_address(address: &str) -> Self {
        Self {
            line_queue: Arc::new(Mutex::new(VecDeque::new())),
            write_log: Arc::new(Mutex::new(Vec::new())),
            request_log: Arc::new(Mutex::new(Vec::new())),
            responses: Arc::new(Mutex::new(HashMap::new())),
            connected: Arc::new(Mutex::new(true)),
            stream_down: Arc::new(Mutex::new(false)),
            address: address.to_string(),
        }
    }

    /// Queue a text line to be returned on next read.
    pub fn queue_line(&self, line: &str) {
        self.queue_bytes(line.as_bytes());
    }

    /// Queue raw bytes, e.g. an undecodable payload.
    pub fn queue_bytes(&self, bytes: &[u8]) {
        self.line_queue.lock().unwrap().push_back(bytes.to_vec());
    }

    /// Answer `endpoint` requests with `body`.
    pub fn set_response(&self, endpoint: Endpoint, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(endpoint, body.to_string());
    }

    /// Get all captured data plane lines.
    pub fn get_writes(&self) -> Vec<String> {
        self.write_log.lock().unwrap().clone()
    }

    /// Clear captured writes.
    pub fn clear_writes(&self) {
        self.write_log.lock().unwrap().clear();
    }

    /// Get all captured control plane requests.
    pub fn get_requests(&self) -> Vec<(Endpoint, Option<String>)> {
        self.request_log.lock().unwrap().clone()
    }

    /// Endpoints requested so far, in order.
    pub fn requested_endpoints(&self) -> Vec<Endpoint> {
        self.get_requests().into_iter().map(|(e, _)| e).collect()
    }

    /// Simulate controller disconnect.
    pub fn disconnect(&self) {
        *self.connected.lock().unwrap() = false;
    }

    /// Simulate controller reconnect.
    pub fn reconnect(&self) {
        *self.connected.lock().unwrap() = true;
    }

    /// Simulate a lost data plane; `close` brings it back.
    pub fn drop_stream(&self) {
        *self.stream_down.lock().unwrap() = true;
    }

    fn stream_error(&self) -> Option<TransportError> {
        if !self.is_connected() {
            Some(TransportError::Disconnected)
        } else if *self.stream_down.lock().unwrap() {
            Some(TransportError::Unreachable {
                address: self.address.clone(),
                message: "mock data plane down".into(),
            })
        } else {
            None
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerTransport for MockTransport {
    fn request(&self, endpoint: Endpoint, body: Option<&str>) -> Result<String, TransportError> {
        self.request_log
            .lock()
            .unwrap()
            .push((endpoint, body.map(str::to_string)));
        if !self.is_connected() {
            return Err(TransportError::Unreachable {
                address: self.address.clone(),
                message: "mock controller offline".into(),
            });
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&endpoint)
            .cloned()
            .unwrap_or_default())
    }

    fn write_line(&self, line: &str) -> Result<(), TransportError> {
        if let Some(e) = self.stream_error() {
            return Err(e);
        }
        self.write_log.lock().unwrap().push(line.to_string());
        Ok(())
    }

    fn read_line(&self) -> Result<Vec<u8>, TransportError> {
        if let Some(e) = self.stream_error() {
            return Err(e);
        }
        self.line_queue
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(TransportError::Timeout { timeout_ms: 0 })
    }

    fn is_connected(&self) -> bool {
        *self.connected.lock().unwrap()
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn close(&self) {
        *self.stream_down.lock().unwrap() = false;
    }
}
