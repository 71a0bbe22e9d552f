//! Network transport: HTTP control plane, TCP line stream data plane.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, instrument, trace, warn};

use super::traits::{ControllerTransport, TransportError};
use crate::protocol::constants::{
    CONTROL_TIMEOUT_MS, DEFAULT_STREAM_PORT, Endpoint, LINE_END, READ_POLL_MS,
};

struct Stream {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    /// Bytes of a line cut short by a read timeout.
    pending: Vec<u8>,
}

/// Controller reached over the network.
pub struct NetworkTransport {
    address: String,
    stream_port: u16,
    client: Client,
    control_timeout: Duration,
    read_poll: Duration,
    stream: Mutex<Option<Stream>>,
    /// Set once the data plane failed to open or dropped. No reopen is
    /// attempted until `close`.
    stream_down: AtomicBool,
    connected: AtomicBool,
}

impl NetworkTransport {
    pub fn new(address: &str) -> Result<Self, TransportError> {
        Self::with_timeouts(
            address,
            DEFAULT_STREAM_PORT,
            Duration::from_millis(CONTROL_TIMEOUT_MS),
            Duration::from_millis(READ_POLL_MS),
        )
    }

    pub fn with_timeouts(
        address: &str,
        stream_port: u16,
        control_timeout: Duration,
        read_poll: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(control_timeout)
            .build()
            .map_err(|e| TransportError::Unreachable {
                address: address.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            address: address.to_string(),
            stream_port,
            client,
            control_timeout,
            read_poll,
            stream: Mutex::new(None),
            stream_down: AtomicBool::new(false),
            connected: AtomicBool::new(false),
        })
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("http://{}{}", self.address, endpoint.path())
    }

    fn stream_addr(&self) -> Result<SocketAddr, TransportError> {
        let host = self.address.split(':').next().unwrap_or_default();
        (host, self.stream_port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| TransportError::Unreachable {
                address: self.address.clone(),
                message: "address does not resolve".into(),
            })
    }

    #[instrument(level = "debug", skip(self), fields(address = %self.address))]
    fn open_stream(&self) -> Result<Stream, TransportError> {
        let addr = self.stream_addr()?;
        let writer = TcpStream::connect_timeout(&addr, self.control_timeout).map_err(|e| {
            TransportError::Unreachable {
                address: addr.to_string(),
                message: e.to_string(),
            }
        })?;
        writer.set_read_timeout(Some(self.read_poll))?;
        writer.set_nodelay(true)?;
        let reader = BufReader::new(writer.try_clone()?);
        info!(stream = %addr, "Data plane opened");
        Ok(Stream {
            reader,
            writer,
            pending: Vec::new(),
        })
    }

    /// Run `f` on the data plane, opening it first if needed. A failed open
    /// or an I/O failure marks the data plane down; later calls fail with
    /// `Unreachable` until `close` is called.
    fn with_stream<T>(
        &self,
        f: impl FnOnce(&mut Stream) -> Result<T, TransportError>,
    ) -> Result<T, TransportError> {
        let mut guard = self
            .stream
            .lock()
            .map_err(|_| TransportError::ReadFailed("stream lock poisoned".into()))?;
        if guard.is_none() {
            if self.stream_down.load(Ordering::Relaxed) {
                return Err(TransportError::Unreachable {
                    address: self.address.clone(),
                    message: "data plane down".into(),
                });
            }
            match self.open_stream() {
                Ok(stream) => *guard = Some(stream),
                Err(e) => {
                    warn!(error = %e, "Data plane not opened");
                    self.stream_down.store(true, Ordering::Relaxed);
                    return Err(e);
                }
            }
        }
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::Disconnected);
        };

        let result = f(stream);
        if matches!(
            result,
            Err(TransportError::Disconnected | TransportError::Io(_))
        ) {
            warn!("Data plane lost");
            *guard = None;
            self.stream_down.store(true, Ordering::Relaxed);
            self.connected.store(false, Ordering::Relaxed);
        }
        result
    }
}

impl ControllerTransport for NetworkTransport {
    fn request(&self, endpoint: Endpoint, body: Option<&str>) -> Result<String, TransportError> {
        let mut request = self.client.post(self.url(endpoint));
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        let outcome = request
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text());
        match outcome {
            Ok(text) => {
                debug!(endpoint = %endpoint, len = text.len(), "Request ok");
                self.connected.store(true, Ordering::Relaxed);
                Ok(text)
            }
            Err(e) => {
                debug!(endpoint = %endpoint, error = %e, "Request failed");
                if endpoint == Endpoint::CheckConnection {
                    self.connected.store(false, Ordering::Relaxed);
                }
                Err(TransportError::RequestFailed {
                    endpoint,
                    message: e.to_string(),
                })
            }
        }
    }

    fn write_line(&self, line: &str) -> Result<(), TransportError> {
        self.with_stream(|stream| {
            let mut frame = String::with_capacity(line.len() + 1);
            frame.push_str(line);
            frame.push(LINE_END);
            stream
                .writer
                .write_all(frame.as_bytes())
                .and_then(|_| stream.writer.flush())
                .map_err(TransportError::Io)?;
            trace!(line, "Line sent");
            Ok(())
        })
    }

    fn read_line(&self) -> Result<Vec<u8>, TransportError> {
        let timeout_ms = self.read_poll.as_millis() as u64;
        self.with_stream(|stream| {
            match stream.reader.read_until(b'\n', &mut stream.pending) {
                Ok(0) => Err(TransportError::Disconnected),
                Ok(_) if stream.pending.ends_with(b"\n") => {
                    let mut line = std::mem::take(&mut stream.pending);
                    while matches!(line.last(), Some(b'\n' | b'\r')) {
                        line.pop();
                    }
                    Ok(line)
                }
                // EOF in the middle of a line
                Ok(_) => Err(TransportError::Disconnected),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    Err(TransportError::Timeout { timeout_ms })
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {
                    Err(TransportError::Timeout { timeout_ms })
                }
                Err(e) => Err(TransportError::Io(e)),
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn close(&self) {
        if let Ok(mut guard) = self.stream.lock() {
            if guard.take().is_some() {
                debug!("Data plane closed");
            }
        }
        self.stream_down.store(false, Ordering::Relaxed);
        self.connected.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn transport(port: u16) -> NetworkTransport {
        NetworkTransport::with_timeouts(
            "127.0.0.1",
            port,
            Duration::from_millis(200),
            Duration::from_millis(20),
        )
        .unwrap()
    }

    fn free_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_failed_open_is_not_retried() {
        let port = free_port();
        let transport = transport(port);
        assert!(matches!(
            transport.read_line(),
            Err(TransportError::Unreachable { .. })
        ));

        // the listener comes up but the transport stays down
        let _listener = TcpListener::bind(("127.0.0.1", port)).unwrap();
        assert!(matches!(
            transport.read_line(),
            Err(TransportError::Unreachable { .. })
        ));
        assert!(matches!(
            transport.write_line("[stop]"),
            Err(TransportError::Unreachable { .. })
        ));

        transport.close();
        assert!(matches!(
            transport.read_line(),
            Err(TransportError::Timeout { .. })
        ));
    }

    #[test]
    fn test_read_line_strips_line_break() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let transport = transport(port);
        transport.write_line("<R1>").unwrap();

        let (mut peer, _) = listener.accept().unwrap();
        peer.write_all(b"i_0\r\n").unwrap();
        let mut received = Vec::new();
        BufReader::new(peer.try_clone().unwrap())
            .read_until(b'\n', &mut received)
            .unwrap();
        assert_eq!(received, b"<R1>\n");

        let line = loop {
            match transport.read_line() {
                Err(TransportError::Timeout { .. }) => continue,
                other => break other.unwrap(),
            }
        };
        assert_eq!(line, b"i_0");

        drop(peer);
        let end = loop {
            match transport.read_line() {
                Err(TransportError::Timeout { .. }) => continue,
                other => break other,
            }
        };
        assert!(matches!(end, Err(TransportError::Disconnected)));
        assert!(matches!(
            transport.read_line(),
            Err(TransportError::Unreachable { .. })
        ));
    }
}
