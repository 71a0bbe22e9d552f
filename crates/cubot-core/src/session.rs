//! Robot session - owns the controller link, the followed cube and the
//! running program.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::cube::CubeState;
use crate::events::{CubotEvent, CubotObserver, LineDirection, LogLevel, TracingObserver};
use crate::program::{SolvePlan, SolverLimits};
use crate::protocol::constants::{
    CONTROL_TIMEOUT_MS, DEFAULT_STREAM_PORT, DISCOVERY_WORKERS, PROBE_TIMEOUT_MS, READ_POLL_MS,
};
use crate::protocol::{ControlCommand, Endpoint, frame_control};
use crate::record::{SolveLog, SolveRecord};
use crate::settings::{CamSettings, RobotSettings};
use crate::state::handlers::{HandleResult, HandlerContext, handle_line};
use crate::state::machine::{SessionContext, SessionState};
use crate::transport::{ControllerTransport, NetworkTransport, TransportError};

/// Configuration for a robot session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Controller address (`host` or `host:port` for the control plane).
    pub address: Option<String>,
    /// Data plane TCP port.
    pub stream_port: u16,
    /// Control plane timeout in milliseconds.
    pub control_timeout_ms: u64,
    /// Data plane poll interval in milliseconds.
    pub read_poll_ms: u64,
    /// First three octets of the subnet scanned for controllers.
    pub subnet: String,
    pub discovery_workers: usize,
    pub probe_timeout_ms: u64,
    pub solver: SolverLimits,
    /// Servo settings JSON.
    pub settings_path: PathBuf,
    /// Last servo settings report, timestamped.
    pub settings_report_path: PathBuf,
    /// Webcam settings line.
    pub cam_settings_path: PathBuf,
    /// Run log.
    pub log_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            address: None,
            stream_port: DEFAULT_STREAM_PORT,
            control_timeout_ms: CONTROL_TIMEOUT_MS,
            read_poll_ms: READ_POLL_MS,
            subnet: "192.168.1".to_string(),
            discovery_workers: DISCOVERY_WORKERS,
            probe_timeout_ms: PROBE_TIMEOUT_MS,
            solver: SolverLimits::default(),
            settings_path: PathBuf::from("robot_settings.json"),
            settings_report_path: PathBuf::from("robot_settings_report.txt"),
            cam_settings_path: PathBuf::from("cam_settings.txt"),
            log_path: PathBuf::from("data_log_folder").join("robot_log.txt"),
        }
    }
}

impl SessionConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SessionConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn control_timeout(&self) -> Duration {
        Duration::from_millis(self.control_timeout_ms)
    }

    pub fn read_poll(&self) -> Duration {
        Duration::from_millis(self.read_poll_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Robot settings from disk, defaults when the file is missing or bad.
    pub fn load_robot_settings(&self) -> RobotSettings {
        match RobotSettings::load_from_file(&self.settings_path) {
            Ok(settings) => settings,
            Err(e) => {
                debug!(path = %self.settings_path.display(), error = %e, "Using default robot settings");
                RobotSettings::default()
            }
        }
    }

    /// Webcam settings from disk, defaults when the file is missing or bad.
    pub fn load_cam_settings(&self) -> CamSettings {
        CamSettings::load_from_file(&self.cam_settings_path).unwrap_or_default()
    }

    /// Network transport for the configured address.
    pub fn network_transport(&self) -> Result<NetworkTransport> {
        let address = self
            .address
            .as_deref()
            .ok_or_else(|| anyhow!("No controller address configured"))?;
        Ok(NetworkTransport::with_timeouts(
            address,
            self.stream_port,
            self.control_timeout(),
            self.read_poll(),
        )?)
    }
}

/// Requests from the presentation layer to the session worker.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    Connect,
    Disconnect,
    LoadPlan(SolvePlan),
    SendProgram,
    Stop,
    RequestSettingsReport,
    FetchSettings,
    PushSettings(RobotSettings),
    Servo(Endpoint),
    Shutdown,
}

/// Robot session - drives one controller.
pub struct RobotSession<T: ControllerTransport, O: CubotObserver> {
    config: SessionConfig,
    transport: T,
    observer: Arc<O>,
    ctx: SessionContext,
    solve_log: SolveLog,
}

impl<T: ControllerTransport> RobotSession<T, TracingObserver> {
    /// Create a new session with default tracing observer.
    pub fn new(config: SessionConfig, transport: T) -> Self {
        Self::with_observer(config, transport, Arc::new(TracingObserver))
    }
}

impl<T: ControllerTransport, O: CubotObserver + 'static> RobotSession<T, O> {
    /// Create a new session with a custom observer.
    pub fn with_observer(config: SessionConfig, transport: T, observer: Arc<O>) -> Self {
        let mut ctx = SessionContext::new();
        ctx.settings = config.load_robot_settings();
        let solve_log = SolveLog::new(config.log_path.clone());
        Self {
            config,
            transport,
            observer,
            ctx,
            solve_log,
        }
    }

    pub fn state(&self) -> SessionState {
        self.ctx.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn cube(&self) -> CubeState {
        self.ctx.store.current()
    }

    pub fn settings(&self) -> &RobotSettings {
        &self.ctx.settings
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn emit(&self, event: CubotEvent) {
        self.observer.on_event(&event);
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(CubotEvent::Log {
            level,
            message: message.into(),
        });
    }

    fn goto(&mut self, to: SessionState) {
        let from = self.ctx.state;
        if from != to {
            self.ctx.goto_state(to);
            self.emit(CubotEvent::StateChanged { from, to });
        }
    }

    fn send_line(&self, line: &str) -> Result<(), TransportError> {
        self.transport.write_line(line)?;
        self.emit(CubotEvent::Line {
            direction: LineDirection::Tx,
            text: line.to_string(),
        });
        Ok(())
    }

    /// Probe the controller and hand it the servo settings. Reconnecting
    /// from `Error` drops the old data plane and any unfinished run.
    #[instrument(skip(self), fields(address = %self.transport.address()))]
    pub fn connect(&mut self) -> bool {
        if self.ctx.state.is_connected() && self.ctx.state != SessionState::Error {
            debug!("Already connected");
            return true;
        }
        if !self.transport.probe() {
            warn!("Controller did not answer the liveness probe");
            self.log(
                LogLevel::Warn,
                "Check that this computer is on the controller network",
            );
            return false;
        }

        self.transport.close();
        if self.ctx.state == SessionState::Error {
            info!("Reconnecting after a stream error");
            self.ctx.clear_run();
        }

        match self.ctx.settings.to_json() {
            Ok(json) => {
                if let Err(e) = self.transport.request(Endpoint::Init, Some(&json)) {
                    warn!(error = %e, "Could not initialize the robot");
                }
            }
            Err(e) => warn!(error = %e, "Settings not serializable"),
        }

        self.goto(SessionState::ConnectedIdle);
        self.emit(CubotEvent::Connected {
            address: self.transport.address().to_string(),
        });
        true
    }

    /// Drop the link. A running program, or one whose stream failed, is
    /// asked to stop first.
    #[instrument(skip(self))]
    pub fn disconnect(&mut self) {
        if self.ctx.state == SessionState::Disconnected {
            return;
        }
        if self.ctx.state.is_busy() || self.ctx.state == SessionState::Error {
            self.stop();
        }
        if let Err(e) = self.transport.request(Endpoint::Disconnect, None) {
            debug!(error = %e, "Disconnect request not delivered");
        }
        self.transport.close();
        self.ctx.clear_run();
        self.goto(SessionState::Disconnected);
        self.emit(CubotEvent::Disconnected);
    }

    /// Make `plan` the program to send and show its starting cube.
    pub fn load_plan(&mut self, plan: SolvePlan) -> Result<()> {
        if self.ctx.state.is_busy() {
            bail!("Cannot load a program while the robot is {}", self.ctx.state);
        }
        self.ctx.store.reset_to(plan.initial);
        self.emit(CubotEvent::CubeUpdated {
            state: plan.initial,
        });
        info!(
            instructions = plan.instructions.as_str(),
            total_moves = plan.total_moves,
            "Program loaded"
        );
        self.ctx.plan = Some(plan);
        Ok(())
    }

    /// Send the loaded program; the run starts once the controller echoes it.
    #[instrument(skip(self))]
    pub fn send_program(&mut self) -> Result<()> {
        if self.ctx.state != SessionState::ConnectedIdle {
            bail!("Cannot send a program while {}", self.ctx.state);
        }
        let plan = self
            .ctx
            .plan
            .as_ref()
            .ok_or_else(|| anyhow!("No program loaded"))?;
        if !plan.has_moves() {
            bail!("The loaded program has no moves");
        }

        let framed = plan.framed();
        if let Err(e) = self.send_line(&framed) {
            warn!(error = %e, "Program not sent");
            self.log(LogLevel::Warn, format!("Could not send the program: {e}"));
            return Err(e.into());
        }
        info!(frame = %framed, "Program sent, waiting for echo");
        self.ctx.sent_frame = Some(framed);
        self.goto(SessionState::AwaitingStartAck);
        Ok(())
    }

    /// Ask the robot to stop. The run ends when the controller confirms.
    pub fn stop(&mut self) {
        info!("Stopping the robot");
        if let Err(e) = self.send_line(&frame_control(ControlCommand::Stop)) {
            warn!(error = %e, "Stop command not sent");
            self.log(LogLevel::Warn, format!("Could not stop the robot: {e}"));
        }
        self.emit(CubotEvent::StopRequested);
    }

    /// Ask the controller for a `current_settings(...)` report.
    pub fn request_settings_report(&mut self) -> Result<()> {
        self.send_line(&frame_control(ControlCommand::Settings))?;
        Ok(())
    }

    /// Read the servo settings over the control plane.
    pub fn fetch_settings(&mut self) -> Result<RobotSettings> {
        let body = self.transport.request(Endpoint::GetSettings, None)?;
        let settings = RobotSettings::from_json(&body)?;
        self.adopt_settings(settings);
        Ok(settings)
    }

    /// Send new servo settings and keep them on disk.
    pub fn push_settings(&mut self, settings: RobotSettings) -> Result<()> {
        self.ctx.settings = settings;
        if let Err(e) = settings.save_to_file(&self.config.settings_path) {
            warn!(error = %e, "Robot settings not saved");
        }
        self.transport
            .request(Endpoint::UpdateSettings, Some(&settings.to_json()?))?;
        info!(settings = %settings.to_wire(), "Servo settings sent");
        Ok(())
    }

    /// Run one servo test action.
    pub fn servo(&mut self, action: Endpoint) -> Result<()> {
        if !action.is_servo_test() {
            bail!("{action} is not a servo test");
        }
        if self.ctx.state.is_busy() {
            bail!("Servo tests are not available while the robot is {}", self.ctx.state);
        }
        self.transport.request(action, None)?;
        Ok(())
    }

    fn adopt_settings(&mut self, settings: RobotSettings) {
        self.ctx.settings = settings;
        if let Err(e) = settings.save_to_file(&self.config.settings_path) {
            warn!(error = %e, "Robot settings not saved");
        }
        self.emit(CubotEvent::SettingsReceived { settings });
    }

    /// Process one raw inbound line.
    pub fn handle_line(&mut self, raw: &[u8]) -> Result<HandleResult> {
        let mut ctx = HandlerContext {
            transport: &self.transport,
            observer: self.observer.as_ref(),
            state: &mut self.ctx,
        };
        let result = handle_line(raw, &mut ctx)?;

        match &result {
            HandleResult::Finished(record) => {
                if let Err(e) = self.solve_log.append(record) {
                    warn!(error = %e, path = %self.solve_log.path().display(), "Run not logged");
                }
            }
            HandleResult::Settings(settings) => {
                if let Err(e) = settings.save_report(&self.config.settings_report_path) {
                    warn!(error = %e, "Settings report not saved");
                }
                if let Err(e) = settings.save_to_file(&self.config.settings_path) {
                    warn!(error = %e, "Robot settings not saved");
                }
            }
            HandleResult::Continue | HandleResult::Started | HandleResult::Terminated(_) => {}
        }
        Ok(result)
    }

    /// Read and handle at most one inbound line.
    pub fn poll(&mut self) -> Result<Option<HandleResult>> {
        if !self.ctx.state.is_listening() {
            return Ok(None);
        }
        match self.transport.read_line() {
            Ok(raw) => self.handle_line(&raw).map(Some),
            Err(TransportError::Timeout { .. }) => Ok(None),
            Err(e @ (TransportError::Disconnected | TransportError::Unreachable { .. })) => {
                warn!(error = %e, "Data plane gone");
                self.link_lost();
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "Read failed");
                if !self.transport.probe() {
                    self.link_lost();
                }
                Ok(None)
            }
        }
    }

    fn link_lost(&mut self) {
        warn!("Controller unreachable");
        self.log(LogLevel::Error, "Lost the controller link");
        self.transport.close();
        self.ctx.clear_run();
        self.goto(SessionState::Disconnected);
        self.emit(CubotEvent::Disconnected);
    }

    /// Poll until the running program ends, the link fails or `timeout`
    /// passes. Returns the record of a finished run.
    pub fn listen_until_finished(&mut self, timeout: Duration) -> Result<Option<SolveRecord>> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            match self.poll()? {
                Some(HandleResult::Finished(record)) => return Ok(Some(record)),
                Some(HandleResult::Terminated(msg)) => bail!(msg),
                _ => {}
            }
            if !self.ctx.state.is_listening() {
                bail!("Controller link lost");
            }
        }
        Ok(None)
    }

    fn execute(&mut self, command: SessionCommand) -> Result<()> {
        debug!(?command, "Command");
        match command {
            SessionCommand::Connect => {
                self.connect();
            }
            SessionCommand::Disconnect => self.disconnect(),
            SessionCommand::LoadPlan(plan) => self.load_plan(plan)?,
            SessionCommand::SendProgram => self.send_program()?,
            SessionCommand::Stop => self.stop(),
            SessionCommand::RequestSettingsReport => self.request_settings_report()?,
            SessionCommand::FetchSettings => {
                self.fetch_settings()?;
            }
            SessionCommand::PushSettings(settings) => self.push_settings(settings)?,
            SessionCommand::Servo(action) => self.servo(action)?,
            SessionCommand::Shutdown => {}
        }
        Ok(())
    }

    /// Worker loop: serve commands and read inbound lines until shutdown.
    pub fn run(&mut self, commands: Receiver<SessionCommand>) {
        let idle_wait = self.config.read_poll();
        loop {
            let wait = if self.ctx.state.is_listening() {
                Duration::ZERO
            } else {
                idle_wait
            };
            match commands.recv_timeout(wait) {
                Ok(SessionCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(command) => {
                    if let Err(e) = self.execute(command) {
                        warn!(error = %e, "Command failed");
                        self.log(LogLevel::Warn, e.to_string());
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            if let Err(e) = self.poll() {
                warn!(error = %e, "Inbound line not handled");
            }
        }
        self.disconnect();
        info!("Session worker stopped");
    }
}

/// Handle to a session running on its own worker thread.
pub struct SessionHandle {
    sender: Sender<SessionCommand>,
    worker: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Move `session` onto a worker thread.
    pub fn spawn<T, O>(mut session: RobotSession<T, O>) -> Self
    where
        T: ControllerTransport + 'static,
        O: CubotObserver + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let worker = thread::spawn(move || session.run(receiver));
        Self {
            sender,
            worker: Some(worker),
        }
    }

    /// Queue a command. Returns false once the worker is gone.
    pub fn send(&self, command: SessionCommand) -> bool {
        self.sender.send(command).is_ok()
    }

    /// Stop the worker and wait for it.
    pub fn shutdown(mut self) {
        self.join();
    }

    fn join(&mut self) {
        let _ = self.sender.send(SessionCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Session worker panicked");
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullObserver;
    use crate::transport::MockTransport;

    fn temp_config(tag: &str) -> SessionConfig {
        let dir = std::env::temp_dir().join(format!("cubot-session-{tag}-{}", std::process::id()));
        SessionConfig {
            address: Some("192.168.1.50".into()),
            settings_path: dir.join("robot_settings.json"),
            settings_report_path: dir.join("report.txt"),
            cam_settings_path: dir.join("cam.txt"),
            log_path: dir.join("log.txt"),
            ..Default::default()
        }
    }

    fn session(tag: &str, mock: &MockTransport) -> RobotSession<MockTransport, NullObserver> {
        RobotSession::with_observer(temp_config(tag), mock.clone(), Arc::new(NullObserver))
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = SessionConfig {
            address: Some("192.168.1.7".into()),
            stream_port: 9000,
            ..Default::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: SessionConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.address.as_deref(), Some("192.168.1.7"));
        assert_eq!(parsed.stream_port, 9000);
        assert_eq!(parsed.solver.max_length, 18);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: SessionConfig = toml::from_str("address = \"10.0.0.2\"").unwrap();
        assert_eq!(parsed.control_timeout_ms, 1000);
        assert_eq!(parsed.discovery_workers, 4);
    }

    #[test]
    fn test_connect_probes_and_initializes() {
        let mock = MockTransport::new();
        let mut session = session("connect", &mock);

        assert!(session.connect());
        assert_eq!(session.state(), SessionState::ConnectedIdle);
        assert_eq!(
            mock.requested_endpoints(),
            vec![Endpoint::CheckConnection, Endpoint::Init]
        );
        let (_, body) = &mock.get_requests()[1];
        let sent = RobotSettings::from_json(body.as_deref().unwrap()).unwrap();
        assert_eq!(sent, *session.settings());
    }

    #[test]
    fn test_connect_fails_when_probe_fails() {
        let mock = MockTransport::new();
        mock.disconnect();
        let mut session = session("offline", &mock);

        assert!(!session.connect());
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_send_requires_moves() {
        let mock = MockTransport::new();
        let mut session = session("empty", &mock);
        session.connect();

        assert!(session.send_program().is_err());
        let plan = SolvePlan::from_instructions(CubeState::solved(), "", false).unwrap();
        session.load_plan(plan).unwrap();
        assert!(session.send_program().is_err());
        assert_eq!(session.state(), SessionState::ConnectedIdle);
        assert!(mock.get_writes().is_empty());
    }

    #[test]
    fn test_stop_is_optimistic() {
        let mock = MockTransport::new();
        let mut session = session("stop", &mock);
        session.connect();
        let plan = SolvePlan::from_instructions(CubeState::solved(), "R1", false).unwrap();
        session.load_plan(plan).unwrap();
        session.send_program().unwrap();
        mock.queue_line("<R1>");
        session.poll().unwrap();
        assert_eq!(session.state(), SessionState::Working);

        session.stop();
        assert_eq!(session.state(), SessionState::Working);
        assert_eq!(mock.get_writes().last().map(String::as_str), Some("[stop]"));
    }

    #[test]
    fn test_servo_rejects_other_endpoints() {
        let mock = MockTransport::new();
        let mut session = session("servo", &mock);
        assert!(session.servo(Endpoint::Init).is_err());
        session.servo(Endpoint::FlipTopCover).unwrap();
        assert_eq!(mock.requested_endpoints(), vec![Endpoint::FlipTopCover]);
    }

    #[test]
    fn test_disconnect_clears_the_run() {
        let mock = MockTransport::new();
        let mut session = session("disconnect", &mock);
        session.connect();
        let plan = SolvePlan::from_instructions(CubeState::solved(), "R1", false).unwrap();
        session.load_plan(plan).unwrap();
        session.send_program().unwrap();

        session.disconnect();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.context().plan.is_none());
        assert_eq!(mock.get_writes(), vec!["<R1>", "[stop]"]);
        assert_eq!(
            mock.requested_endpoints().last(),
            Some(&Endpoint::Disconnect)
        );
    }

    fn working(tag: &str, mock: &MockTransport) -> RobotSession<MockTransport, NullObserver> {
        let mut session = session(tag, mock);
        session.connect();
        let plan = SolvePlan::from_instructions(CubeState::solved(), "R1F1", false).unwrap();
        session.load_plan(plan).unwrap();
        session.send_program().unwrap();
        mock.queue_line("<R1F1>");
        session.poll().unwrap();
        assert_eq!(session.state(), SessionState::Working);
        session
    }

    #[test]
    fn test_reconnect_after_error_clears_the_run() {
        let mock = MockTransport::new();
        let mut session = working("error-reconnect", &mock);
        mock.queue_bytes(&[0xff, 0xfe]);
        session.poll().unwrap();
        assert_eq!(session.state(), SessionState::Error);
        assert!(session.context().ledger.is_some());

        mock.drop_stream();
        assert!(session.connect());
        assert_eq!(session.state(), SessionState::ConnectedIdle);
        assert!(session.context().plan.is_none());
        assert!(session.context().ledger.is_none());
        assert!(session.context().sent_frame.is_none());
        // the old data plane was closed, so reads work again
        mock.queue_line("conn");
        assert!(session.poll().unwrap().is_some());
        assert_eq!(session.state(), SessionState::ConnectedIdle);
    }

    #[test]
    fn test_disconnect_from_error_stops_the_robot() {
        let mock = MockTransport::new();
        let mut session = working("error-disconnect", &mock);
        mock.queue_bytes(&[0xff]);
        session.poll().unwrap();
        assert_eq!(session.state(), SessionState::Error);

        session.disconnect();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(mock.get_writes().last().map(String::as_str), Some("[stop]"));
    }

    #[test]
    fn test_lost_data_plane_is_not_retried() {
        let mock = MockTransport::new();
        let mut session = working("stream-down", &mock);
        mock.drop_stream();

        // the control plane still answers, the run ends anyway
        assert!(session.poll().unwrap().is_none());
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.context().plan.is_none());
        let probes = mock
            .requested_endpoints()
            .into_iter()
            .filter(|e| *e == Endpoint::CheckConnection)
            .count();
        assert_eq!(probes, 1);
        assert!(session.poll().unwrap().is_none());
    }
}
