//! Application state and logic.
//!
//! Contains the app state (Model), input handling (Controller).

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use cubot_core::cube::CubeState;
use cubot_core::discovery::discover;
use cubot_core::events::{CubotEvent, CubotObserver, LineDirection, LogLevel};
use cubot_core::program::SolvePlan;
use cubot_core::session::{RobotSession, SessionCommand, SessionConfig, SessionHandle};
use cubot_core::state::SessionState;

/// Maximum log entries to keep.
const MAX_LOG_ENTRIES: usize = 1000;
/// Maximum protocol lines to keep.
const MAX_LINES: usize = 1000;
/// Configuration file read at startup.
pub const CONFIG_FILE: &str = "cubot.toml";

/// Application state.
pub struct App {
    /// Whether to quit the application.
    pub should_quit: bool,
    /// Current focus (which pane is active).
    pub focus: Focus,
    /// Current view/tab.
    pub current_tab: Tab,
    /// Session configuration.
    pub config: SessionConfig,
    /// Last session state reported by the worker.
    pub state: SessionState,
    /// Followed cube.
    pub cube: CubeState,
    /// Progress (0-100).
    pub progress: u8,
    /// Moves left in the running program.
    pub remaining: Option<i64>,
    pub total_moves: u32,
    /// Log entries.
    pub logs: VecDeque<LogEntry>,
    /// Log scroll position.
    pub log_scroll: usize,
    /// Robot instructions typed by the user.
    pub instructions: String,
    /// Definition of the cube before the run; empty means solved.
    pub definition: String,
    /// Input field focus.
    pub input_focus: usize,
    /// The next program scrambles the cube.
    pub scramble: bool,
    /// Controllers found by the last scan.
    pub controllers: Vec<String>,
    pub scanning: bool,
    /// Shared observer for receiving events from the session worker.
    pub observer: Arc<TuiObserver>,
    /// Session worker, started on first connect.
    session: Option<SessionHandle>,
    /// Recent protocol lines.
    pub lines: VecDeque<LineInfo>,
    /// Line scroll position.
    pub line_scroll: usize,
}

/// Which pane is focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Program,
    Logs,
}

/// Tab/view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Main,
    Logs,
    Protocol,
    Help,
}

/// Log entry.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: String,
}

/// Protocol line for display.
#[derive(Debug, Clone)]
pub struct LineInfo {
    pub direction: LineDirection,
    pub timestamp: String,
    pub text: String,
}

/// TUI observer that collects events for display.
pub struct TuiObserver {
    events: Mutex<VecDeque<CubotEvent>>,
}

impl TuiObserver {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(100)),
        }
    }

    pub fn drain_events(&self) -> Vec<CubotEvent> {
        match self.events.lock() {
            Ok(mut events) => events.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl Default for TuiObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl CubotObserver for TuiObserver {
    fn on_event(&self, event: &CubotEvent) {
        if let Ok(mut events) = self.events.lock() {
            if events.len() >= 500 {
                events.pop_front();
            }
            events.push_back(event.clone());
        }
    }
}

impl App {
    pub fn new() -> Self {
        let config = if Path::new(CONFIG_FILE).exists() {
            SessionConfig::load_from_file(CONFIG_FILE).unwrap_or_default()
        } else {
            SessionConfig::default()
        };

        let mut app = Self {
            should_quit: false,
            focus: Focus::Program,
            current_tab: Tab::Main,
            config,
            state: SessionState::Disconnected,
            cube: CubeState::solved(),
            progress: 0,
            remaining: None,
            total_moves: 0,
            logs: VecDeque::with_capacity(MAX_LOG_ENTRIES),
            log_scroll: 0,
            instructions: String::new(),
            definition: String::new(),
            input_focus: 0,
            scramble: false,
            controllers: Vec::new(),
            scanning: false,
            observer: Arc::new(TuiObserver::new()),
            session: None,
            lines: VecDeque::with_capacity(MAX_LINES),
            line_scroll: 0,
        };
        match &app.config.address {
            Some(address) => {
                let msg = format!("Controller address {address}, Ctrl+O to connect");
                app.add_log(LogLevel::Info, msg);
            }
            None => app.add_log(LogLevel::Info, "No controller address, F4 to scan"),
        }
        app
    }

    pub fn address(&self) -> Option<&str> {
        self.config.address.as_deref()
    }

    /// Handle keyboard input. Returns true if app should quit.
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        // Global shortcuts
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('c') if ctrl => {
                self.quit();
                return true;
            }
            KeyCode::Char('o') if ctrl => {
                self.connect();
                return false;
            }
            KeyCode::Char('d') if ctrl => {
                self.send(SessionCommand::Disconnect);
                return false;
            }
            KeyCode::Char('x') if ctrl => {
                self.send(SessionCommand::Stop);
                return false;
            }
            KeyCode::Char('r') if ctrl => {
                self.scramble = !self.scramble;
                return false;
            }
            KeyCode::Char('g') if ctrl => {
                self.send(SessionCommand::RequestSettingsReport);
                return false;
            }
            KeyCode::Esc => {
                if self.current_tab != Tab::Main {
                    self.current_tab = Tab::Main;
                    return false;
                }
                self.quit();
                return true;
            }
            KeyCode::F(1) => {
                self.current_tab = Tab::Help;
                return false;
            }
            KeyCode::F(2) => {
                self.current_tab = Tab::Logs;
                return false;
            }
            KeyCode::F(3) => {
                self.current_tab = Tab::Protocol;
                return false;
            }
            KeyCode::F(4) => {
                self.start_scan();
                return false;
            }
            _ => {}
        }

        // Tab-specific handling
        match self.current_tab {
            Tab::Main => self.handle_main_key(key),
            Tab::Logs => self.handle_logs_key(key),
            Tab::Protocol => self.handle_protocol_key(key),
            Tab::Help => {
                // Any key returns to main
                self.current_tab = Tab::Main;
            }
        }

        false
    }

    fn handle_main_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Program => Focus::Logs,
                    Focus::Logs => Focus::Program,
                };
            }
            KeyCode::Up => {
                if self.focus == Focus::Program {
                    self.input_focus = 0;
                }
            }
            KeyCode::Down => {
                if self.focus == Focus::Program {
                    self.input_focus = 1;
                }
            }
            KeyCode::Enter => {
                if self.focus == Focus::Program {
                    self.send_program();
                }
            }
            KeyCode::Char(c) => {
                if self.focus == Focus::Program {
                    self.input_char(c);
                }
            }
            KeyCode::Backspace => {
                if self.focus == Focus::Program {
                    self.active_field().pop();
                }
            }
            _ => {}
        }
    }

    fn handle_logs_key(&mut self, key: KeyEvent) {
        let len = self.logs.len();
        scroll(&mut self.log_scroll, len, key.code);
    }

    fn handle_protocol_key(&mut self, key: KeyEvent) {
        let len = self.lines.len();
        scroll(&mut self.line_scroll, len, key.code);
    }

    fn active_field(&mut self) -> &mut String {
        if self.input_focus == 0 {
            &mut self.instructions
        } else {
            &mut self.definition
        }
    }

    fn input_char(&mut self, c: char) {
        let c = c.to_ascii_uppercase();
        if c.is_ascii_alphanumeric() {
            self.active_field().push(c);
        }
    }

    fn send(&mut self, command: SessionCommand) {
        let Some(session) = &self.session else {
            self.add_log(LogLevel::Warn, "Not connected, Ctrl+O to connect");
            return;
        };
        if !session.send(command) {
            self.add_log(LogLevel::Error, "Session worker stopped");
            self.session = None;
        }
    }

    fn connect(&mut self) {
        if self.session.is_none() {
            let transport = match self.config.network_transport() {
                Ok(transport) => transport,
                Err(e) => {
                    self.add_log(LogLevel::Error, format!("{e}"));
                    return;
                }
            };
            let session =
                RobotSession::with_observer(self.config.clone(), transport, self.observer.clone());
            self.session = Some(SessionHandle::spawn(session));
        }
        self.send(SessionCommand::Connect);
    }

    fn send_program(&mut self) {
        if self.state != SessionState::ConnectedIdle {
            self.add_log(LogLevel::Warn, format!("Robot is {}", self.state));
            return;
        }
        let initial = if self.definition.is_empty() {
            CubeState::solved()
        } else {
            match CubeState::from_definition(&self.definition) {
                Ok(cube) => cube,
                Err(e) => {
                    self.add_log(LogLevel::Error, format!("{e}"));
                    return;
                }
            }
        };
        match SolvePlan::from_instructions(initial, &self.instructions, self.scramble) {
            Ok(plan) if plan.has_moves() => {
                self.total_moves = plan.total_moves;
                self.progress = 0;
                self.remaining = None;
                self.send(SessionCommand::LoadPlan(plan));
                self.send(SessionCommand::SendProgram);
            }
            Ok(_) => self.add_log(LogLevel::Warn, "Type a robot program first"),
            Err(e) => self.add_log(LogLevel::Error, format!("{e}")),
        }
    }

    fn start_scan(&mut self) {
        if self.scanning {
            return;
        }
        self.scanning = true;
        self.add_log(
            LogLevel::Info,
            format!("Scanning {}.0/24 for controllers", self.config.subnet),
        );
        let observer = self.observer.clone();
        let subnet = self.config.subnet.clone();
        let workers = self.config.discovery_workers;
        let timeout = self.config.probe_timeout();
        thread::spawn(move || {
            let addresses = discover(&subnet, workers, timeout);
            observer.on_event(&CubotEvent::ControllersDiscovered { addresses });
        });
    }

    fn quit(&mut self) {
        self.should_quit = true;
        if let Some(session) = self.session.take() {
            session.shutdown();
        }
    }

    /// Called on each tick - process observer events.
    pub fn on_tick(&mut self) {
        let events = self.observer.drain_events();
        for event in events {
            self.process_event(event);
        }
    }

    fn process_event(&mut self, event: CubotEvent) {
        match event {
            CubotEvent::StateChanged { to, .. } => {
                self.state = to;
            }
            CubotEvent::Connected { address } => {
                self.add_log(LogLevel::Info, format!("Connected to {address}"));
            }
            CubotEvent::Disconnected => {
                self.state = SessionState::Disconnected;
                self.add_log(LogLevel::Warn, "Controller disconnected");
            }
            CubotEvent::Progress {
                percent,
                remaining,
                total,
                ..
            } => {
                self.progress = percent;
                self.remaining = Some(remaining);
                self.total_moves = total;
            }
            CubotEvent::CubeUpdated { state } => {
                self.cube = state;
            }
            CubotEvent::Log { level, message } => {
                self.add_log(level, message);
            }
            CubotEvent::Line { direction, text } => {
                let line = LineInfo {
                    direction,
                    timestamp: chrono::Local::now().format("%H:%M:%S.%3f").to_string(),
                    text,
                };
                if self.lines.len() >= MAX_LINES {
                    self.lines.pop_front();
                }
                self.lines.push_back(line);
                self.line_scroll = self.lines.len().saturating_sub(1);
            }
            CubotEvent::StopRequested => {
                self.add_log(LogLevel::Info, "Stop requested");
            }
            CubotEvent::SolveFinished { record } => {
                let elapsed = record
                    .elapsed_secs
                    .map(|s| format!(" in {s} s"))
                    .unwrap_or_default();
                self.remaining = None;
                self.add_log(
                    LogLevel::Info,
                    format!(
                        "Run {}{elapsed}, {} moves",
                        record.end_reason, record.total_moves
                    ),
                );
            }
            CubotEvent::SettingsReceived { settings } => {
                self.add_log(LogLevel::Info, format!("Servo settings {}", settings.to_wire()));
            }
            CubotEvent::ControllersDiscovered { addresses } => {
                self.scanning = false;
                if addresses.is_empty() {
                    self.add_log(LogLevel::Warn, "No controller found");
                } else if self.session.is_none() {
                    self.config.address = addresses.first().cloned();
                    self.add_log(
                        LogLevel::Info,
                        format!("Found {}, Ctrl+O to connect", addresses.join(", ")),
                    );
                }
                self.controllers = addresses;
            }
        }
    }

    fn add_log(&mut self, level: LogLevel, message: impl Into<String>) {
        let now = chrono::Local::now();
        let entry = LogEntry {
            level,
            message: message.into(),
            timestamp: now.format("%H:%M:%S").to_string(),
        };

        if self.logs.len() >= MAX_LOG_ENTRIES {
            self.logs.pop_front();
        }
        self.logs.push_back(entry);

        // Auto-scroll to bottom
        self.log_scroll = self.logs.len().saturating_sub(1);
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

fn scroll(position: &mut usize, len: usize, code: KeyCode) {
    let last = len.saturating_sub(1);
    match code {
        KeyCode::Up | KeyCode::Char('k') => *position = position.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => *position = (*position + 1).min(last),
        KeyCode::PageUp => *position = position.saturating_sub(10),
        KeyCode::PageDown => *position = (*position + 10).min(last),
        KeyCode::Home => *position = 0,
        KeyCode::End => *position = last,
        _ => {}
    }
}
