//! Inbound line handlers - dispatch logic for each controller message.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::events::{CubotEvent, CubotObserver, LineDirection, LogLevel};
use crate::program::ProgressLedger;
use crate::protocol::{ControlCommand, InboundMessage, frame_control};
use crate::record::{EndReason, SolveRecord};
use crate::settings::RobotSettings;
use crate::state::machine::{SessionContext, SessionState};
use crate::transport::ControllerTransport;

/// Result of handling an inbound line.
#[derive(Debug)]
pub enum HandleResult {
    /// Keep listening.
    Continue,
    /// The controller confirmed a program and the robot started.
    Started,
    /// The run ended.
    Finished(SolveRecord),
    /// The controller reported its servo settings.
    Settings(RobotSettings),
    /// The inbound stream is unusable; listening stops.
    Terminated(String),
}

/// Handler context containing all resources.
pub struct HandlerContext<'a, T: ControllerTransport, O: CubotObserver> {
    pub transport: &'a T,
    pub observer: &'a O,
    pub state: &'a mut SessionContext,
}

impl<'a, T: ControllerTransport, O: CubotObserver> HandlerContext<'a, T, O> {
    pub(crate) fn emit(&self, event: CubotEvent) {
        self.observer.on_event(&event);
    }

    pub(crate) fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(CubotEvent::Log {
            level,
            message: message.into(),
        });
    }

    /// Transition and tell the observer.
    pub(crate) fn goto(&mut self, to: SessionState) {
        let from = self.state.state;
        if from == to {
            return;
        }
        self.state.goto_state(to);
        self.emit(CubotEvent::StateChanged { from, to });
    }
}

/// Decode one raw inbound line and dispatch it.
pub fn handle_line<T: ControllerTransport, O: CubotObserver>(
    raw: &[u8],
    ctx: &mut HandlerContext<'_, T, O>,
) -> Result<HandleResult> {
    let Ok(text) = std::str::from_utf8(raw) else {
        let msg = format!("Undecodable data from controller: {:02X?}", raw);
        warn!(len = raw.len(), "Undecodable inbound payload, listener stops");
        ctx.log(LogLevel::Error, msg.clone());
        ctx.goto(SessionState::Error);
        return Ok(HandleResult::Terminated(msg));
    };

    let Some(message) = InboundMessage::parse(text) else {
        return Ok(HandleResult::Continue);
    };
    ctx.emit(CubotEvent::Line {
        direction: LineDirection::Rx,
        text: text.trim().to_string(),
    });
    handle_message(message, ctx)
}

/// Dispatch a decoded message according to the current state.
pub fn handle_message<T: ControllerTransport, O: CubotObserver>(
    message: InboundMessage,
    ctx: &mut HandlerContext<'_, T, O>,
) -> Result<HandleResult> {
    debug!(kind = message.kind(), state = %ctx.state.state, "Inbound message");

    match message {
        InboundMessage::Connected => handle_connected(ctx),
        InboundMessage::Echo(text) => handle_echo(&text, ctx),
        InboundMessage::Stop { elapsed } => handle_stop(elapsed, ctx),
        InboundMessage::Start => handle_start(ctx),
        InboundMessage::Progress(index) => handle_progress(index, ctx),
        InboundMessage::Solved { elapsed } => handle_solved(elapsed, ctx),
        InboundMessage::SettingsReport(payload) => handle_settings_report(&payload, ctx),
        InboundMessage::SettingsAccepted => handle_settings_accepted(ctx),
        InboundMessage::Unknown(text) => handle_unknown(&text, ctx),
    }
}

// ============================================================================
// Individual Message Handlers
// ============================================================================

/// conn - the controller announced its link.
fn handle_connected<T: ControllerTransport, O: CubotObserver>(
    ctx: &mut HandlerContext<'_, T, O>,
) -> Result<HandleResult> {
    info!("Controller link established");
    ctx.log(LogLevel::Info, "Established connection with the controller");
    Ok(HandleResult::Continue)
}

/// <...> - the controller repeats the program it received.
fn handle_echo<T: ControllerTransport, O: CubotObserver>(
    echo: &str,
    ctx: &mut HandlerContext<'_, T, O>,
) -> Result<HandleResult> {
    if ctx.state.state != SessionState::AwaitingStartAck {
        debug!(echo, "Echo outside of a program hand-off, ignored");
        return Ok(HandleResult::Continue);
    }

    let expected = ctx.state.sent_frame.as_deref().unwrap_or_default();
    if echo != expected {
        warn!(echo, expected, "Program echo differs from the frame sent");
        ctx.log(
            LogLevel::Warn,
            format!("Robot received a different program: {echo} (sent {expected}), send it again"),
        );
        // The plan stays loaded so the program can be re-sent.
        ctx.state.sent_frame = None;
        ctx.goto(SessionState::ConnectedIdle);
        return Ok(HandleResult::Continue);
    }

    let Some(plan) = ctx.state.plan.as_ref() else {
        warn!("Echo matched but no program is loaded");
        ctx.goto(SessionState::ConnectedIdle);
        return Ok(HandleResult::Continue);
    };
    let initial = plan.initial;
    let task = if plan.scramble { "scrambling" } else { "solving" };
    let ledger = match ProgressLedger::build(&plan.instructions, plan.total_moves) {
        Ok(ledger) => ledger,
        Err(e) => {
            ctx.log(LogLevel::Error, format!("Cannot track this program: {e}"));
            ctx.state.clear_run();
            ctx.goto(SessionState::ConnectedIdle);
            return Ok(HandleResult::Continue);
        }
    };

    let start = frame_control(ControlCommand::Start);
    if let Err(e) = ctx.transport.write_line(&start) {
        warn!(error = %e, "Start command not sent");
        ctx.log(LogLevel::Warn, format!("Could not start the robot: {e}"));
        return Ok(HandleResult::Continue);
    }
    ctx.emit(CubotEvent::Line {
        direction: LineDirection::Tx,
        text: start,
    });

    ctx.state.ledger = Some(ledger);
    ctx.state.store.reset_to(initial);
    ctx.emit(CubotEvent::CubeUpdated { state: initial });
    ctx.log(LogLevel::Info, format!("Robot requested to start {task} the cube"));
    ctx.goto(SessionState::Working);
    Ok(HandleResult::Started)
}

/// stop - the robot was stopped.
fn handle_stop<T: ControllerTransport, O: CubotObserver>(
    elapsed: Option<f64>,
    ctx: &mut HandlerContext<'_, T, O>,
) -> Result<HandleResult> {
    if ctx.state.state != SessionState::Working {
        debug!("Stop while no program runs, ignored");
        return Ok(HandleResult::Continue);
    }
    info!(?elapsed, "Robot stopped");
    finish_run(EndReason::Stopped, elapsed, ctx)
}

/// start - the controller began executing.
fn handle_start<T: ControllerTransport, O: CubotObserver>(
    ctx: &mut HandlerContext<'_, T, O>,
) -> Result<HandleResult> {
    info!("Start command received by the robot");
    ctx.log(LogLevel::Debug, "Robot acknowledged the start command");
    Ok(HandleResult::Continue)
}

/// i_<index> - the robot executes the instruction at `index`.
fn handle_progress<T: ControllerTransport, O: CubotObserver>(
    index: usize,
    ctx: &mut HandlerContext<'_, T, O>,
) -> Result<HandleResult> {
    if ctx.state.state != SessionState::Working {
        debug!(index, "Progress while no program runs, ignored");
        return Ok(HandleResult::Continue);
    }
    let (Some(ledger), Some(plan)) = (ctx.state.ledger.as_ref(), ctx.state.plan.as_ref()) else {
        warn!(index, "Progress without a ledger");
        return Ok(HandleResult::Continue);
    };

    let (Some(percent), Some(remaining)) =
        (ledger.percent_complete(index), ledger.remaining(index))
    else {
        warn!(index, "Progress index is not an instruction position");
        ctx.log(
            LogLevel::Warn,
            format!("Robot reported unknown move index {index}"),
        );
        return Ok(HandleResult::Continue);
    };
    let total = ledger.total_moves();

    let applied = ctx.state.store.advance_to(index, &plan.instructions);
    if applied > 0 {
        ctx.emit(CubotEvent::CubeUpdated {
            state: ctx.state.store.current(),
        });
    }
    ctx.emit(CubotEvent::Progress {
        index,
        percent,
        remaining,
        total,
    });
    Ok(HandleResult::Continue)
}

/// solved - the robot finished the program.
fn handle_solved<T: ControllerTransport, O: CubotObserver>(
    elapsed: Option<f64>,
    ctx: &mut HandlerContext<'_, T, O>,
) -> Result<HandleResult> {
    if ctx.state.state != SessionState::Working {
        debug!("Solved while no program runs, ignored");
        return Ok(HandleResult::Continue);
    }
    let scramble = ctx.state.plan.as_ref().is_some_and(|p| p.scramble);
    let reason = if scramble {
        EndReason::Scrambled
    } else {
        EndReason::Solved
    };
    info!(reason = %reason, ?elapsed, "Robot finished");
    finish_run(reason, elapsed, ctx)
}

/// current_settings(...) - servo settings report.
fn handle_settings_report<T: ControllerTransport, O: CubotObserver>(
    payload: &str,
    ctx: &mut HandlerContext<'_, T, O>,
) -> Result<HandleResult> {
    match RobotSettings::parse_wire(payload) {
        Ok(settings) => {
            info!(settings = %settings.to_wire(), "Servo settings reported");
            ctx.state.settings = settings;
            ctx.emit(CubotEvent::SettingsReceived { settings });
            Ok(HandleResult::Settings(settings))
        }
        Err(e) => {
            warn!(error = %e, payload, "Malformed settings report");
            ctx.log(LogLevel::Warn, format!("Not a valid settings string: {e}"));
            Ok(HandleResult::Continue)
        }
    }
}

/// new_settings - an update was applied.
fn handle_settings_accepted<T: ControllerTransport, O: CubotObserver>(
    ctx: &mut HandlerContext<'_, T, O>,
) -> Result<HandleResult> {
    info!("New servo settings accepted by the robot");
    ctx.log(LogLevel::Info, "Robot accepted the new servo settings");
    Ok(HandleResult::Continue)
}

fn handle_unknown<T: ControllerTransport, O: CubotObserver>(
    text: &str,
    ctx: &mut HandlerContext<'_, T, O>,
) -> Result<HandleResult> {
    warn!(line = text, "Unexpected data from controller");
    ctx.log(LogLevel::Warn, format!("Unexpected data received: {text}"));
    Ok(HandleResult::Continue)
}

fn finish_run<T: ControllerTransport, O: CubotObserver>(
    reason: EndReason,
    elapsed: Option<f64>,
    ctx: &mut HandlerContext<'_, T, O>,
) -> Result<HandleResult> {
    let record = ctx
        .state
        .plan
        .as_ref()
        .map(|plan| SolveRecord::from_plan(plan, reason, elapsed));
    ctx.state.clear_run();
    ctx.goto(SessionState::ConnectedIdle);

    match record {
        Some(record) => {
            let secs = elapsed.map(|s| format!(" in {s} secs")).unwrap_or_default();
            ctx.log(LogLevel::Info, format!("Cube {reason}{secs}"));
            ctx.emit(CubotEvent::SolveFinished {
                record: record.clone(),
            });
            Ok(HandleResult::Finished(record))
        }
        None => Ok(HandleResult::Continue),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::CubeState;
    use crate::events::NullObserver;
    use crate::program::SolvePlan;
    use crate::transport::MockTransport;

    fn awaiting(text: &str, scramble: bool) -> SessionContext {
        let mut state = SessionContext::new();
        let plan = SolvePlan::from_instructions(CubeState::solved(), text, scramble).unwrap();
        state.sent_frame = Some(plan.framed());
        state.plan = Some(plan);
        state.state = SessionState::AwaitingStartAck;
        state
    }

    fn feed(line: &str, transport: &MockTransport, state: &mut SessionContext) -> HandleResult {
        let mut ctx = HandlerContext {
            transport,
            observer: &NullObserver,
            state,
        };
        handle_line(line.as_bytes(), &mut ctx).unwrap()
    }

    #[test]
    fn test_matching_echo_starts_the_run() {
        let transport = MockTransport::new();
        let mut state = awaiting("R1S3F2", false);

        assert!(matches!(
            feed("<R1S3F2>", &transport, &mut state),
            HandleResult::Started
        ));
        assert_eq!(state.state, SessionState::Working);
        assert_eq!(transport.get_writes(), vec!["[start]"]);
        assert_eq!(state.ledger.as_ref().map(|l| l.len()), Some(3));
        assert_eq!(state.store.watermark(), None);
    }

    #[test]
    fn test_mismatched_echo_returns_to_idle() {
        let transport = MockTransport::new();
        let mut state = awaiting("R1S3F2", false);

        feed("<R1S3F1>", &transport, &mut state);
        assert_eq!(state.state, SessionState::ConnectedIdle);
        assert!(transport.get_writes().is_empty());
        assert!(state.ledger.is_none());
        assert!(state.sent_frame.is_none());
        assert!(state.plan.is_some());

        // a late matching echo no longer starts anything
        feed("<R1S3F2>", &transport, &mut state);
        assert_eq!(state.state, SessionState::ConnectedIdle);
        assert!(transport.get_writes().is_empty());
    }

    #[test]
    fn test_failed_start_write_keeps_waiting() {
        let transport = MockTransport::new();
        transport.disconnect();
        let mut state = awaiting("R1", false);

        feed("<R1>", &transport, &mut state);
        assert_eq!(state.state, SessionState::AwaitingStartAck);
    }

    #[test]
    fn test_progress_moves_the_cube() {
        let transport = MockTransport::new();
        let mut state = awaiting("F1R1", false);
        feed("<F1R1>", &transport, &mut state);

        feed("i_0", &transport, &mut state);
        assert_eq!(state.store.watermark(), Some(0));
        assert_eq!(
            state.store.current().get(crate::cube::Face::D.center_index()),
            crate::cube::Face::F
        );

        // unknown index changes nothing
        feed("i_1", &transport, &mut state);
        assert_eq!(state.store.watermark(), Some(0));
    }

    #[test]
    fn test_stop_outside_a_run_is_ignored() {
        let transport = MockTransport::new();
        let mut state = SessionContext::new();
        state.state = SessionState::ConnectedIdle;
        assert!(matches!(
            feed("stop", &transport, &mut state),
            HandleResult::Continue
        ));
        assert_eq!(state.state, SessionState::ConnectedIdle);
    }

    #[test]
    fn test_solved_with_scramble_flag() {
        let transport = MockTransport::new();
        let mut state = awaiting("R1", true);
        feed("<R1>", &transport, &mut state);

        match feed("solved(4.2)", &transport, &mut state) {
            HandleResult::Finished(record) => {
                assert_eq!(record.end_reason, EndReason::Scrambled);
                assert_eq!(record.elapsed_secs, Some(4.2));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(state.state, SessionState::ConnectedIdle);
        assert!(state.plan.is_none());
    }

    #[test]
    fn test_undecodable_payload_terminates() {
        let transport = MockTransport::new();
        let mut state = awaiting("R1", false);
        let mut ctx = HandlerContext {
            transport: &transport,
            observer: &NullObserver,
            state: &mut state,
        };
        let result = handle_line(&[0xff, 0xfe, 0x00], &mut ctx).unwrap();
        assert!(matches!(result, HandleResult::Terminated(_)));
        assert_eq!(state.state, SessionState::Error);
    }

    #[test]
    fn test_settings_report() {
        let transport = MockTransport::new();
        let mut state = SessionContext::new();
        let wire = RobotSettings::default().to_wire();
        let result = feed(&format!("current_settings{wire}"), &transport, &mut state);
        assert!(matches!(result, HandleResult::Settings(_)));

        let result = feed("current_settings(1,2)", &transport, &mut state);
        assert!(matches!(result, HandleResult::Continue));
    }
}
