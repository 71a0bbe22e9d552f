//! Full robot runs against the mock controller.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cubot_core::cube::{CubeState, CubeStore};
use cubot_core::events::{CubotEvent, CubotObserver};
use cubot_core::program::{
    CubeSolver, EntryMethod, OrientationTranslator, RobotInstructions, SolvePlan, SolverLimits,
    plan_solve,
};
use cubot_core::record::{EndReason, LOG_HEADERS};
use cubot_core::session::{RobotSession, SessionConfig};
use cubot_core::settings::RobotSettings;
use cubot_core::state::{HandleResult, SessionState};
use cubot_core::transport::MockTransport;

#[derive(Default)]
struct Recorder(Mutex<Vec<CubotEvent>>);

impl CubotObserver for Recorder {
    fn on_event(&self, event: &CubotEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

impl Recorder {
    fn progress(&self) -> Vec<(usize, u8)> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                CubotEvent::Progress { index, percent, .. } => Some((*index, *percent)),
                _ => None,
            })
            .collect()
    }

    fn states(&self) -> Vec<SessionState> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                CubotEvent::StateChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }
}

struct FixedSolver(&'static str);

impl CubeSolver for FixedSolver {
    fn solve(&self, _definition: &str, _max_length: u32, _timeout_secs: u32) -> String {
        self.0.to_string()
    }
}

fn work_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cubot-it-{tag}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn setup(
    tag: &str,
) -> (
    RobotSession<MockTransport, Recorder>,
    MockTransport,
    Arc<Recorder>,
    PathBuf,
) {
    let dir = work_dir(tag);
    let config = SessionConfig {
        address: Some("192.168.1.50".into()),
        settings_path: dir.join("robot_settings.json"),
        settings_report_path: dir.join("robot_settings_report.txt"),
        cam_settings_path: dir.join("cam_settings.txt"),
        log_path: dir.join("data_log_folder").join("robot_log.txt"),
        ..Default::default()
    };
    let mock = MockTransport::new();
    let recorder = Arc::new(Recorder::default());
    let mut session = RobotSession::with_observer(config, mock.clone(), recorder.clone());
    assert!(session.connect());
    (session, mock, recorder, dir)
}

fn replay(initial: CubeState, text: &str) -> CubeState {
    let mut store = CubeStore::new(initial);
    store.advance_to(usize::MAX, &RobotInstructions::parse(text).unwrap());
    store.current()
}

#[test]
fn test_scramble_run_end_to_end() {
    let (mut session, mock, recorder, dir) = setup("scramble");
    let plan = SolvePlan::from_instructions(CubeState::solved(), "F1R1S3", true).unwrap();
    session.load_plan(plan).unwrap();
    session.send_program().unwrap();
    assert_eq!(session.state(), SessionState::AwaitingStartAck);

    for line in ["<F1R1S3>", "start", "i_0", "i_2", "i_4", "solved(4.2)"] {
        mock.queue_line(line);
    }
    let record = session
        .listen_until_finished(Duration::from_secs(2))
        .unwrap()
        .expect("run should finish");

    assert_eq!(record.end_reason, EndReason::Scrambled);
    assert_eq!(record.elapsed_secs, Some(4.2));
    assert_eq!(record.total_moves, 3);
    assert_eq!(mock.get_writes(), vec!["<F1R1S3>", "[start]"]);
    assert_eq!(recorder.progress(), vec![(0, 33), (2, 66), (4, 100)]);
    assert_eq!(
        recorder.states(),
        vec![
            SessionState::ConnectedIdle,
            SessionState::AwaitingStartAck,
            SessionState::Working,
            SessionState::ConnectedIdle,
        ]
    );
    assert_eq!(session.cube(), replay(CubeState::solved(), "F1R1S3"));
    assert!(!session.cube().is_solved());

    let log = std::fs::read_to_string(dir.join("data_log_folder").join("robot_log.txt")).unwrap();
    let mut lines = log.lines();
    assert_eq!(lines.next(), Some(LOG_HEADERS.join("\t").as_str()));
    let row = lines.next().unwrap();
    assert!(row.contains("\tF1R1S3\t3\tscrambled\t4.2"));
    assert!(lines.next().is_none());
}

#[test]
fn test_solve_run_restores_the_cube() {
    let (mut session, mock, _recorder, _dir) = setup("solve");
    let scrambled = replay(CubeState::solved(), "R3");

    let plan = plan_solve(
        &scrambled.definition(),
        EntryMethod::Sketch,
        false,
        SolverLimits::default(),
        &FixedSolver("D1 (1f)"),
        &OrientationTranslator::new(),
    )
    .unwrap();
    assert_eq!(plan.instructions.as_str(), "R1");

    session.load_plan(plan).unwrap();
    session.send_program().unwrap();
    for line in ["<R1>", "i_0", "solved(1.5)"] {
        mock.queue_line(line);
    }
    let record = session
        .listen_until_finished(Duration::from_secs(2))
        .unwrap()
        .unwrap();

    assert_eq!(record.end_reason, EndReason::Solved);
    assert_eq!(record.definition, scrambled.definition());
    assert!(session.cube().is_solved());
}

#[test]
fn test_skipped_progress_reports_catch_up() {
    let (mut session, mock, recorder, _dir) = setup("skip");
    let plan = SolvePlan::from_instructions(CubeState::solved(), "F1R1S3F2", false).unwrap();
    session.load_plan(plan).unwrap();
    session.send_program().unwrap();

    for line in ["<F1R1S3F2>", "i_4", "i_2"] {
        mock.queue_line(line);
    }
    while session.poll().unwrap().is_some() {}

    assert_eq!(session.cube(), replay(CubeState::solved(), "F1R1S3"));
    assert_eq!(recorder.progress(), vec![(4, 60), (2, 40)]);
    assert_eq!(session.state(), SessionState::Working);
}

#[test]
fn test_stop_ends_the_run() {
    let (mut session, mock, _recorder, _dir) = setup("stop");
    let plan = SolvePlan::from_instructions(CubeState::solved(), "F1R1", false).unwrap();
    session.load_plan(plan).unwrap();
    session.send_program().unwrap();
    mock.queue_line("<F1R1>");
    session.poll().unwrap();

    session.stop();
    mock.queue_line("stop(0.8)");
    let record = session
        .listen_until_finished(Duration::from_secs(2))
        .unwrap()
        .unwrap();

    assert_eq!(record.end_reason, EndReason::Stopped);
    assert_eq!(session.state(), SessionState::ConnectedIdle);
    assert!(session.context().ledger.is_none());
}

#[test]
fn test_echo_mismatch_allows_resend() {
    let (mut session, mock, _recorder, _dir) = setup("mismatch");
    let plan = SolvePlan::from_instructions(CubeState::solved(), "F1R1", false).unwrap();
    session.load_plan(plan).unwrap();
    session.send_program().unwrap();

    mock.queue_line("<F1R3>");
    session.poll().unwrap();
    assert_eq!(session.state(), SessionState::ConnectedIdle);
    assert!(session.context().sent_frame.is_none());
    assert_eq!(mock.get_writes(), vec!["<F1R1>"]);

    session.send_program().unwrap();
    assert_eq!(session.state(), SessionState::AwaitingStartAck);
    assert_eq!(mock.get_writes(), vec!["<F1R1>", "<F1R1>"]);

    mock.queue_line("<F1R1>");
    assert!(matches!(
        session.poll().unwrap(),
        Some(HandleResult::Started)
    ));
    assert_eq!(session.state(), SessionState::Working);
}

#[test]
fn test_random_scramble_run() {
    let (mut session, mock, _recorder, dir) = setup("random");
    let mut rng = fastrand::Rng::with_seed(2024);
    let plan = SolvePlan::random_scramble(&mut rng, 8);
    let program = plan.instructions.clone();
    session.load_plan(plan).unwrap();
    session.send_program().unwrap();

    mock.queue_line(&format!("<{}>", program.as_str()));
    for token in program.tokens() {
        mock.queue_line(&format!("i_{}", token.position));
    }
    mock.queue_line("solved(9.0)");
    let record = session
        .listen_until_finished(Duration::from_secs(2))
        .unwrap()
        .unwrap();

    assert_eq!(record.entry, EntryMethod::Random);
    assert_eq!(record.end_reason, EndReason::Scrambled);
    assert_eq!(session.cube(), replay(CubeState::solved(), program.as_str()));
    assert!(!session.cube().is_solved());
    let log = std::fs::read_to_string(dir.join("data_log_folder").join("robot_log.txt")).unwrap();
    assert!(log.contains("\trandom\t"));
}

#[test]
fn test_undecodable_payload_stops_listening() {
    let (mut session, mock, _recorder, _dir) = setup("garbage");
    mock.queue_bytes(&[0xff, 0xfe, b'i', b'_']);
    mock.queue_line("conn");

    assert!(matches!(
        session.poll().unwrap(),
        Some(HandleResult::Terminated(_))
    ));
    assert_eq!(session.state(), SessionState::Error);
    assert!(session.poll().unwrap().is_none());
}

#[test]
fn test_settings_report_is_saved() {
    let (mut session, mock, recorder, dir) = setup("settings");
    session.request_settings_report().unwrap();
    assert_eq!(mock.get_writes(), vec!["[settings]"]);

    let reported = RobotSettings::default().to_wire_values().map(|v| v + 1);
    let reported = RobotSettings::from_wire_values(reported);
    mock.queue_line(&format!("current_settings{}", reported.to_wire()));
    assert!(matches!(
        session.poll().unwrap(),
        Some(HandleResult::Settings(s)) if s == reported
    ));

    assert_eq!(*session.settings(), reported);
    let stored = RobotSettings::load_from_file(dir.join("robot_settings.json")).unwrap();
    assert_eq!(stored, reported);
    let report = std::fs::read_to_string(dir.join("robot_settings_report.txt")).unwrap();
    assert!(report.ends_with(&reported.to_wire()));
    assert!(recorder
        .0
        .lock()
        .unwrap()
        .iter()
        .any(|e| matches!(e, CubotEvent::SettingsReceived { .. })));
}

#[test]
fn test_lost_link_disconnects() {
    let (mut session, mock, _recorder, _dir) = setup("lost");
    mock.disconnect();

    assert!(session.poll().unwrap().is_none());
    assert_eq!(session.state(), SessionState::Disconnected);
}
