//! Tab separated log of finished robot runs.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::program::{EntryMethod, SolvePlan};

/// Column headers, written once when the log file is created.
pub const LOG_HEADERS: [&str; 8] = [
    "Date",
    "CubeStatusEnteringMethod",
    "CubeStatus",
    "CubeSolution",
    "RobotMoves",
    "TotRobotMoves",
    "EndingReason",
    "RobotTime(s)",
];

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Stopped,
    Solved,
    Scrambled,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::Stopped => write!(f, "stopped"),
            EndReason::Solved => write!(f, "solved"),
            EndReason::Scrambled => write!(f, "scrambled"),
        }
    }
}

/// One finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveRecord {
    pub timestamp: DateTime<Local>,
    pub entry: EntryMethod,
    pub definition: String,
    pub solution: String,
    pub instructions: String,
    pub total_moves: u32,
    pub end_reason: EndReason,
    pub elapsed_secs: Option<f64>,
}

impl SolveRecord {
    pub fn from_plan(plan: &SolvePlan, end_reason: EndReason, elapsed_secs: Option<f64>) -> Self {
        Self {
            timestamp: Local::now(),
            entry: plan.entry,
            definition: plan.initial.definition(),
            solution: plan.solution.clone(),
            instructions: plan.instructions.as_str().to_string(),
            total_moves: plan.total_moves,
            end_reason,
            elapsed_secs,
        }
    }

    /// The log line, without the trailing line break.
    pub fn to_row(&self) -> String {
        let elapsed = self.elapsed_secs.map(|s| s.to_string()).unwrap_or_default();
        [
            self.timestamp.format("%Y%m%d_%H%M%S").to_string(),
            self.entry.to_string(),
            self.definition.clone(),
            self.solution.clone(),
            self.instructions.clone(),
            self.total_moves.to_string(),
            self.end_reason.to_string(),
            elapsed,
        ]
        .join("\t")
    }
}

/// Append-only run log file.
#[derive(Debug, Clone)]
pub struct SolveLog {
    path: PathBuf,
}

impl SolveLog {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record, creating the folder and header row on first use.
    pub fn append(&self, record: &SolveRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let is_new = !self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if is_new {
            info!(path = %self.path.display(), "Created run log");
            writeln!(file, "{}", LOG_HEADERS.join("\t"))?;
        }
        writeln!(file, "{}", record.to_row())?;
        debug!(reason = %record.end_reason, "Run logged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::CubeState;

    fn record(reason: EndReason, elapsed: Option<f64>) -> SolveRecord {
        let plan = SolvePlan::from_instructions(CubeState::solved(), "R1S3F2", false).unwrap();
        SolveRecord::from_plan(&plan, reason, elapsed)
    }

    #[test]
    fn test_row_columns() {
        let row = record(EndReason::Solved, Some(12.5)).to_row();
        let cols: Vec<&str> = row.split('\t').collect();
        assert_eq!(cols.len(), LOG_HEADERS.len());
        assert_eq!(cols[1], "screen sketch");
        assert_eq!(cols[4], "R1S3F2");
        assert_eq!(cols[5], "4");
        assert_eq!(cols[6], "solved");
        assert_eq!(cols[7], "12.5");
    }

    #[test]
    fn test_missing_elapsed_is_empty() {
        let row = record(EndReason::Stopped, None).to_row();
        assert!(row.ends_with("stopped\t"));
    }

    #[test]
    fn test_append_writes_header_once() {
        let dir = std::env::temp_dir().join(format!("cubot-log-{}", std::process::id()));
        let log = SolveLog::new(dir.join("runs.txt"));
        log.append(&record(EndReason::Solved, Some(1.0))).unwrap();
        log.append(&record(EndReason::Scrambled, None)).unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        let _ = fs::remove_dir_all(&dir);
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Date\t"));
        assert!(lines[2].contains("scrambled"));
    }
}
