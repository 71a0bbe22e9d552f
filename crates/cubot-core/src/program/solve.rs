//! Solve pipeline: definition, solver, translator, plan.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::instructions::{InstructionError, RobotInstructions};
use super::translator::{MoveTranslator, TranslateError};
use crate::cube::{CubeState, DefinitionError};
use crate::protocol::frame_program;

#[derive(Error, Debug)]
pub enum SolveError {
    #[error("Invalid cube definition: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Solver failed: {0}")]
    Solver(String),

    #[error("Cannot translate solution: {0}")]
    Translate(#[from] TranslateError),

    #[error("Invalid robot instructions: {0}")]
    Instructions(#[from] InstructionError),
}

/// An external two-phase solver.
///
/// Returns the manoeuvre string with its metadata suffix, e.g.
/// `"U1 R2 F3 (3f)"`, or a string containing `Error` on failure.
pub trait CubeSolver: Send + Sync {
    fn solve(&self, definition: &str, max_length: u32, timeout_secs: u32) -> String;
}

/// Search limits handed to the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverLimits {
    pub max_length: u32,
    pub timeout_secs: u32,
}

impl Default for SolverLimits {
    fn default() -> Self {
        Self {
            max_length: 18,
            timeout_secs: 2,
        }
    }
}

/// How the cube state was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryMethod {
    #[default]
    Sketch,
    Webcam,
    Robot,
    Random,
}

impl fmt::Display for EntryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryMethod::Sketch => write!(f, "screen sketch"),
            EntryMethod::Webcam => write!(f, "webcam"),
            EntryMethod::Robot => write!(f, "robot"),
            EntryMethod::Random => write!(f, "random"),
        }
    }
}

/// Drop the parenthesised metadata and all whitespace from a solver answer.
pub fn strip_solution(raw: &str) -> String {
    let body = raw.split('(').next().unwrap_or_default();
    body.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Everything needed to run one program on the robot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolvePlan {
    pub initial: CubeState,
    /// Stripped solver solution.
    pub solution: String,
    pub instructions: RobotInstructions,
    pub total_moves: u32,
    /// The run scrambles rather than solves.
    pub scramble: bool,
    pub entry: EntryMethod,
}

impl SolvePlan {
    /// A plan for a hand written robot program.
    pub fn from_instructions(
        initial: CubeState,
        text: &str,
        scramble: bool,
    ) -> Result<Self, SolveError> {
        let instructions = RobotInstructions::parse(text)?;
        let total_moves = instructions.total_moves();
        Ok(Self {
            initial,
            solution: String::new(),
            instructions,
            total_moves,
            scramble,
            entry: EntryMethod::Sketch,
        })
    }

    pub fn has_moves(&self) -> bool {
        self.total_moves > 0
    }

    /// The program as it goes on the wire.
    pub fn framed(&self) -> String {
        frame_program(self.instructions.as_str())
    }
}

/// Validate the definition, ask the solver and translate its answer.
#[instrument(skip(solver, translator))]
pub fn plan_solve(
    definition: &str,
    entry: EntryMethod,
    scramble: bool,
    limits: SolverLimits,
    solver: &dyn CubeSolver,
    translator: &dyn MoveTranslator,
) -> Result<SolvePlan, SolveError> {
    let initial = CubeState::from_definition(definition)?;
    let definition = initial.definition();

    let raw = solver.solve(&definition, limits.max_length, limits.timeout_secs);
    if raw.contains("Error") {
        warn!(answer = %raw.trim(), "Solver returned an error");
        return Err(SolveError::Solver(raw.trim().to_string()));
    }

    let solution = strip_solution(&raw);
    let translated = translator.translate(&solution)?;
    info!(
        solution = %solution,
        instructions = translated.instructions.as_str(),
        total_moves = translated.total_moves,
        "Solve planned"
    );

    Ok(SolvePlan {
        initial,
        solution,
        instructions: translated.instructions,
        total_moves: translated.total_moves,
        scramble,
        entry,
    })
}
