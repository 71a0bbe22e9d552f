//! Solver manoeuvres to robot instructions.
//!
//! The robot can only turn the bottom layer, so every face turn first
//! re-orients the whole cube to bring that face down.

use std::collections::{HashMap, VecDeque};

use thiserror::Error;
use tracing::debug;

use super::instructions::{Instruction, RobotInstructions};
use crate::cube::{CubeState, Direction, Face, PrimitiveMove, apply_move};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("Unknown face '{found}' at position {position}")]
    UnknownFace { position: usize, found: char },

    #[error("Face '{face}' at position {position} has no turn count")]
    MissingTurns { position: usize, face: char },

    #[error("Invalid turn count '{turns}' for face '{face}' at position {position}")]
    InvalidTurns {
        position: usize,
        face: char,
        turns: char,
    },

    #[error("No re-orientation brings face {0} to the bottom")]
    Unreachable(Face),
}

/// Translator output: the robot program and its primitive move count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedProgram {
    pub instructions: RobotInstructions,
    pub total_moves: u32,
}

/// Turns a stripped solver solution (`U1R2F3`) into a robot program.
pub trait MoveTranslator: Send + Sync {
    fn translate(&self, solution: &str) -> Result<TranslatedProgram, TranslateError>;
}

/// Tracks the cube orientation through the permutation tables and picks
/// the shortest flip/spin sequence before every bottom layer turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrientationTranslator;

impl OrientationTranslator {
    pub fn new() -> Self {
        Self
    }

    /// Breadth first search over whole cube moves until `target` sits on D.
    /// Candidates are expanded in `REORIENTING` order, so ties resolve to the
    /// flip first.
    fn reorient(
        &self,
        orientation: &CubeState,
        target: Face,
    ) -> Result<(CubeState, Vec<PrimitiveMove>), TranslateError> {
        let bottom = Face::D.center_index();
        let mut parents: HashMap<CubeState, (CubeState, PrimitiveMove)> = HashMap::new();
        let mut queue = VecDeque::from([*orientation]);

        while let Some(state) = queue.pop_front() {
            if state.get(bottom) == target {
                let mut path = Vec::new();
                let mut cursor = state;
                while let Some(&(prev, mv)) = parents.get(&cursor) {
                    path.push(mv);
                    cursor = prev;
                }
                path.reverse();
                return Ok((state, path));
            }
            for mv in PrimitiveMove::REORIENTING {
                let next = apply_move(&state, mv);
                if next != *orientation && !parents.contains_key(&next) {
                    parents.insert(next, (state, mv));
                    queue.push_back(next);
                }
            }
        }

        Err(TranslateError::Unreachable(target))
    }
}

impl MoveTranslator for OrientationTranslator {
    fn translate(&self, solution: &str) -> Result<TranslatedProgram, TranslateError> {
        let chars: Vec<char> = solution.chars().collect();
        let mut orientation = CubeState::solved();
        let mut out: Vec<Instruction> = Vec::new();

        let mut position = 0;
        while position < chars.len() {
            let letter = chars[position];
            let face = Face::from_char(letter).ok_or(TranslateError::UnknownFace {
                position,
                found: letter,
            })?;
            let turns = *chars.get(position + 1).ok_or(TranslateError::MissingTurns {
                position,
                face: letter,
            })?;
            let rotation: &[Direction] = match turns {
                '1' => &[Direction::Clockwise],
                '2' => &[Direction::Clockwise, Direction::Clockwise],
                '3' => &[Direction::CounterClockwise],
                _ => {
                    return Err(TranslateError::InvalidTurns {
                        position,
                        face: letter,
                        turns,
                    });
                }
            };

            let (reoriented, path) = self.reorient(&orientation, face)?;
            orientation = reoriented;
            for mv in path {
                push_reorienting(&mut out, mv);
            }
            out.extend(rotation.iter().map(|&d| Instruction::Rotate(d)));

            position += 2;
        }

        let instructions = RobotInstructions::from_instructions(out);
        let total_moves = instructions.total_moves();
        debug!(
            solution,
            instructions = instructions.as_str(),
            total_moves,
            "Solution translated"
        );
        Ok(TranslatedProgram {
            instructions,
            total_moves,
        })
    }
}

fn push_reorienting(out: &mut Vec<Instruction>, mv: PrimitiveMove) {
    match (mv, out.last_mut()) {
        (PrimitiveMove::Flip, Some(Instruction::Flip(n))) if *n < 9 => *n += 1,
        (PrimitiveMove::Flip, _) => out.push(Instruction::Flip(1)),
        (PrimitiveMove::Spin(d), _) => out.push(Instruction::Spin(d)),
        (PrimitiveMove::Rotate(d), _) => out.push(Instruction::Rotate(d)),
    }
}
