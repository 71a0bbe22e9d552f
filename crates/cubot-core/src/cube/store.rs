//! The single mutable cube state followed during a robot run.

use super::facelets::{CubeState, DefinitionError};
use super::permutation::{PrimitiveMove, apply_move};
use crate::program::RobotInstructions;

/// Current cube state plus the position of the last instruction applied.
#[derive(Debug, Clone, Default)]
pub struct CubeStore {
    state: CubeState,
    watermark: Option<usize>,
}

impl CubeStore {
    pub fn new(state: CubeState) -> Self {
        Self {
            state,
            watermark: None,
        }
    }

    /// Replace the state from a definition string and forget progress.
    pub fn reset(&mut self, definition: &str) -> Result<(), DefinitionError> {
        self.reset_to(CubeState::from_definition(definition)?);
        Ok(())
    }

    pub fn reset_to(&mut self, state: CubeState) {
        self.state = state;
        self.watermark = None;
    }

    /// Apply one primitive move and return the resulting snapshot.
    pub fn apply(&mut self, mv: PrimitiveMove) -> CubeState {
        self.state = apply_move(&self.state, mv);
        self.state
    }

    pub fn current(&self) -> CubeState {
        self.state
    }

    /// Position of the last instruction fully applied, if any.
    pub fn watermark(&self) -> Option<usize> {
        self.watermark
    }

    /// Bring the state up to the instruction at `index`.
    ///
    /// Every token after the watermark and up to `index` is applied in
    /// program order, so a skipped report still leaves the cube right. An
    /// index at or before the watermark applies nothing. Returns the number
    /// of instructions applied.
    pub fn advance_to(&mut self, index: usize, program: &RobotInstructions) -> usize {
        let mut applied = 0;
        for token in program.tokens() {
            if token.position > index {
                break;
            }
            if self.watermark.is_some_and(|w| token.position <= w) {
                continue;
            }
            for mv in token.instruction.primitives() {
                self.apply(mv);
            }
            self.watermark = Some(token.position);
            applied += 1;
        }
        applied
    }
}
