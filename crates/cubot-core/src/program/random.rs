//! Random cubes and random scramble programs.

use fastrand::Rng;
use tracing::debug;

use super::instructions::{Instruction, RobotInstructions};
use super::solve::{EntryMethod, SolvePlan};
use crate::cube::{CubeState, CubeStore, Direction};

/// Instruction count of a scramble when none is given.
pub const DEFAULT_SCRAMBLE_LENGTH: usize = 20;

fn random_direction(rng: &mut Rng) -> Direction {
    if rng.bool() {
        Direction::Clockwise
    } else {
        Direction::CounterClockwise
    }
}

/// Any instruction except one of kind `previous`, so consecutive flips
/// never need merging and spins never cancel.
fn random_instruction(rng: &mut Rng, previous: Option<char>) -> Instruction {
    loop {
        let instruction = match rng.u8(0..3) {
            0 => Instruction::Flip(rng.u8(1..=3)),
            1 => Instruction::Spin(random_direction(rng)),
            _ => Instruction::Rotate(random_direction(rng)),
        };
        if previous != Some(instruction.letter()) {
            return instruction;
        }
    }
}

fn replay(program: &RobotInstructions) -> CubeState {
    let mut store = CubeStore::new(CubeState::solved());
    store.advance_to(usize::MAX, program);
    store.current()
}

/// A random robot program of `length` instructions (at least one) that
/// leaves a solved cube scrambled.
pub fn random_scramble(rng: &mut Rng, length: usize) -> RobotInstructions {
    let length = length.max(1);
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let mut previous = None;
        let program = RobotInstructions::from_instructions((0..length).map(|_| {
            let instruction = random_instruction(rng, previous);
            previous = Some(instruction.letter());
            instruction
        }));
        if !replay(&program).is_solved() {
            debug!(attempts, program = program.as_str(), "Random scramble");
            return program;
        }
    }
}

/// A random, reachable, unsolved cube.
pub fn random_cube(rng: &mut Rng, length: usize) -> CubeState {
    replay(&random_scramble(rng, length))
}

impl SolvePlan {
    /// A plan that scrambles a solved cube with a random program.
    pub fn random_scramble(rng: &mut Rng, length: usize) -> Self {
        let instructions = random_scramble(rng, length);
        let total_moves = instructions.total_moves();
        Self {
            initial: CubeState::solved(),
            solution: String::new(),
            instructions,
            total_moves,
            scramble: true,
            entry: EntryMethod::Random,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::ProgressLedger;

    #[test]
    fn test_random_cube_is_valid_and_unsolved() {
        let mut rng = Rng::with_seed(7);
        for _ in 0..50 {
            let cube = random_cube(&mut rng, DEFAULT_SCRAMBLE_LENGTH);
            let parsed = CubeState::from_definition(&cube.definition()).unwrap();
            assert_eq!(parsed, cube);
            assert!(!cube.is_solved());
        }
    }

    #[test]
    fn test_single_instruction_scramble_rotates() {
        let mut rng = Rng::with_seed(11);
        for _ in 0..20 {
            let program = random_scramble(&mut rng, 1);
            assert_eq!(program.len(), 1);
            assert!(program.as_str().starts_with('R'));
        }
        assert_eq!(random_scramble(&mut rng, 0).len(), 1);
    }

    #[test]
    fn test_scramble_never_repeats_a_kind() {
        let mut rng = Rng::with_seed(3);
        let program = random_scramble(&mut rng, 200);
        assert_eq!(program.len(), 200);
        for pair in program.tokens().windows(2) {
            assert_ne!(pair[0].instruction.letter(), pair[1].instruction.letter());
        }
        assert_eq!(RobotInstructions::parse(program.as_str()).unwrap(), program);
    }

    #[test]
    fn test_random_scramble_plan() {
        let mut rng = Rng::with_seed(42);
        let plan = SolvePlan::random_scramble(&mut rng, 12);
        assert_eq!(plan.entry, EntryMethod::Random);
        assert!(plan.scramble);
        assert!(plan.has_moves());
        assert!(plan.initial.is_solved());
        assert!(ProgressLedger::build(&plan.instructions, plan.total_moves).is_ok());
    }
}
