//! Robot programs: parsing, progress tracking and the solve pipeline.

pub mod instructions;
pub mod ledger;
pub mod random;
pub mod solve;
pub mod translator;

pub use instructions::{Instruction, InstructionError, RobotInstructions, Token};
pub use ledger::{LedgerError, ProgressLedger};
pub use random::{DEFAULT_SCRAMBLE_LENGTH, random_cube, random_scramble};
pub use solve::{
    CubeSolver, EntryMethod, SolveError, SolvePlan, SolverLimits, plan_solve, strip_solution,
};
pub use translator::{MoveTranslator, OrientationTranslator, TranslateError, TranslatedProgram};
