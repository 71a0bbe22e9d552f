//! Facelet permutations for the robot's primitive moves.
//!
//! Each table gives, for every target slot `i`, the slot the sticker is
//! taken from: `new[i] = old[TABLE[i]]`.

use std::fmt;

use super::facelets::{CubeState, FACELET_COUNT};

/// Whole cube end-over-end rotation about the L-R axis (U goes to F).
pub const FLIP: [usize; FACELET_COUNT] = [
    53, 52, 51, 50, 49, 48, 47, 46, 45, 11, 14, 17, 10, 13, 16, 9, 12, 15, 0, 1, 2, 3, 4, 5, 6, 7,
    8, 18, 19, 20, 21, 22, 23, 24, 25, 26, 42, 39, 36, 43, 40, 37, 44, 41, 38, 35, 34, 33, 32, 31,
    30, 29, 28, 27,
];

/// Whole cube rotation about the vertical axis, clockwise.
pub const SPIN_CW: [usize; FACELET_COUNT] = [
    2, 5, 8, 1, 4, 7, 0, 3, 6, 18, 19, 20, 21, 22, 23, 24, 25, 26, 36, 37, 38, 39, 40, 41, 42, 43,
    44, 33, 30, 27, 34, 31, 28, 35, 32, 29, 45, 46, 47, 48, 49, 50, 51, 52, 53, 9, 10, 11, 12, 13,
    14, 15, 16, 17,
];

/// Whole cube rotation about the vertical axis, counter-clockwise.
pub const SPIN_CCW: [usize; FACELET_COUNT] = [
    6, 3, 0, 7, 4, 1, 8, 5, 2, 45, 46, 47, 48, 49, 50, 51, 52, 53, 9, 10, 11, 12, 13, 14, 15, 16,
    17, 29, 32, 35, 28, 31, 34, 27, 30, 33, 18, 19, 20, 21, 22, 23, 24, 25, 26, 36, 37, 38, 39, 40,
    41, 42, 43, 44,
];

/// Bottom layer rotation, clockwise as seen from D.
pub const ROTATE_CW: [usize; FACELET_COUNT] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 24, 25, 26, 18, 19, 20, 21, 22, 23, 42, 43,
    44, 33, 30, 27, 34, 31, 28, 35, 32, 29, 36, 37, 38, 39, 40, 41, 51, 52, 53, 45, 46, 47, 48, 49,
    50, 15, 16, 17,
];

/// Bottom layer rotation, counter-clockwise as seen from D.
pub const ROTATE_CCW: [usize; FACELET_COUNT] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 51, 52, 53, 18, 19, 20, 21, 22, 23, 15, 16,
    17, 29, 32, 35, 28, 31, 34, 27, 30, 33, 36, 37, 38, 39, 40, 41, 24, 25, 26, 45, 46, 47, 48, 49,
    50, 42, 43, 44,
];

/// Quarter turn direction, encoded on the wire as the number of quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '1' => Some(Direction::Clockwise),
            '3' => Some(Direction::CounterClockwise),
            _ => None,
        }
    }

    pub fn as_digit(self) -> char {
        match self {
            Direction::Clockwise => '1',
            Direction::CounterClockwise => '3',
        }
    }

    pub fn inverse(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}

/// One atomic physical action of the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveMove {
    Flip,
    Spin(Direction),
    Rotate(Direction),
}

impl PrimitiveMove {
    pub const ALL: [PrimitiveMove; 5] = [
        PrimitiveMove::Flip,
        PrimitiveMove::Spin(Direction::Clockwise),
        PrimitiveMove::Spin(Direction::CounterClockwise),
        PrimitiveMove::Rotate(Direction::Clockwise),
        PrimitiveMove::Rotate(Direction::CounterClockwise),
    ];

    /// Moves that change the cube orientation without turning a layer.
    pub const REORIENTING: [PrimitiveMove; 3] = [
        PrimitiveMove::Flip,
        PrimitiveMove::Spin(Direction::Clockwise),
        PrimitiveMove::Spin(Direction::CounterClockwise),
    ];

    pub fn reference(self) -> &'static [usize; FACELET_COUNT] {
        match self {
            PrimitiveMove::Flip => &FLIP,
            PrimitiveMove::Spin(Direction::Clockwise) => &SPIN_CW,
            PrimitiveMove::Spin(Direction::CounterClockwise) => &SPIN_CCW,
            PrimitiveMove::Rotate(Direction::Clockwise) => &ROTATE_CW,
            PrimitiveMove::Rotate(Direction::CounterClockwise) => &ROTATE_CCW,
        }
    }
}

impl fmt::Display for PrimitiveMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveMove::Flip => write!(f, "flip"),
            PrimitiveMove::Spin(d) => write!(f, "spin{}", d.as_digit()),
            PrimitiveMove::Rotate(d) => write!(f, "rotate{}", d.as_digit()),
        }
    }
}

/// Apply one primitive move, returning the new state.
pub fn apply_move(state: &CubeState, mv: PrimitiveMove) -> CubeState {
    let reference = mv.reference();
    let old = state.facelets();
    CubeState::from_facelets(std::array::from_fn(|i| old[reference[i]]))
}
