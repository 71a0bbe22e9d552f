//! Cube model: facelets, permutation engine and the state store.

pub mod facelets;
pub mod permutation;
pub mod store;

pub use facelets::{
    CubeState, DefinitionError, FACELET_COUNT, FACELETS_PER_FACE, Face, SOLVED_DEFINITION,
};
pub use permutation::{Direction, PrimitiveMove, apply_move};
pub use store::CubeStore;
