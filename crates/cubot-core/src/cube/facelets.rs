//! Facelet level cube representation.
//!
//! A cube is 54 stickers, six faces of nine, addressed as
//! `face * 9 + row * 3 + col` with faces ordered U, R, F, D, L, B.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Number of stickers on a 3x3x3 cube.
pub const FACELET_COUNT: usize = 54;
/// Stickers per face.
pub const FACELETS_PER_FACE: usize = 9;

/// Definition string of a solved cube.
pub const SOLVED_DEFINITION: &str =
    "UUUUUUUUURRRRRRRRRFFFFFFFFFDDDDDDDDDLLLLLLLLLBBBBBBBBB";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Definition has {actual} facelets, expected 54")]
    WrongLength { actual: usize },

    #[error("Unknown facelet label '{label}' at position {position}")]
    UnknownLabel { position: usize, label: char },

    #[error("Face {face} appears {count} times, expected 9")]
    WrongCount { face: Face, count: usize },
}

/// Face label, also used as the sticker colour identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Face {
    U,
    R,
    F,
    D,
    L,
    B,
}

impl Face {
    /// Faces in definition string order.
    pub const ALL: [Face; 6] = [Face::U, Face::R, Face::F, Face::D, Face::L, Face::B];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'U' => Some(Face::U),
            'R' => Some(Face::R),
            'F' => Some(Face::F),
            'D' => Some(Face::D),
            'L' => Some(Face::L),
            'B' => Some(Face::B),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Face::U => 'U',
            Face::R => 'R',
            Face::F => 'F',
            Face::D => 'D',
            Face::L => 'L',
            Face::B => 'B',
        }
    }

    /// Index of this face's centre sticker.
    pub fn center_index(self) -> usize {
        self.index() * FACELETS_PER_FACE + 4
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// The 54 sticker state of a cube.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CubeState {
    facelets: [Face; FACELET_COUNT],
}

impl CubeState {
    /// A cube with every face uniform.
    pub fn solved() -> Self {
        Self {
            facelets: std::array::from_fn(|i| Face::ALL[i / FACELETS_PER_FACE]),
        }
    }

    /// Wrap raw facelets without checking label counts.
    ///
    /// Permutations of a valid state stay valid, so the engine uses this
    /// constructor internally.
    pub fn from_facelets(facelets: [Face; FACELET_COUNT]) -> Self {
        Self { facelets }
    }

    /// Parse and validate a 54 character definition string.
    ///
    /// Surrounding whitespace (including the trailing line break some
    /// sources append) is ignored.
    pub fn from_definition(definition: &str) -> Result<Self, DefinitionError> {
        let definition = definition.trim();
        let actual = definition.chars().count();
        if actual != FACELET_COUNT {
            return Err(DefinitionError::WrongLength { actual });
        }

        let mut facelets = [Face::U; FACELET_COUNT];
        for (position, label) in definition.chars().enumerate() {
            facelets[position] =
                Face::from_char(label).ok_or(DefinitionError::UnknownLabel { position, label })?;
        }

        let state = Self { facelets };
        for face in Face::ALL {
            let count = state.label_counts()[face.index()];
            if count != FACELETS_PER_FACE {
                return Err(DefinitionError::WrongCount { face, count });
            }
        }
        Ok(state)
    }

    pub fn facelets(&self) -> &[Face; FACELET_COUNT] {
        &self.facelets
    }

    pub fn get(&self, index: usize) -> Face {
        self.facelets[index]
    }

    /// The nine stickers of one face, raster order.
    pub fn face(&self, face: Face) -> &[Face] {
        let start = face.index() * FACELETS_PER_FACE;
        &self.facelets[start..start + FACELETS_PER_FACE]
    }

    /// How many stickers carry each label, indexed by `Face::index`.
    pub fn label_counts(&self) -> [usize; 6] {
        let mut counts = [0; 6];
        for face in self.facelets {
            counts[face.index()] += 1;
        }
        counts
    }

    /// True when every face shows a single label, in any orientation.
    pub fn is_solved(&self) -> bool {
        Face::ALL.iter().all(|&face| {
            let stickers = self.face(face);
            stickers.iter().all(|&s| s == stickers[4])
        })
    }

    /// Render back to the 54 character definition string.
    pub fn definition(&self) -> String {
        self.facelets.iter().map(|f| f.as_char()).collect()
    }
}

impl Default for CubeState {
    fn default() -> Self {
        Self::solved()
    }
}

impl FromStr for CubeState {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_definition(s)
    }
}

impl fmt::Display for CubeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.definition())
    }
}

impl fmt::Debug for CubeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CubeState({})", self.definition())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solved_definition() {
        let cube = CubeState::solved();
        assert_eq!(cube.definition(), SOLVED_DEFINITION);
        assert!(cube.is_solved());
        assert_eq!(cube.label_counts(), [9; 6]);
    }

    #[test]
    fn test_parse_trims_line_break() {
        let cube = CubeState::from_definition(&format!("{}\n", SOLVED_DEFINITION)).unwrap();
        assert_eq!(cube, CubeState::solved());
    }

    #[test]
    fn test_index_layout() {
        let cube = CubeState::solved();
        for face in Face::ALL {
            assert_eq!(cube.get(face.center_index()), face);
        }
        assert_eq!(Face::D.center_index(), 31);
        assert_eq!(cube.face(Face::L), &[Face::L; 9]);
    }

    #[test]
    fn test_rejects_short_definition() {
        let err = CubeState::from_definition("UUUU").unwrap_err();
        assert_eq!(err, DefinitionError::WrongLength { actual: 4 });
    }

    #[test]
    fn test_rejects_unknown_label() {
        let mut def = SOLVED_DEFINITION.to_string();
        def.replace_range(10..11, "X");
        let err = CubeState::from_definition(&def).unwrap_err();
        assert_eq!(
            err,
            DefinitionError::UnknownLabel {
                position: 10,
                label: 'X'
            }
        );
    }

    #[test]
    fn test_rejects_unbalanced_labels() {
        let mut def = SOLVED_DEFINITION.to_string();
        def.replace_range(0..1, "R");
        let err = CubeState::from_definition(&def).unwrap_err();
        assert_eq!(
            err,
            DefinitionError::WrongCount {
                face: Face::U,
                count: 8
            }
        );
    }

    #[test]
    fn test_scrambled_is_not_solved() {
        let mut def = SOLVED_DEFINITION.to_string();
        // swap one U sticker with one R sticker
        def.replace_range(0..1, "R");
        def.replace_range(9..10, "U");
        let cube: CubeState = def.parse().unwrap();
        assert!(!cube.is_solved());
        assert_eq!(cube.to_string(), def);
    }
}
