//! Robot instruction strings.
//!
//! A program is a run of two character tokens: `F<n>` flips the cube `n`
//! times, `S<d>` spins it and `R<d>` rotates the bottom layer, where `d` is
//! `1` (clockwise) or `3` (counter-clockwise).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::cube::{Direction, PrimitiveMove};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstructionError {
    #[error("Unexpected character '{found}' at position {position}")]
    UnexpectedChar { position: usize, found: char },

    #[error("Instruction '{letter}' at position {position} has no argument")]
    MissingArgument { position: usize, letter: char },

    #[error("Invalid argument '{argument}' for instruction '{letter}' at position {position}")]
    InvalidArgument {
        position: usize,
        letter: char,
        argument: char,
    },
}

/// One robot instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// Flip the cube this many times in a row.
    Flip(u8),
    Spin(Direction),
    Rotate(Direction),
}

impl Instruction {
    pub fn letter(&self) -> char {
        match self {
            Instruction::Flip(_) => 'F',
            Instruction::Spin(_) => 'S',
            Instruction::Rotate(_) => 'R',
        }
    }

    pub fn argument(&self) -> char {
        match self {
            Instruction::Flip(n) => char::from(b'0' + n),
            Instruction::Spin(d) | Instruction::Rotate(d) => d.as_digit(),
        }
    }

    /// Number of primitive robot moves this instruction stands for.
    pub fn move_count(&self) -> u32 {
        match self {
            Instruction::Flip(n) => u32::from(*n),
            Instruction::Spin(_) | Instruction::Rotate(_) => 1,
        }
    }

    /// The primitive moves, in execution order.
    pub fn primitives(&self) -> impl Iterator<Item = PrimitiveMove> {
        let (mv, count) = match *self {
            Instruction::Flip(n) => (PrimitiveMove::Flip, usize::from(n)),
            Instruction::Spin(d) => (PrimitiveMove::Spin(d), 1),
            Instruction::Rotate(d) => (PrimitiveMove::Rotate(d), 1),
        };
        std::iter::repeat_n(mv, count)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter(), self.argument())
    }
}

/// An instruction and the character position of its letter in the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub position: usize,
    pub instruction: Instruction,
}

/// A parsed robot program, keeping the exact text that goes on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotInstructions {
    text: String,
    tokens: Vec<Token>,
}

impl RobotInstructions {
    pub fn parse(text: &str) -> Result<Self, InstructionError> {
        let chars: Vec<char> = text.chars().collect();
        let mut tokens = Vec::with_capacity(chars.len() / 2);
        let mut position = 0;

        while position < chars.len() {
            let letter = chars[position];
            if !matches!(letter, 'F' | 'S' | 'R') {
                return Err(InstructionError::UnexpectedChar {
                    position,
                    found: letter,
                });
            }
            let argument = *chars
                .get(position + 1)
                .ok_or(InstructionError::MissingArgument { position, letter })?;
            let invalid = InstructionError::InvalidArgument {
                position,
                letter,
                argument,
            };

            let instruction = match letter {
                'F' => match argument.to_digit(10) {
                    Some(n @ 1..=9) => Instruction::Flip(n as u8),
                    _ => return Err(invalid),
                },
                'S' => Instruction::Spin(Direction::from_digit(argument).ok_or(invalid)?),
                _ => Instruction::Rotate(Direction::from_digit(argument).ok_or(invalid)?),
            };
            tokens.push(Token {
                position,
                instruction,
            });
            position += 2;
        }

        Ok(Self {
            text: text.to_string(),
            tokens,
        })
    }

    /// Build a program from instructions, rendering its wire text.
    pub fn from_instructions<I: IntoIterator<Item = Instruction>>(instructions: I) -> Self {
        let mut text = String::new();
        let mut tokens = Vec::new();
        for instruction in instructions {
            tokens.push(Token {
                position: text.len(),
                instruction,
            });
            text.push(instruction.letter());
            text.push(instruction.argument());
        }
        Self { text, tokens }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// The token whose letter sits exactly at `position`.
    pub fn token_at(&self, position: usize) -> Option<&Token> {
        self.tokens
            .binary_search_by_key(&position, |t| t.position)
            .ok()
            .map(|i| &self.tokens[i])
    }

    /// Sum of primitive moves across all tokens.
    pub fn total_moves(&self) -> u32 {
        self.tokens.iter().map(|t| t.instruction.move_count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

impl FromStr for RobotInstructions {
    type Err = InstructionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RobotInstructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tokens_and_positions() {
        let program = RobotInstructions::parse("R1S3F2").unwrap();
        let positions: Vec<usize> = program.tokens().iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 2, 4]);
        assert_eq!(
            program.tokens()[2].instruction,
            Instruction::Flip(2)
        );
        assert_eq!(program.total_moves(), 4);
        assert_eq!(program.as_str(), "R1S3F2");
    }

    #[test]
    fn test_token_at() {
        let program = RobotInstructions::parse("F1R3").unwrap();
        assert_eq!(
            program.token_at(2).map(|t| t.instruction),
            Some(Instruction::Rotate(Direction::CounterClockwise))
        );
        assert!(program.token_at(1).is_none());
        assert!(program.token_at(4).is_none());
    }

    #[test]
    fn test_rejects_bad_direction() {
        let err = RobotInstructions::parse("S2").unwrap_err();
        assert_eq!(
            err,
            InstructionError::InvalidArgument {
                position: 0,
                letter: 'S',
                argument: '2'
            }
        );
    }

    #[test]
    fn test_rejects_zero_flips_and_trailing_letter() {
        assert!(RobotInstructions::parse("F0").is_err());
        assert_eq!(
            RobotInstructions::parse("R1F").unwrap_err(),
            InstructionError::MissingArgument {
                position: 2,
                letter: 'F'
            }
        );
    }

    #[test]
    fn test_rejects_foreign_characters() {
        assert_eq!(
            RobotInstructions::parse("R1 S3").unwrap_err(),
            InstructionError::UnexpectedChar {
                position: 2,
                found: ' '
            }
        );
    }

    #[test]
    fn test_from_instructions_renders_text() {
        let program = RobotInstructions::from_instructions([
            Instruction::Flip(3),
            Instruction::Rotate(Direction::Clockwise),
        ]);
        assert_eq!(program.as_str(), "F3R1");
        assert_eq!(program, RobotInstructions::parse("F3R1").unwrap());
    }

    #[test]
    fn test_flip_primitives_repeat() {
        let moves: Vec<PrimitiveMove> = Instruction::Flip(3).primitives().collect();
        assert_eq!(moves, vec![PrimitiveMove::Flip; 3]);
    }
}
