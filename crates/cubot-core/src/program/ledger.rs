//! Progress ledger: instruction position to moves still to go.

use std::collections::BTreeMap;

use thiserror::Error;

use super::instructions::RobotInstructions;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Cannot track progress of a program with no moves")]
    NoMoves,
}

/// Remaining-moves table built once per program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLedger {
    total_moves: u32,
    remaining: BTreeMap<usize, i64>,
}

impl ProgressLedger {
    /// Single forward pass: spins and rotations count one move, a flip
    /// token counts its flip number. The value recorded at each token is
    /// what is left once that token has been executed.
    pub fn build(program: &RobotInstructions, total_moves: u32) -> Result<Self, LedgerError> {
        if total_moves == 0 {
            return Err(LedgerError::NoMoves);
        }

        let mut left = i64::from(total_moves);
        let remaining = program
            .tokens()
            .iter()
            .map(|token| {
                left -= i64::from(token.instruction.move_count());
                (token.position, left)
            })
            .collect();

        Ok(Self {
            total_moves,
            remaining,
        })
    }

    pub fn total_moves(&self) -> u32 {
        self.total_moves
    }

    /// Moves left after the instruction at `index`, if `index` is a token.
    pub fn remaining(&self, index: usize) -> Option<i64> {
        self.remaining.get(&index).copied()
    }

    /// `floor(100 * (1 - remaining / total))`, clamped to `0..=100`.
    pub fn percent_complete(&self, index: usize) -> Option<u8> {
        let remaining = self.remaining(index)?;
        let total = i64::from(self.total_moves);
        let done = (total - remaining).clamp(0, total);
        Some((done * 100 / total) as u8)
    }

    /// Position of the final instruction.
    pub fn last_index(&self) -> Option<usize> {
        self.remaining.keys().next_back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, i64)> + '_ {
        self.remaining.iter().map(|(&k, &v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(text: &str, total: u32) -> ProgressLedger {
        ProgressLedger::build(&RobotInstructions::parse(text).unwrap(), total).unwrap()
    }

    #[test]
    fn test_scramble_example() {
        let ledger = ledger("R1S3F2", 4);
        let entries: Vec<(usize, i64)> = ledger.iter().collect();
        assert_eq!(entries, vec![(0, 3), (2, 2), (4, 0)]);
        assert_eq!(ledger.percent_complete(0), Some(25));
        assert_eq!(ledger.percent_complete(2), Some(50));
        assert_eq!(ledger.percent_complete(4), Some(100));
    }

    #[test]
    fn test_values_never_increase() {
        let ledger = ledger("F3R1S1F1R3R3S3F2R1", 14);
        let values: Vec<i64> = ledger.iter().map(|(_, v)| v).collect();
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(values.last(), Some(&0));
        assert_eq!(ledger.last_index(), Some(16));
        assert_eq!(ledger.percent_complete(16), Some(100));
    }

    #[test]
    fn test_percent_floors() {
        let ledger = ledger("R1R1R1", 3);
        assert_eq!(ledger.percent_complete(0), Some(33));
        assert_eq!(ledger.percent_complete(2), Some(66));
    }

    #[test]
    fn test_percent_is_clamped_on_mismatched_total() {
        // total smaller than the program: remaining goes negative
        let ledger = ledger("F3R1", 2);
        assert_eq!(ledger.remaining(2), Some(-2));
        assert_eq!(ledger.percent_complete(2), Some(100));
        assert_eq!(ledger.percent_complete(0), Some(100));
    }

    #[test]
    fn test_unknown_index() {
        let ledger = ledger("R1S3", 2);
        assert_eq!(ledger.percent_complete(1), None);
        assert_eq!(ledger.percent_complete(10), None);
    }

    fn random_program(rng: &mut fastrand::Rng) -> RobotInstructions {
        use crate::cube::Direction;
        use crate::program::Instruction;

        let direction = |rng: &mut fastrand::Rng| {
            if rng.bool() {
                Direction::Clockwise
            } else {
                Direction::CounterClockwise
            }
        };
        let length = rng.usize(1..40);
        RobotInstructions::from_instructions((0..length).map(|_| match rng.u8(0..3) {
            0 => Instruction::Flip(rng.u8(1..=9)),
            1 => Instruction::Spin(direction(rng)),
            _ => Instruction::Rotate(direction(rng)),
        }))
    }

    #[test]
    fn test_random_programs_percent_is_monotonic() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        for _ in 0..500 {
            let program = random_program(&mut rng);
            let exact = program.total_moves();
            // exact total, then totals that disagree with the program
            for total in [exact, rng.u32(1..=exact), exact + rng.u32(1..20)] {
                let ledger = ProgressLedger::build(&program, total).unwrap();
                let percents: Vec<u8> = program
                    .tokens()
                    .iter()
                    .map(|t| ledger.percent_complete(t.position).unwrap())
                    .collect();

                assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{program:?} / {total}");
                assert!(percents.iter().all(|&p| p <= 100));
                if total <= exact {
                    assert_eq!(percents.last(), Some(&100));
                } else {
                    assert!(percents.last().is_some_and(|&p| p < 100));
                }
            }
        }
    }

    #[test]
    fn test_zero_moves_is_refused() {
        let empty = RobotInstructions::parse("").unwrap();
        assert_eq!(
            ProgressLedger::build(&empty, 0).unwrap_err(),
            LedgerError::NoMoves
        );
    }
}
