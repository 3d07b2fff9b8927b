//! 7-Bag Piece Randomizer
//!
//! Deals pieces in shuffled bags of all seven kinds, so no kind can drought
//! for more than 12 deals. Each player runs their own bag, seeded from the
//! match seed, and the queue always holds enough pieces to show the preview.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::rng::GameRng;

use super::piece::PieceKind;

/// Number of upcoming pieces exposed as the preview.
pub const PREVIEW_SIZE: usize = 5;

/// A seeded 7-bag piece queue.
///
/// Deterministic: the same seed deals the same sequence forever, which is
/// how match participants agree on piece order without it ever crossing the
/// wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bag {
    seed: u64,
    rng: GameRng,
    queue: VecDeque<PieceKind>,
    dealt: u32,
}

impl Bag {
    /// Create a bag from a seed (usually [`derive_bag_seed`] output).
    ///
    /// The seed is used exactly as given; callers that want entropy derive
    /// it upstream.
    ///
    /// [`derive_bag_seed`]: crate::core::rng::derive_bag_seed
    pub fn new(seed: u64) -> Self {
        let mut bag = Self {
            seed,
            rng: GameRng::new(seed),
            queue: VecDeque::new(),
            dealt: 0,
        };
        bag.ensure_queue();
        bag
    }

    /// Restart the queue from a new seed.
    pub fn reset(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = GameRng::new(seed);
        self.queue.clear();
        self.dealt = 0;
        self.ensure_queue();
    }

    /// The seed this bag was created or last reset with.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Deal the next piece and advance the queue.
    pub fn next(&mut self) -> PieceKind {
        self.ensure_queue();

        // ensure_queue guarantees the queue is never empty here
        let piece = self.queue.pop_front().unwrap_or(PieceKind::I);
        self.dealt += 1;
        piece
    }

    /// Upcoming piece at `index` (0 = next) without consuming it.
    pub fn peek(&self, index: usize) -> Option<PieceKind> {
        self.queue.get(index).copied()
    }

    /// The next [`PREVIEW_SIZE`] pieces.
    pub fn preview(&self) -> [PieceKind; PREVIEW_SIZE] {
        // the queue is kept at PREVIEW_SIZE + 1 or longer
        std::array::from_fn(|i| self.queue.get(i).copied().unwrap_or(PieceKind::I))
    }

    /// Total pieces dealt since the last reset.
    #[inline]
    pub fn dealt(&self) -> u32 {
        self.dealt
    }

    /// Shuffle one bag of all seven kinds onto the queue tail.
    fn refill_one(&mut self) {
        let mut bag = PieceKind::ALL;
        self.rng.shuffle(&mut bag);
        self.queue.extend(bag);
    }

    /// Keep enough queued for the preview plus the piece about to deal.
    fn ensure_queue(&mut self) {
        while self.queue.len() < PREVIEW_SIZE + 1 {
            self.refill_one();
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::piece::PIECE_KIND_COUNT;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = Bag::new(99);
        let mut b = Bag::new(99);
        for _ in 0..100 {
            assert_eq!(a.next(), b.next());
        }
    }

    #[test]
    fn test_every_bag_is_a_permutation() {
        let mut bag = Bag::new(1234);
        for _ in 0..20 {
            let mut counts = [0u8; PIECE_KIND_COUNT];
            for _ in 0..PIECE_KIND_COUNT {
                counts[(bag.next() as u8 - 1) as usize] += 1;
            }
            assert_eq!(counts, [1; PIECE_KIND_COUNT]);
        }
    }

    #[test]
    fn test_known_sequence() {
        use PieceKind::*;

        // Pinned output; a change here breaks replay compatibility.
        let mut bag = Bag::new(42);
        assert_eq!(bag.preview(), [Z, L, O, T, I]);

        let dealt: Vec<PieceKind> = (0..14).map(|_| bag.next()).collect();
        assert_eq!(dealt, vec![Z, L, O, T, I, J, S, Z, I, J, O, S, T, L]);
        assert_eq!(bag.dealt(), 14);
    }

    #[test]
    fn test_preview_always_available() {
        let mut bag = Bag::new(5);
        for _ in 0..50 {
            let preview = bag.preview();
            let next = bag.next();
            assert_eq!(preview[0], next);
            assert!(bag.peek(PREVIEW_SIZE - 1).is_some());
        }
    }

    #[test]
    fn test_peek_does_not_consume() {
        let bag = Bag::new(77);
        assert_eq!(bag.peek(0), bag.peek(0));
        assert!(bag.peek(100).is_none());
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut bag = Bag::new(42);
        let first: Vec<PieceKind> = (0..7).map(|_| bag.next()).collect();

        bag.reset(42);
        assert_eq!(bag.dealt(), 0);
        let again: Vec<PieceKind> = (0..7).map(|_| bag.next()).collect();
        assert_eq!(first, again);

        bag.reset(43);
        let different: Vec<PieceKind> = (0..7).map(|_| bag.next()).collect();
        assert_ne!(first, different);
    }
}
