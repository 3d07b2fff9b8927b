//! Deterministic Random Number Generator
//!
//! Xorshift128+ PRNG used by the match engine (piece bags, garbage hole
//! columns). Given the same seed it produces the identical sequence on every
//! platform, which is what lets every participant of a match agree on the
//! piece queue without ever sending it over the wire.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::ids::{PlayerId, RoomId};

/// Deterministic PRNG using the Xorshift128+ algorithm.
///
/// # Determinism Guarantee
///
/// Given the same seed, this RNG produces the exact same sequence of values
/// on any platform.
///
/// # Example
///
/// ```
/// use quadfall::core::rng::GameRng;
///
/// let mut rng = GameRng::new(12345);
/// let value = rng.next_u64();
/// assert_eq!(value, 6233086606872742541); // Always the same!
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameRng {
    state: [u64; 2],
}

impl Default for GameRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl GameRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring good
    /// distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Ensure state is never all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random integer in range [0, max).
    ///
    /// Simple modulo; the bias is negligible for the small ranges the match
    /// engine draws from (bag indices, board columns).
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as u32
    }

    /// Shuffle a slice in place using the Fisher-Yates algorithm.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        let len = slice.len();
        for i in (1..len).rev() {
            let j = self.next_int((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }

    /// Get current state (for checkpointing/debugging).
    pub fn state(&self) -> [u64; 2] {
        self.state
    }

    /// Restore from saved state.
    pub fn set_state(&mut self, state: [u64; 2]) {
        self.state = state;
    }
}

/// SplitMix64 for seed initialization.
/// Produces well-distributed values from sequential seeds.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive the shared seed for one match.
///
/// Hashes the room, a per-start nonce and the member list (in join order,
/// which the server is authoritative for) so that every start of every room
/// yields one agreed-upon seed that no single player chose.
pub fn derive_match_seed(room: RoomId, start_nonce: u64, players: &[PlayerId]) -> u64 {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"QUADFALL_SEED_V1");

    hasher.update(room.0.to_le_bytes());
    hasher.update(start_nonce.to_le_bytes());
    for pid in players {
        hasher.update(pid.0.to_le_bytes());
    }

    let hash = hasher.finalize();

    // Take first 8 bytes as seed
    u64::from_le_bytes(hash[0..8].try_into().unwrap_or_default())
}

/// Derive a per-player bag seed from the match seed.
///
/// Each player runs their own piece bag; separating the domains keeps one
/// player's queue from leaking information about another's.
pub fn derive_bag_seed(match_seed: u64, player: PlayerId) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(b"QUADFALL_BAG_V1");
    hasher.update(match_seed.to_le_bytes());
    hasher.update(player.0.to_le_bytes());

    let hash = hasher.finalize();
    u64::from_le_bytes(hash[0..8].try_into().unwrap_or_default())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        // Same seed must produce same sequence
        let mut rng1 = GameRng::new(12345);
        let mut rng2 = GameRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = GameRng::new(12345);
        let mut rng2 = GameRng::new(54321);

        // Very unlikely to match
        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_rng_known_values() {
        // Verify specific output for regression testing
        let mut rng = GameRng::new(42);
        let val1 = rng.next_u64();
        let val2 = rng.next_u64();
        let val3 = rng.next_u64();

        // These values must never change!
        // If they do, existing match replays will break.
        assert_eq!(val1, 16629283624882167704);
        assert_eq!(val2, 1420492921613871959);
        assert_eq!(val3, 9768315062676884790);
    }

    #[test]
    fn test_next_int() {
        let mut rng = GameRng::new(1234);

        for _ in 0..1000 {
            let val = rng.next_int(100);
            assert!(val < 100);
        }

        // Edge case: max = 0
        assert_eq!(rng.next_int(0), 0);

        // Edge case: max = 1
        assert_eq!(rng.next_int(1), 0);
    }

    #[test]
    fn test_shuffle_determinism() {
        let mut rng1 = GameRng::new(1111);
        let mut rng2 = GameRng::new(1111);

        let mut arr1 = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let mut arr2 = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

        rng1.shuffle(&mut arr1);
        rng2.shuffle(&mut arr2);

        assert_eq!(arr1, arr2);
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = GameRng::new(2222);
        let mut arr = [1, 2, 3, 4, 5, 6, 7];
        rng.shuffle(&mut arr);

        let mut sorted = arr;
        sorted.sort_unstable();
        assert_eq!(sorted, [1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_derive_match_seed() {
        let players = [PlayerId(1), PlayerId(2)];

        let seed1 = derive_match_seed(RoomId(1), 7, &players);
        let seed2 = derive_match_seed(RoomId(1), 7, &players);

        // Same inputs = same seed
        assert_eq!(seed1, seed2);

        // Different nonce = different seed
        let seed3 = derive_match_seed(RoomId(1), 8, &players);
        assert_ne!(seed1, seed3);

        // Different room = different seed
        let seed4 = derive_match_seed(RoomId(2), 7, &players);
        assert_ne!(seed1, seed4);
    }

    #[test]
    fn test_derive_bag_seed_separates_players() {
        let match_seed = derive_match_seed(RoomId(3), 1, &[PlayerId(1), PlayerId(2)]);

        let bag1 = derive_bag_seed(match_seed, PlayerId(1));
        let bag2 = derive_bag_seed(match_seed, PlayerId(2));

        assert_ne!(bag1, bag2);
        assert_eq!(bag1, derive_bag_seed(match_seed, PlayerId(1)));
    }

    #[test]
    fn test_state_checkpoint() {
        let mut rng = GameRng::new(5555);

        // Advance some
        for _ in 0..50 {
            rng.next_u64();
        }

        // Save state
        let saved_state = rng.state();

        // Advance more
        let next_values: Vec<u64> = (0..10).map(|_| rng.next_u64()).collect();

        // Restore state
        rng.set_state(saved_state);

        // Should produce same values again
        for expected in next_values {
            assert_eq!(rng.next_u64(), expected);
        }
    }
}
