//! Core deterministic primitives.
//!
//! Identity newtypes shared by every layer, plus the seeded PRNG the match
//! engine draws from. Nothing in this module touches the network or the
//! system clock.

pub mod ids;
pub mod rng;

// Re-export core types
pub use ids::{ConnId, PlayerId, RoomId};
pub use rng::{derive_bag_seed, derive_match_seed, GameRng};
