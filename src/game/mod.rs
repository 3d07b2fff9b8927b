//! Match Engine Module
//!
//! The deterministic falling-block rules. 100% deterministic: given the same
//! seed and inputs, every module here produces identical results on every
//! platform. Nothing in this module performs I/O or reads the clock; the
//! network layer feeds it and ships its snapshots.
//!
//! ## Module Structure
//!
//! - `board`: playfield grid, row clearing, garbage insertion
//! - `piece`: piece kinds, rotation states, SRS kick data
//! - `bag`: seeded 7-bag piece randomizer with preview

pub mod bag;
pub mod board;
pub mod piece;

// Re-export key types
pub use bag::{Bag, PREVIEW_SIZE};
pub use board::{Board, Cell, BOARD_BUFFER, BOARD_HEIGHT, BOARD_ROWS, BOARD_WIDTH};
pub use piece::{Piece, PieceKind, Rotation};
