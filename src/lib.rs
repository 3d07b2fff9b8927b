//! # Quadfall Game Server
//!
//! Authoritative multiplayer server core for Quadfall, a falling-block
//! stacking game played over raw TCP.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    QUADFALL SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Shared primitives                         │
//! │  ├── ids.rs      - Player, room and connection handles       │
//! │  └── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │                                                              │
//! │  game/           - Game rules (deterministic)                │
//! │  ├── board.rs    - Playfield grid, line clears, garbage      │
//! │  ├── piece.rs    - Piece shapes, rotation and wall kicks     │
//! │  └── bag.rs      - Seeded 7-bag piece dealer                 │
//! │                                                              │
//! │  network/        - Transport (non-deterministic)             │
//! │  ├── reactor.rs  - Edge-triggered TCP readiness loop         │
//! │  └── buffer.rs   - Offset-tracking outbound byte queue       │
//! │                                                              │
//! │  session.rs      - Player liveness and identity registry     │
//! │  room.rs         - Room lifecycle and membership             │
//! │  server.rs       - Orchestrator wiring transport to state    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Threading Model
//!
//! The whole server is **single-threaded**: one reactor loop multiplexes
//! every socket, and every callback runs between readiness waits. Nothing
//! in this crate takes a lock. Timers piggyback on the readiness wait's
//! timeout, so a quiet server still ticks.
//!
//! The `game/` module is fully deterministic: no I/O, no clock reads, all
//! randomness from the seeded Xorshift128+ generator. Given the same
//! seed, every piece sequence replays identically on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod room;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use core::ids::{ConnId, PlayerId, RoomId};
pub use game::bag::Bag;
pub use game::board::Board;
pub use game::piece::{Piece, PieceKind, Rotation};
pub use network::{Reactor, ReactorConfig, ServerHandler, ShutdownToken};
pub use room::{MatchState, RoomConfig, RoomError, RoomRegistry};
pub use server::GameServer;
pub use session::{SessionConfig, SessionRegistry};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default TCP port the server listens on
pub const DEFAULT_PORT: u16 = 10000;

/// Default cap on concurrent connections; doubles as the listen backlog
pub const DEFAULT_MAX_CONNECTIONS: usize = 128;

/// Default session timeout in seconds
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 30;

/// Default cap on concurrently live rooms
pub const DEFAULT_MAX_ROOMS: usize = 100;

/// Default member cap per room
pub const DEFAULT_ROOM_CAPACITY: usize = 32;
