//! Network Layer
//!
//! Non-blocking TCP transport for real-time multiplayer communication.
//! This layer moves opaque bytes - sessions, rooms and game logic live
//! above it and never touch a socket directly.

pub mod buffer;
pub mod reactor;

pub use buffer::SendBuffer;
pub use reactor::{
    Reactor, ReactorConfig, ReactorError, SendError, ServerHandler, ShutdownToken,
};
