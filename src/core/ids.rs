//! Identity Newtypes
//!
//! Monotonic identities shared by the registries and the network layer.
//! All counters are 64-bit, assigned from 1, and never reused for the
//! lifetime of the process; 0 is reserved as the invalid sentinel and is
//! never allocated.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a player session.
///
/// Allocated by the session registry, starting at 1. A `PlayerId` is never
/// recycled after its session is removed, so a stale id can never alias a
/// newer player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl PlayerId {
    /// Reserved invalid sentinel; never allocated.
    pub const INVALID: PlayerId = PlayerId(0);

    /// True for every allocated id, false only for [`PlayerId::INVALID`].
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a room.
///
/// Allocated by the room registry, starting at 1, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub u64);

impl RoomId {
    /// Reserved invalid sentinel; never allocated.
    pub const INVALID: RoomId = RoomId(0);

    /// True for every allocated id.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle for an accepted connection.
///
/// Unlike a raw file descriptor, a `ConnId` is generation-safe: the reactor
/// allocates them monotonically and never reuses one, so a handle held after
/// its connection closed can only miss, never hit a different peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_sentinels() {
        assert!(!PlayerId::INVALID.is_valid());
        assert!(!RoomId::INVALID.is_valid());
        assert!(PlayerId(1).is_valid());
        assert!(RoomId(1).is_valid());
    }

    #[test]
    fn test_display_is_bare_number() {
        assert_eq!(PlayerId(42).to_string(), "42");
        assert_eq!(RoomId(7).to_string(), "7");
        assert_eq!(ConnId(3).to_string(), "3");
    }

    #[test]
    fn test_ordering_follows_allocation() {
        assert!(PlayerId(1) < PlayerId(2));
        assert!(ConnId(9) < ConnId(10));
    }
}
