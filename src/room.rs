//! Room Registry
//!
//! Rooms group players for a match and walk a forward-only lifecycle:
//! `Waiting` (accepting joins) to `Playing` to `Finished`, with an explicit
//! reset back to `Waiting` for rematches. Membership is authoritative here;
//! the session registry only mirrors it as an attribute.
//!
//! Invariants the registry maintains by construction:
//! - a room always has at least one member (the last leave destroys it)
//! - the host is always a member; when the host leaves, the earliest
//!   remaining member by join order inherits the role
//! - a player sits in at most one room at a time
//!
//! State changes surface as [`RoomEvent`]s for the caller to drain and
//! translate into notifications.

use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::ids::{PlayerId, RoomId};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Room registry configuration.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Maximum rooms alive at once.
    pub max_rooms: usize,
    /// Default member cap applied to new rooms.
    pub max_players: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_rooms: crate::DEFAULT_MAX_ROOMS,
            max_players: crate::DEFAULT_ROOM_CAPACITY,
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Room registry errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoomError {
    /// The registry already holds the maximum number of rooms.
    #[error("room registry is full")]
    RegistryFull,

    /// The player already sits in a room.
    #[error("player {0} is already in a room")]
    AlreadyInRoom(PlayerId),

    /// No room with this id exists.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// The room is not in the waiting state and cannot accept joins.
    #[error("room {0} is not accepting players")]
    NotAccepting(RoomId),

    /// The room is at its member cap.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The player is not in any room.
    #[error("player {0} is not in a room")]
    NotInRoom(PlayerId),

    /// Only the host may perform this action.
    #[error("player {0} is not the host")]
    NotHost(PlayerId),

    /// A match needs at least two players.
    #[error("not enough players to start")]
    NotEnoughPlayers,
}

// =============================================================================
// TYPES
// =============================================================================

/// Lifecycle state of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MatchState {
    /// Accepting joins; a match can be started.
    Waiting = 0,
    /// A match is in progress.
    Playing = 1,
    /// The match ended; waiting for a reset or for players to leave.
    Finished = 2,
}

/// One room and its members.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    name: String,
    host: PlayerId,
    /// Members in join order; index 0 is the next host if the current
    /// host leaves.
    members: Vec<PlayerId>,
    state: MatchState,
    max_players: usize,
    created_at: Instant,
    started_at: Option<Instant>,
}

impl Room {
    /// Room id.
    #[inline]
    pub fn id(&self) -> RoomId {
        self.id
    }

    /// Display name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current host.
    #[inline]
    pub fn host(&self) -> PlayerId {
        self.host
    }

    /// Members in join order.
    #[inline]
    pub fn members(&self) -> &[PlayerId] {
        &self.members
    }

    /// Lifecycle state.
    #[inline]
    pub fn state(&self) -> MatchState {
        self.state
    }

    /// Member cap.
    #[inline]
    pub fn max_players(&self) -> usize {
        self.max_players
    }

    /// Number of members.
    #[inline]
    pub fn player_count(&self) -> usize {
        self.members.len()
    }

    /// True once the room reached its member cap.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.members.len() >= self.max_players
    }

    /// Whether the player is a member.
    #[inline]
    pub fn contains(&self, player: PlayerId) -> bool {
        self.members.contains(&player)
    }

    /// Moment the room was created.
    #[inline]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Moment the current match started, if one is running or finished.
    #[inline]
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }
}

/// Room state change, drained by the caller after each operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    /// A room came into existence.
    Created { room: RoomId },
    /// A room was destroyed (its last member left).
    Removed { room: RoomId },
    /// A player joined a room.
    PlayerJoined { room: RoomId, player: PlayerId },
    /// A player left a room.
    PlayerLeft { room: RoomId, player: PlayerId },
    /// The match in a room started.
    GameStarted { room: RoomId },
    /// The match in a room finished.
    GameFinished { room: RoomId },
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Registry of live rooms, with a reverse player index.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: BTreeMap<RoomId, Room>,
    player_room: BTreeMap<PlayerId, RoomId>,
    next_room_id: u64,
    config: RoomConfig,
    events: VecDeque<RoomEvent>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: BTreeMap::new(),
            player_room: BTreeMap::new(),
            next_room_id: 1,
            config,
            events: VecDeque::new(),
        }
    }

    /// Create a room with `host` as its first member.
    ///
    /// Room ids are allocated monotonically starting at 1 and never
    /// reused; 0 is the invalid sentinel.
    pub fn create_room(&mut self, name: &str, host: PlayerId) -> Result<RoomId, RoomError> {
        if self.rooms.len() >= self.config.max_rooms {
            return Err(RoomError::RegistryFull);
        }
        if self.player_room.contains_key(&host) {
            return Err(RoomError::AlreadyInRoom(host));
        }

        let id = RoomId(self.next_room_id);
        self.next_room_id += 1;
        self.rooms.insert(
            id,
            Room {
                id,
                name: name.to_string(),
                host,
                members: vec![host],
                state: MatchState::Waiting,
                max_players: self.config.max_players,
                created_at: Instant::now(),
                started_at: None,
            },
        );
        self.player_room.insert(host, id);
        self.events.push_back(RoomEvent::Created { room: id });
        info!("room {} ({:?}) created by player {}", id, name, host);
        Ok(id)
    }

    /// Add a player to a waiting room.
    pub fn join_room(&mut self, room: RoomId, player: PlayerId) -> Result<(), RoomError> {
        if self.player_room.contains_key(&player) {
            return Err(RoomError::AlreadyInRoom(player));
        }
        let entry = self
            .rooms
            .get_mut(&room)
            .ok_or(RoomError::RoomNotFound(room))?;
        if entry.state != MatchState::Waiting {
            return Err(RoomError::NotAccepting(room));
        }
        if entry.is_full() {
            return Err(RoomError::RoomFull(room));
        }

        entry.members.push(player);
        self.player_room.insert(player, room);
        self.events.push_back(RoomEvent::PlayerJoined { room, player });
        debug!("player {} joined room {}", player, room);
        Ok(())
    }

    /// Remove a player from whichever room they sit in.
    ///
    /// If the host leaves, the earliest remaining member by join order
    /// inherits the role. The last member leaving destroys the room
    /// synchronously. Returns the room the player left.
    pub fn leave_room(&mut self, player: PlayerId) -> Result<RoomId, RoomError> {
        let room = self
            .player_room
            .remove(&player)
            .ok_or(RoomError::NotInRoom(player))?;

        let destroy = match self.rooms.get_mut(&room) {
            Some(entry) => {
                entry.members.retain(|&member| member != player);
                if entry.members.is_empty() {
                    true
                } else {
                    if entry.host == player {
                        entry.host = entry.members[0];
                        debug!("player {} is now host of room {}", entry.host, room);
                    }
                    false
                }
            }
            None => false,
        };

        self.events.push_back(RoomEvent::PlayerLeft { room, player });
        debug!("player {} left room {}", player, room);

        if destroy {
            self.rooms.remove(&room);
            self.events.push_back(RoomEvent::Removed { room });
            info!("room {} destroyed", room);
        }
        Ok(room)
    }

    /// Start the match in a room. Only the host may start, the room must
    /// be waiting and hold at least two players.
    pub fn start_game(&mut self, room: RoomId, player: PlayerId) -> Result<(), RoomError> {
        let entry = self
            .rooms
            .get_mut(&room)
            .ok_or(RoomError::RoomNotFound(room))?;
        if entry.host != player {
            return Err(RoomError::NotHost(player));
        }
        if entry.state != MatchState::Waiting {
            return Err(RoomError::NotAccepting(room));
        }
        if entry.members.len() < 2 {
            return Err(RoomError::NotEnoughPlayers);
        }

        entry.state = MatchState::Playing;
        entry.started_at = Some(Instant::now());
        self.events.push_back(RoomEvent::GameStarted { room });
        info!("room {} started a match with {} players", room, entry.members.len());
        Ok(())
    }

    /// End the match in a room. Succeeds for any existing room regardless
    /// of its current state.
    pub fn finish_game(&mut self, room: RoomId) -> Result<(), RoomError> {
        let entry = self
            .rooms
            .get_mut(&room)
            .ok_or(RoomError::RoomNotFound(room))?;
        entry.state = MatchState::Finished;
        self.events.push_back(RoomEvent::GameFinished { room });
        info!("room {} finished its match", room);
        Ok(())
    }

    /// Return a room to the waiting state for a rematch.
    pub fn reset_room(&mut self, room: RoomId) -> Result<(), RoomError> {
        let entry = self
            .rooms
            .get_mut(&room)
            .ok_or(RoomError::RoomNotFound(room))?;
        entry.state = MatchState::Waiting;
        entry.started_at = None;
        debug!("room {} reset to waiting", room);
        Ok(())
    }

    /// Look up a room.
    #[inline]
    pub fn room(&self, room: RoomId) -> Option<&Room> {
        self.rooms.get(&room)
    }

    /// Which room a player sits in, if any.
    #[inline]
    pub fn room_of(&self, player: PlayerId) -> Option<RoomId> {
        self.player_room.get(&player).copied()
    }

    /// Ids of all live rooms.
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().copied().collect()
    }

    /// Ids of rooms currently accepting joins.
    pub fn waiting_room_ids(&self) -> Vec<RoomId> {
        self.rooms
            .values()
            .filter(|room| room.state == MatchState::Waiting)
            .map(|room| room.id)
            .collect()
    }

    /// Number of live rooms.
    #[inline]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Take every event recorded since the last drain, in order.
    pub fn drain_events(&mut self) -> Vec<RoomEvent> {
        self.events.drain(..).collect()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

// =============================================================================
// TESTS
// =============================================================================
