//! Session Registry
//!
//! Tracks every connected player: identity, transport handle, liveness and
//! room membership. The registry is the bridge between the byte-level
//! network layer and game-level state, indexed both ways so a player id or
//! a connection handle resolves in one lookup.
//!
//! Player ids are allocated monotonically starting at 1 and never reused;
//! 0 is reserved as the invalid sentinel. Timeout sweeps are driven
//! externally (the server tick), never by a timer of their own.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::core::ids::{ConnId, PlayerId, RoomId};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Session registry configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// A session whose last heartbeat is strictly older than this is
    /// considered dead on the next sweep.
    pub timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(crate::DEFAULT_SESSION_TIMEOUT_SECS),
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Session registry errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    /// The connection already has a session bound to it.
    #[error("connection {0} already has a session")]
    DuplicateConnection(ConnId),

    /// No session exists for this player.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
}

// =============================================================================
// SESSION
// =============================================================================

/// One connected player.
#[derive(Debug)]
pub struct Session {
    player: PlayerId,
    conn: ConnId,
    room: Option<RoomId>,
    authenticated: bool,
    last_heartbeat: Instant,
    connected_at: Instant,
    inbox: Vec<u8>,
}

impl Session {
    fn new(player: PlayerId, conn: ConnId) -> Self {
        let now = Instant::now();
        Self {
            player,
            conn,
            room: None,
            authenticated: false,
            last_heartbeat: now,
            connected_at: now,
            inbox: Vec::new(),
        }
    }

    /// Player id this session belongs to.
    #[inline]
    pub fn player(&self) -> PlayerId {
        self.player
    }

    /// Transport handle carrying this session.
    #[inline]
    pub fn conn(&self) -> ConnId {
        self.conn
    }

    /// Room the player currently sits in, if any.
    #[inline]
    pub fn room(&self) -> Option<RoomId> {
        self.room
    }

    /// True once the player has completed authentication.
    #[inline]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Moment of the most recent heartbeat.
    #[inline]
    pub fn last_heartbeat(&self) -> Instant {
        self.last_heartbeat
    }

    /// Moment the session was created.
    #[inline]
    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// Bytes received but not yet consumed by the message layer.
    #[inline]
    pub fn inbox(&self) -> &[u8] {
        &self.inbox
    }

    /// Whether the session has been silent for longer than `timeout`.
    ///
    /// Strictly greater than: a session exactly at the limit survives the
    /// sweep and dies on the next one.
    pub fn is_timed_out(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_heartbeat) > timeout
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Registry of live sessions, indexed by player id and by connection.
///
/// Both indices are kept consistent by construction: every mutation goes
/// through methods that update them together.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: BTreeMap<PlayerId, Session>,
    by_conn: BTreeMap<ConnId, PlayerId>,
    next_player_id: u64,
    config: SessionConfig,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: BTreeMap::new(),
            by_conn: BTreeMap::new(),
            next_player_id: 1,
            config,
        }
    }

    /// Bind a fresh player id to a connection.
    ///
    /// Fails if the connection already carries a session; ids are never
    /// reused, even after the session ends.
    pub fn create_session(&mut self, conn: ConnId) -> Result<PlayerId, SessionError> {
        if self.by_conn.contains_key(&conn) {
            return Err(SessionError::DuplicateConnection(conn));
        }
        let player = PlayerId(self.next_player_id);
        self.next_player_id += 1;
        self.sessions.insert(player, Session::new(player, conn));
        self.by_conn.insert(conn, player);
        debug!("session created for player {} on connection {}", player, conn);
        Ok(player)
    }

    /// Remove a session, erasing both indices. Returns the session so the
    /// caller can finish cleanup (room membership, pending bytes).
    pub fn remove_session(&mut self, player: PlayerId) -> Option<Session> {
        let session = self.sessions.remove(&player)?;
        self.by_conn.remove(&session.conn);
        debug!("session removed for player {}", player);
        Some(session)
    }

    /// Remove the session bound to a connection, if any.
    pub fn remove_session_by_conn(&mut self, conn: ConnId) -> Option<Session> {
        let player = self.by_conn.get(&conn).copied()?;
        self.remove_session(player)
    }

    /// Mark a player as authenticated; also counts as a heartbeat.
    pub fn authenticate(&mut self, player: PlayerId) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&player)
            .ok_or(SessionError::UnknownPlayer(player))?;
        session.authenticated = true;
        session.last_heartbeat = Instant::now();
        Ok(())
    }

    /// Refresh a player's heartbeat. Returns false for an unknown player.
    pub fn touch(&mut self, player: PlayerId) -> bool {
        match self.sessions.get_mut(&player) {
            Some(session) => {
                session.last_heartbeat = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Record which room the player sits in. Pure attribute: the room
    /// registry owns membership itself.
    pub fn set_room(&mut self, player: PlayerId, room: Option<RoomId>) -> bool {
        match self.sessions.get_mut(&player) {
            Some(session) => {
                session.room = room;
                true
            }
            None => false,
        }
    }

    /// Append received bytes to a player's inbox.
    pub fn append_inbox(&mut self, player: PlayerId, data: &[u8]) -> bool {
        match self.sessions.get_mut(&player) {
            Some(session) => {
                session.inbox.extend_from_slice(data);
                true
            }
            None => false,
        }
    }

    /// Take everything accumulated in a player's inbox.
    pub fn take_inbox(&mut self, player: PlayerId) -> Option<Vec<u8>> {
        self.sessions
            .get_mut(&player)
            .map(|session| std::mem::take(&mut session.inbox))
    }

    /// Sweep out every session whose heartbeat is strictly older than the
    /// configured timeout.
    ///
    /// `on_timeout` runs for each dead session before it is removed, while
    /// its room membership and connection handle are still readable. The
    /// removed player ids are returned.
    pub fn check_timeouts<F>(&mut self, mut on_timeout: F) -> Vec<PlayerId>
    where
        F: FnMut(PlayerId, &Session),
    {
        let now = Instant::now();
        let timeout = self.config.timeout;
        let expired: Vec<PlayerId> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.is_timed_out(now, timeout))
            .map(|(player, _)| *player)
            .collect();

        for player in &expired {
            if let Some(session) = self.sessions.get(player) {
                on_timeout(*player, session);
            }
            self.remove_session(*player);
        }
        expired
    }

    /// Look up a session by player id.
    #[inline]
    pub fn session(&self, player: PlayerId) -> Option<&Session> {
        self.sessions.get(&player)
    }

    /// Resolve the player bound to a connection.
    #[inline]
    pub fn player_by_conn(&self, conn: ConnId) -> Option<PlayerId> {
        self.by_conn.get(&conn).copied()
    }

    /// Players whose session attribute places them in `room`.
    pub fn players_in_room(&self, room: RoomId) -> Vec<PlayerId> {
        self.sessions
            .values()
            .filter(|session| session.room == Some(room))
            .map(|session| session.player)
            .collect()
    }

    /// Players that have completed authentication.
    pub fn authenticated_players(&self) -> Vec<PlayerId> {
        self.sessions
            .values()
            .filter(|session| session.authenticated)
            .map(|session| session.player)
            .collect()
    }

    /// Number of live sessions.
    #[inline]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Timeout the registry sweeps against.
    #[inline]
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

// =============================================================================
// TESTS
// =============================================================================
