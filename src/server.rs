//! Game Server Orchestrator
//!
//! Binds the transport to game state: reactor callbacks land here and are
//! translated into session and room operations. The orchestrator owns both
//! registries and keeps them consistent with each other and with the set
//! of live connections.
//!
//! Everything runs on the reactor thread; there is no locking anywhere in
//! this layer.

use tracing::{debug, info, trace, warn};

use crate::core::ids::{ConnId, PlayerId, RoomId};
use crate::network::{Reactor, SendError, ServerHandler};
use crate::room::{RoomConfig, RoomError, RoomRegistry};
use crate::session::{SessionConfig, SessionRegistry};

// =============================================================================
// ERRORS
// =============================================================================

/// Errors surfaced when pushing bytes toward a player.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The player has no live session.
    #[error("no session for player {0}")]
    NoSession(PlayerId),

    /// The transport refused the bytes.
    #[error(transparent)]
    Send(#[from] SendError),
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

/// The server's game-side state: sessions and rooms, driven by reactor
/// callbacks and by the embedding layer's explicit calls.
pub struct GameServer {
    sessions: SessionRegistry,
    rooms: RoomRegistry,
}

impl GameServer {
    /// Create an orchestrator with the given registry configurations.
    pub fn new(sessions: SessionConfig, rooms: RoomConfig) -> Self {
        Self {
            sessions: SessionRegistry::new(sessions),
            rooms: RoomRegistry::new(rooms),
        }
    }

    /// Session registry, read-only.
    #[inline]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Room registry, read-only.
    #[inline]
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    // =========================================================================
    // ROOM OPERATIONS
    // =========================================================================
    //
    // Thin wrappers over the room registry that keep the session-side room
    // attribute in sync and drain the resulting events.

    /// Create a room hosted by `host`.
    pub fn create_room(&mut self, name: &str, host: PlayerId) -> Result<RoomId, RoomError> {
        let room = self.rooms.create_room(name, host)?;
        self.sessions.set_room(host, Some(room));
        self.dispatch_room_events();
        Ok(room)
    }

    /// Add a player to a waiting room.
    pub fn join_room(&mut self, room: RoomId, player: PlayerId) -> Result<(), RoomError> {
        self.rooms.join_room(room, player)?;
        self.sessions.set_room(player, Some(room));
        self.dispatch_room_events();
        Ok(())
    }

    /// Remove a player from their room. Returns the room they left.
    pub fn leave_room(&mut self, player: PlayerId) -> Result<RoomId, RoomError> {
        let room = self.rooms.leave_room(player)?;
        self.sessions.set_room(player, None);
        self.dispatch_room_events();
        Ok(room)
    }

    /// Start the match in a room on the host's behalf.
    pub fn start_game(&mut self, room: RoomId, player: PlayerId) -> Result<(), RoomError> {
        self.rooms.start_game(room, player)?;
        self.dispatch_room_events();
        Ok(())
    }

    /// End the match in a room.
    pub fn finish_game(&mut self, room: RoomId) -> Result<(), RoomError> {
        self.rooms.finish_game(room)?;
        self.dispatch_room_events();
        Ok(())
    }

    /// Return a room to the waiting state for a rematch.
    pub fn reset_room(&mut self, room: RoomId) -> Result<(), RoomError> {
        self.rooms.reset_room(room)?;
        self.dispatch_room_events();
        Ok(())
    }

    // =========================================================================
    // DELIVERY
    // =========================================================================

    /// Push bytes to one player.
    ///
    /// If the transport closed the connection underneath us (backlog
    /// overflow), the player's session and room membership are dropped
    /// before the error is returned.
    pub fn send_to_player(
        &mut self,
        net: &mut Reactor,
        player: PlayerId,
        bytes: &[u8],
    ) -> Result<(), DeliveryError> {
        let conn = self
            .sessions
            .session(player)
            .ok_or(DeliveryError::NoSession(player))?
            .conn();
        match net.send(conn, bytes) {
            Ok(()) => Ok(()),
            Err(e) => {
                if !matches!(e, SendError::UnknownConnection(_)) {
                    warn!("dropping player {} after send failure: {}", player, e);
                    self.drop_player(player);
                }
                Err(DeliveryError::Send(e))
            }
        }
    }

    /// Push bytes to every member of a room. Best effort; returns how many
    /// members the bytes were queued for.
    pub fn broadcast_to_room(&mut self, net: &mut Reactor, room: RoomId, bytes: &[u8]) -> usize {
        let members = match self.rooms.room(room) {
            Some(entry) => entry.members().to_vec(),
            None => return 0,
        };
        let mut delivered = 0;
        for player in members {
            if self.send_to_player(net, player, bytes).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Push bytes to every live connection. Connections the transport had
    /// to close get their game-side state dropped. Returns how many
    /// connections the bytes were queued for.
    pub fn broadcast_to_all(&mut self, net: &mut Reactor, bytes: &[u8]) -> usize {
        let targets = net.connection_count();
        let dropped = net.broadcast(bytes);
        for conn in &dropped {
            if let Some(player) = self.sessions.player_by_conn(*conn) {
                warn!("dropping player {} after broadcast failure", player);
                self.drop_player(player);
            }
        }
        targets - dropped.len()
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Drop a player's game-side state: room membership first, then the
    /// session itself.
    fn drop_player(&mut self, player: PlayerId) {
        if self.rooms.room_of(player).is_some() {
            let _ = self.rooms.leave_room(player);
        }
        self.sessions.remove_session(player);
        self.dispatch_room_events();
    }

    /// Drain room events. Notification fan-out hangs off this point; for
    /// now the events feed the log.
    fn dispatch_room_events(&mut self) {
        for event in self.rooms.drain_events() {
            debug!("room event: {:?}", event);
        }
    }
}

impl Default for GameServer {
    fn default() -> Self {
        Self::new(SessionConfig::default(), RoomConfig::default())
    }
}

// =============================================================================
// HANDLER
// =============================================================================

impl ServerHandler for GameServer {
    /// A new connection gets a session immediately; if that fails the
    /// connection is useless and is closed on the spot.
    fn on_connect(&mut self, net: &mut Reactor, conn: ConnId) {
        match self.sessions.create_session(conn) {
            Ok(player) => {
                info!("player {} connected on connection {}", player, conn);
            }
            Err(e) => {
                warn!("refusing connection {}: {}", conn, e);
                net.close(conn);
            }
        }
    }

    /// Transport-detected loss: leave the room, then remove the session.
    fn on_disconnect(&mut self, _net: &mut Reactor, conn: ConnId) {
        let Some(player) = self.sessions.player_by_conn(conn) else {
            debug!("disconnect on connection {} with no session", conn);
            return;
        };
        self.drop_player(player);
        info!("player {} disconnected", player);
    }

    /// Received bytes count as liveness and accumulate in the player's
    /// inbox for the message layer to consume.
    fn on_data(&mut self, _net: &mut Reactor, conn: ConnId, data: &[u8]) {
        let Some(player) = self.sessions.player_by_conn(conn) else {
            debug!("dropping {} bytes from unknown connection {}", data.len(), conn);
            return;
        };
        self.sessions.touch(player);
        self.sessions.append_inbox(player, data);
        trace!("player {} buffered {} bytes", player, data.len());
    }

    /// Periodic housekeeping: sweep out silent sessions. A timed-out
    /// player leaves their room and loses their connection; the session is
    /// already gone, so the close must not come back through
    /// `on_disconnect` (and does not, since handler-requested closes
    /// never do).
    fn on_tick(&mut self, net: &mut Reactor) {
        let rooms = &mut self.rooms;
        let mut dead_conns = Vec::new();
        let expired = self.sessions.check_timeouts(|player, session| {
            if session.room().is_some() {
                let _ = rooms.leave_room(player);
            }
            dead_conns.push(session.conn());
        });
        for conn in dead_conns {
            net.close(conn);
        }
        if !expired.is_empty() {
            info!("{} session(s) timed out", expired.len());
        }
        self.dispatch_room_events();
    }
}

// =============================================================================
// TESTS
// =============================================================================
