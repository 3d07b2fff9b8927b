//! Readiness Reactor
//!
//! Single-threaded TCP reactor: one poll instance multiplexes the listening
//! socket and every accepted connection with edge-triggered readiness. The
//! readiness wait is the only blocking point in the server; every callback
//! runs on the loop thread between waits, so no state here needs a lock.
//!
//! Connections are identified by [`ConnId`], not by descriptor: ids are
//! allocated monotonically and never reused, so a handle held across a
//! close can only miss, never alias a newer peer.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, error, info, trace, warn};

use crate::core::ids::ConnId;

use super::buffer::SendBuffer;

/// Token reserved for the listening socket; connection ids start at 1.
const LISTENER: Token = Token(0);

/// Chunk size for draining a readable connection.
const READ_CHUNK: usize = 4096;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Reactor configuration.
#[derive(Debug, Clone)]
pub struct ReactorConfig {
    /// TCP port to listen on.
    pub port: u16,
    /// Maximum concurrent connections; also used as the listen backlog.
    pub max_connections: usize,
    /// Readiness events processed per wait.
    pub max_events: usize,
    /// Interval between [`ServerHandler::on_tick`] calls; also bounds how
    /// long a shutdown request can sit unnoticed.
    pub tick_interval: Duration,
    /// Outbound backlog cap per connection. A peer that falls further
    /// behind than this is disconnected rather than buffered forever.
    pub max_outbox_bytes: usize,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            port: crate::DEFAULT_PORT,
            max_connections: crate::DEFAULT_MAX_CONNECTIONS,
            max_events: 128,
            tick_interval: Duration::from_secs(1),
            max_outbox_bytes: 4 * 1024 * 1024,
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Fatal reactor errors; any of these stops the whole server.
#[derive(Debug, thiserror::Error)]
pub enum ReactorError {
    /// Creating the poll instance failed.
    #[error("failed to create poll instance: {0}")]
    Poll(#[source] io::Error),

    /// Creating, configuring or binding the listening socket failed.
    #[error("failed to bind listener: {0}")]
    Bind(#[source] io::Error),

    /// Registering a source with the poll instance failed.
    #[error("poll registration failed: {0}")]
    Registration(#[source] io::Error),

    /// The readiness wait itself failed.
    #[error("readiness wait failed: {0}")]
    Wait(#[source] io::Error),

    /// The listening socket raised an error condition.
    #[error("listening socket error")]
    Listener,
}

/// Errors surfaced by [`Reactor::send`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SendError {
    /// The handle does not refer to a live connection; nothing was queued.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnId),

    /// The connection's outbound backlog passed the cap; it has been
    /// closed and the bytes were not queued.
    #[error("outbound backlog overflow on connection {0}")]
    Overflow(ConnId),

    /// Arming write interest failed; the connection has been closed.
    #[error("failed to watch connection {0} for writability")]
    Watch(ConnId),
}

// =============================================================================
// SHUTDOWN TOKEN
// =============================================================================

/// Cooperative stop signal for the reactor loop.
///
/// Clones share one flag. The raw flag can be handed to signal handlers
/// (see `signal_hook::flag::register`); the loop observes it between waits,
/// so shutdown latency is bounded by the tick interval.
#[derive(Clone, Debug, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    /// Create an untriggered token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// True once shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// The underlying flag, for registering with signal handlers.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

// =============================================================================
// HANDLER TRAIT
// =============================================================================

/// Callbacks driven by the reactor loop.
///
/// Every method runs on the reactor thread and receives the reactor itself,
/// so handlers can send, broadcast or close connections while processing an
/// event.
pub trait ServerHandler {
    /// An accepted connection is configured, registered and readable.
    fn on_connect(&mut self, net: &mut Reactor, conn: ConnId);

    /// A connection reached a terminal state and has been closed. Not
    /// invoked for closes the handler itself requested through
    /// [`Reactor::close`].
    fn on_disconnect(&mut self, net: &mut Reactor, conn: ConnId);

    /// An ordered chunk of bytes arrived. Chunks carry no framing and are
    /// never empty; message boundaries are the next layer's concern.
    fn on_data(&mut self, net: &mut Reactor, conn: ConnId, data: &[u8]);

    /// The tick interval elapsed. Drives timeout sweeps and other
    /// housekeeping; the reactor schedules nothing on its own.
    fn on_tick(&mut self, net: &mut Reactor);
}

// =============================================================================
// REACTOR
// =============================================================================

/// Per-connection state owned by the reactor.
struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    outbox: SendBuffer,
    want_write: bool,
}

/// The connection multiplexer.
///
/// Owns the listener, the poll instance and every accepted connection.
/// Constructed listening via [`Reactor::bind`]; driven by [`Reactor::run`].
pub struct Reactor {
    config: ReactorConfig,
    poll: Poll,
    listener: Option<TcpListener>,
    conns: BTreeMap<ConnId, Connection>,
    next_conn_id: u64,
    local_addr: SocketAddr,
    running: bool,
}

impl Reactor {
    /// Create the poll instance and the listening socket.
    ///
    /// The listener gets SO_REUSEADDR (fatal if it cannot be set) and
    /// SO_REUSEPORT (best effort), is switched to non-blocking, bound to
    /// `0.0.0.0:port` and starts listening with a backlog of
    /// `max_connections`. A reactor is running from the moment this
    /// returns.
    pub fn bind(config: ReactorConfig) -> Result<Self, ReactorError> {
        let poll = Poll::new().map_err(ReactorError::Poll)?;

        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let socket =
            Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP)).map_err(ReactorError::Bind)?;
        socket.set_reuse_address(true).map_err(ReactorError::Bind)?;
        #[cfg(unix)]
        if let Err(e) = socket.set_reuse_port(true) {
            debug!("SO_REUSEPORT unavailable: {}", e);
        }
        socket.set_nonblocking(true).map_err(ReactorError::Bind)?;
        socket.bind(&addr.into()).map_err(ReactorError::Bind)?;
        let backlog = i32::try_from(config.max_connections).unwrap_or(i32::MAX);
        socket.listen(backlog).map_err(ReactorError::Bind)?;

        let mut listener = TcpListener::from_std(socket.into());
        let local_addr = listener.local_addr().map_err(ReactorError::Bind)?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)
            .map_err(ReactorError::Registration)?;

        info!("listening on {}", local_addr);

        Ok(Self {
            config,
            poll,
            listener: Some(listener),
            conns: BTreeMap::new(),
            next_conn_id: 1,
            local_addr,
            running: true,
        })
    }

    /// Drive the loop until the token triggers or a fatal error occurs.
    ///
    /// Either way, every connection is closed abruptly and the listener is
    /// torn down before this returns.
    pub fn run<H: ServerHandler>(
        &mut self,
        handler: &mut H,
        shutdown: &ShutdownToken,
    ) -> Result<(), ReactorError> {
        if !self.running {
            return Ok(());
        }

        let mut events = Events::with_capacity(self.config.max_events);
        let mut next_tick = Instant::now() + self.config.tick_interval;

        while !shutdown.is_triggered() {
            let timeout = next_tick.saturating_duration_since(Instant::now());
            if let Err(e) = self.poll.poll(&mut events, Some(timeout)) {
                if e.kind() == io::ErrorKind::Interrupted {
                    // a signal landed; re-check the token and wait again
                    continue;
                }
                error!("readiness wait failed: {}", e);
                self.stop();
                return Err(ReactorError::Wait(e));
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => {
                        if event.is_error() {
                            error!("listening socket error, stopping");
                            self.stop();
                            return Err(ReactorError::Listener);
                        }
                        self.accept_ready(handler);
                    }
                    Token(raw) => {
                        let conn = ConnId(raw as u64);
                        // may have been closed earlier in this same batch
                        if !self.conns.contains_key(&conn) {
                            continue;
                        }
                        if event.is_error() || event.is_read_closed() || event.is_write_closed() {
                            self.close_conn(conn, "peer hangup");
                            handler.on_disconnect(self, conn);
                            continue;
                        }
                        if event.is_readable() {
                            self.read_ready(handler, conn);
                        }
                        // reading may have closed it; re-check before writing
                        if event.is_writable() && self.conns.contains_key(&conn) {
                            self.write_ready(handler, conn);
                        }
                    }
                }
            }

            let now = Instant::now();
            if now >= next_tick {
                handler.on_tick(self);
                next_tick = now + self.config.tick_interval;
            }
        }

        info!("shutdown requested, stopping");
        self.stop();
        Ok(())
    }

    /// Queue bytes on a connection and arm write interest.
    ///
    /// Fails without side effect for an unknown handle. If the queued
    /// backlog would pass `max_outbox_bytes`, the connection is closed and
    /// the overflow reported; per-player cleanup is the caller's job.
    pub fn send(&mut self, conn: ConnId, bytes: &[u8]) -> Result<(), SendError> {
        let overflow = match self.conns.get_mut(&conn) {
            None => return Err(SendError::UnknownConnection(conn)),
            Some(c) => c.outbox.remaining() + bytes.len() > self.config.max_outbox_bytes,
        };
        if overflow {
            warn!("connection {} outbound backlog overflow, closing", conn);
            self.close_conn(conn, "slow consumer");
            return Err(SendError::Overflow(conn));
        }

        let mut watch_failed = false;
        if let Some(c) = self.conns.get_mut(&conn) {
            c.outbox.append(bytes);
            if !c.want_write {
                c.want_write = true;
                if let Err(e) = Self::update_interest(&self.poll, c, conn, true) {
                    debug!("failed to arm write interest on connection {}: {}", conn, e);
                    watch_failed = true;
                }
            }
        }
        if watch_failed {
            self.close_conn(conn, "write interest failure");
            return Err(SendError::Watch(conn));
        }
        Ok(())
    }

    /// Queue bytes for every live connection.
    ///
    /// Best effort per connection: peers that fail (backlog overflow) are
    /// closed and returned so the caller can drop their per-player state.
    pub fn broadcast(&mut self, bytes: &[u8]) -> Vec<ConnId> {
        let targets: Vec<ConnId> = self.conns.keys().copied().collect();
        let mut dropped = Vec::new();
        for conn in targets {
            if self.send(conn, bytes).is_err() {
                dropped.push(conn);
            }
        }
        dropped
    }

    /// Close a connection at the caller's request.
    ///
    /// Does not invoke [`ServerHandler::on_disconnect`]; the caller already
    /// knows. Returns false for an unknown handle.
    pub fn close(&mut self, conn: ConnId) -> bool {
        if self.conns.contains_key(&conn) {
            self.close_conn(conn, "closed by server");
            true
        } else {
            false
        }
    }

    /// Abrupt shutdown: close every connection without draining pending
    /// output, then tear down the listener. Idempotent.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;

        let open: Vec<ConnId> = self.conns.keys().copied().collect();
        for conn in open {
            self.close_conn(conn, "server stopping");
        }
        if let Some(mut listener) = self.listener.take() {
            if let Err(e) = self.poll.registry().deregister(&mut listener) {
                debug!("listener deregister failed: {}", e);
            }
        }
        info!("server stopped");
    }

    /// Address the listener is bound to (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.conns.len()
    }

    /// False once [`Reactor::stop`] has run.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Peer address of a live connection.
    pub fn peer_addr(&self, conn: ConnId) -> Option<SocketAddr> {
        self.conns.get(&conn).map(|c| c.peer)
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Drain the listener until it would block.
    fn accept_ready<H: ServerHandler>(&mut self, handler: &mut H) {
        loop {
            let accepted = match &self.listener {
                Some(listener) => listener.accept(),
                None => return,
            };
            match accepted {
                Ok((mut stream, peer)) => {
                    if self.conns.len() >= self.config.max_connections {
                        warn!("connection limit reached, rejecting {}", peer);
                        continue;
                    }
                    // per-connection setup failure closes this handle only
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!("failed to set TCP_NODELAY for {}: {}", peer, e);
                        continue;
                    }
                    let conn = ConnId(self.next_conn_id);
                    if let Err(e) = self.poll.registry().register(
                        &mut stream,
                        Token(conn.0 as usize),
                        Interest::READABLE,
                    ) {
                        warn!("failed to register connection from {}: {}", peer, e);
                        continue;
                    }
                    self.next_conn_id += 1;
                    self.conns.insert(
                        conn,
                        Connection {
                            stream,
                            peer,
                            outbox: SendBuffer::new(),
                            want_write: false,
                        },
                    );
                    debug!("accepted connection {} from {}", conn, peer);
                    handler.on_connect(self, conn);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) => {
                    warn!("accept failed: {}", e);
                    return;
                }
            }
        }
    }

    /// Drain a readable connection until it would block, delivering every
    /// non-empty chunk in arrival order.
    fn read_ready<H: ServerHandler>(&mut self, handler: &mut H, conn: ConnId) {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let result = match self.conns.get_mut(&conn) {
                Some(c) => c.stream.read(&mut chunk),
                // the handler closed it between chunks
                None => return,
            };
            match result {
                Ok(0) => {
                    self.close_conn(conn, "peer closed");
                    handler.on_disconnect(self, conn);
                    return;
                }
                Ok(n) => {
                    trace!("connection {} read {} bytes", conn, n);
                    handler.on_data(self, conn, &chunk[..n]);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("read error on connection {}: {}", conn, e);
                    self.close_conn(conn, "read error");
                    handler.on_disconnect(self, conn);
                    return;
                }
            }
        }
    }

    /// Drain a writable connection's outbox until it empties (stop watching
    /// writability) or the socket would block (keep watching).
    fn write_ready<H: ServerHandler>(&mut self, handler: &mut H, conn: ConnId) {
        loop {
            let io_result: io::Result<usize> = match self.conns.get_mut(&conn) {
                None => return,
                Some(c) => {
                    if c.outbox.is_empty() {
                        c.outbox.clear();
                        c.want_write = false;
                        match Self::update_interest(&self.poll, c, conn, false) {
                            Ok(()) => return,
                            Err(e) => Err(e),
                        }
                    } else {
                        let result = c.stream.write(c.outbox.unsent());
                        match &result {
                            Ok(n) => {
                                c.outbox.advance(*n);
                                trace!("connection {} wrote {} bytes", conn, n);
                            }
                            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                                // keep write interest; reclaim the sent
                                // prefix if it has grown large
                                c.outbox.maybe_compact();
                            }
                            Err(_) => {}
                        }
                        result
                    }
                }
            };
            match io_result {
                // the socket refused bytes outright
                Ok(0) => {
                    self.close_conn(conn, "write stalled");
                    handler.on_disconnect(self, conn);
                    return;
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    debug!("write error on connection {}: {}", conn, e);
                    self.close_conn(conn, "write error");
                    handler.on_disconnect(self, conn);
                    return;
                }
            }
        }
    }

    /// Switch a connection between read-only and read+write interest.
    fn update_interest(
        poll: &Poll,
        c: &mut Connection,
        conn: ConnId,
        writable: bool,
    ) -> io::Result<()> {
        let interest = if writable {
            Interest::READABLE | Interest::WRITABLE
        } else {
            Interest::READABLE
        };
        poll.registry()
            .reregister(&mut c.stream, Token(conn.0 as usize), interest)
    }

    /// Tear down one connection. Poll deregistration and table removal
    /// happen before the stream drops, which is what closes the descriptor.
    fn close_conn(&mut self, conn: ConnId, reason: &str) {
        if let Some(mut c) = self.conns.remove(&conn) {
            if let Err(e) = self.poll.registry().deregister(&mut c.stream) {
                debug!("deregister failed for connection {}: {}", conn, e);
            }
            debug!("connection {} from {} closed ({})", conn, c.peer, reason);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ReactorConfig {
        ReactorConfig {
            port: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = ReactorConfig::default();
        assert_eq!(config.port, 10000);
        assert_eq!(config.max_connections, 128);
        assert_eq!(config.max_events, 128);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_bind_ephemeral_port() {
        let reactor = Reactor::bind(test_config()).unwrap();
        assert!(reactor.is_running());
        assert_ne!(reactor.local_addr().port(), 0);
        assert_eq!(reactor.connection_count(), 0);
    }

    #[test]
    fn test_send_to_unknown_connection_fails_cleanly() {
        let mut reactor = Reactor::bind(test_config()).unwrap();
        let stale = ConnId(999);
        assert_eq!(
            reactor.send(stale, b"hello"),
            Err(SendError::UnknownConnection(stale))
        );
        assert!(!reactor.close(stale));
        assert_eq!(reactor.peer_addr(stale), None);
    }

    #[test]
    fn test_broadcast_with_no_connections() {
        let mut reactor = Reactor::bind(test_config()).unwrap();
        assert!(reactor.broadcast(b"anyone there").is_empty());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut reactor = Reactor::bind(test_config()).unwrap();
        reactor.stop();
        assert!(!reactor.is_running());
        reactor.stop();
        assert!(!reactor.is_running());
    }

    #[test]
    fn test_shutdown_token_is_shared_by_clones() {
        let token = ShutdownToken::new();
        let clone = token.clone();
        assert!(!clone.is_triggered());
        token.trigger();
        assert!(clone.is_triggered());
    }
}
